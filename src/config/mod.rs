pub mod ai;
pub mod runner;

pub use ai::AiConfig;
pub use runner::RunnerConfig;
