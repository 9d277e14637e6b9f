//! Run one full pass from the command line and print the report as JSON.
//!
//! Flags: `--debug` (provider traces), `--force-digest`.

use watcher_alerts::RunOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    watcher_alerts::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = RunOptions {
        debug: args.iter().any(|a| a == "--debug"),
        force_digest: args.iter().any(|a| a == "--force-digest"),
    };

    let runner = watcher_alerts::build_runner_from_env()?;
    let report = runner.run(opts).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
