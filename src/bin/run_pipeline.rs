//! One-shot pipeline run from the command line.
//!
//! Usage: `run_pipeline [--full]`
//!
//! Without `--full` only news, script and metadata are produced, whatever
//! the config says. E-mail notifications go out when `[email]` is enabled.

use std::process::ExitCode;

use daily_econ_shorts::notify::RunNotifier;
use daily_econ_shorts::{bootstrap, AppConfig};

async fn run(full: bool) -> anyhow::Result<()> {
    let mut cfg = AppConfig::load()?;
    cfg.pipeline.full_pipeline = full;
    bootstrap::report_config(&cfg);

    let mut orchestrator = bootstrap::build_orchestrator(&cfg)?;
    if let Some(sink) = bootstrap::build_email_sink(&cfg)? {
        orchestrator = orchestrator.with_notifier(RunNotifier::new(sink, cfg.email.to.clone()));
    }

    let run = orchestrator.run().await?;
    println!("Run: {}", run.id);
    println!("Title: {}", run.metadata.title);
    println!("URL: {}", run.published_url());
    if !run.skipped.is_empty() {
        let skipped: Vec<_> = run.skipped.iter().map(|s| s.label()).collect();
        println!("Skipped: {}", skipped.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    daily_econ_shorts::init_tracing();

    let full = std::env::args().skip(1).any(|a| a == "--full");
    match run(full).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
