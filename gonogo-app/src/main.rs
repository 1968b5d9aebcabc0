mod app;

use anyhow::{Context, Result};
use gonogo_core::SessionReport;
use gonogo_engine::SessionDefinition;
use std::path::PathBuf;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(session_path) = args.next().map(PathBuf::from) else {
        eprintln!("usage: gonogo <session.json> [results.json]");
        std::process::exit(2);
    };
    let results_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| session_path.with_extension("results.json"));

    let definition = SessionDefinition::load(&session_path)?;
    let trial_count = definition.trials.len();
    let session_config = definition.config.clone();

    let report = app::App::new(definition).run()?;

    if report.completed {
        let document = SessionReport {
            config: session_config,
            state: report.state.clone(),
        };
        let file = std::fs::File::create(&results_path)
            .with_context(|| format!("failed to create {}", results_path.display()))?;
        serde_json::to_writer_pretty(file, &document)?;
        println!("FINISHED!");
        println!("Score: {} / {}", report.state.score, trial_count);
        println!("Results written to {}", results_path.display());
    } else {
        println!(
            "Session aborted after {} of {} trials.",
            report.state.results.len(),
            trial_count
        );
    }

    Ok(())
}
