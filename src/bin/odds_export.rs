use std::path::PathBuf;

use anyhow::{Result, anyhow};

use tennis_odds::config::{AppConfig, arg_value};
use tennis_odds::export::{default_export_name, export_csv};
use tennis_odds::logging;
use tennis_odds::pipeline::{self, RunStatus};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_stderr();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args)?;

    let report = pipeline::run(&cfg, |progress| {
        if progress.current == 1 || progress.current % 10 == 0 || progress.current == progress.total
        {
            println!("markets {}/{}", progress.current, progress.total);
        }
    })?;

    println!("Provider: {}", cfg.provider.label());
    println!("Date: {}", cfg.date_string());
    println!(
        "Bookmaker filter: {}",
        if cfg.bookmaker.is_empty() {
            "-"
        } else {
            cfg.bookmaker.as_str()
        }
    );
    for note in &report.notes {
        println!("  {note}");
    }
    if !report.failures.is_empty() {
        println!("Per-event failures: {}", report.failures.len());
        for (event_id, err) in report.failures.iter().take(8) {
            println!(" - {event_id}: {err}");
        }
    }

    match &report.status {
        RunStatus::UpstreamFailed(err) => {
            if let Some(raw) = &report.raw {
                eprintln!("{}", serde_json::to_string_pretty(raw)?);
            }
            Err(anyhow!("upstream call failed: {err}"))
        }
        RunStatus::NoMatches => {
            println!("{}", report.status.message());
            Ok(())
        }
        RunStatus::Rows(n) => {
            let out = arg_value(&args, "out")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    PathBuf::from(default_export_name(
                        &cfg.bookmaker,
                        &cfg.date_string(),
                        "csv",
                    ))
                });
            export_csv(&report.table, &out)?;
            println!("Rows: {n}");
            println!("CSV: {}", out.display());
            Ok(())
        }
    }
}
