//! Metrics CLI: aggregate per-run score files into mean/stdev TSV tables.

use clap::Parser;
use kgenv::{
    eval::{experiment_summary, metric_names, results_summary, ExperimentSummary, MetricsOptions},
    Config,
};
use std::path::PathBuf;

/// Aggregate experiment runs and write summary tables.
#[derive(Parser, Debug)]
#[command(name = "metrics")]
struct Args {
    /// Results directory holding experiment directories (default: metrics.results_dir).
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Aggregate a single experiment directory instead.
    #[arg(long, conflicts_with = "results_dir")]
    experiment: Option<PathBuf>,

    /// Substring that marks run and experiment directories.
    #[arg(long)]
    marker: Option<String>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // The config file is optional here: explicit paths work without one.
    let config = match (&args.results_dir, &args.experiment) {
        (None, None) => Some(Config::load()?),
        _ => None,
    };

    let mut options = config
        .as_ref()
        .map(|c| c.metrics.options())
        .unwrap_or_else(MetricsOptions::default);
    if let Some(marker) = args.marker {
        options.run_marker = marker;
    }

    let summaries = if let Some(experiment) = &args.experiment {
        vec![experiment_summary(experiment, &options)?]
    } else {
        let results_dir = args
            .results_dir
            .or_else(|| config.map(|c| c.metrics.results_dir))
            .unwrap_or_else(|| PathBuf::from("results"));
        let summaries = results_summary(&results_dir, &options)?;
        if summaries.is_empty() {
            anyhow::bail!(
                "No experiment directories containing '{}' in {}",
                options.run_marker,
                results_dir.display()
            );
        }
        summaries
    };

    for summary in &summaries {
        print_summary(summary);
    }

    Ok(())
}

fn print_summary(summary: &ExperimentSummary) {
    println!("\n=== {} ({} runs) ===", summary.name, summary.runs);
    println!("{:-<50}", "");
    println!("{:<10} {:>18} {:>18}", "Metric", "Standard", "Pruned");
    println!("{:-<50}", "");
    for metric in metric_names(false) {
        let fmt = |s: Option<kgenv::eval::Summary>| s.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:>18} {:>18}",
            metric,
            fmt(summary.standard.get(&metric)),
            fmt(summary.pruned.get(&metric))
        );
    }
    println!("{:-<50}", "");
}
