//! Mean/stdev aggregation of score files across runs and experiments, with
//! TSV summary tables.
//!
//! Layout on disk:
//!
//! ```text
//! results/
//!   <experiment with marker>/
//!     <run with marker>/scores.txt
//!     experiment_metrics.tsv     (written)
//!   metrics.tsv                  (written)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::metrics::{metric_names, RULE_SUFFIX};
use super::scores::read_scores;
use crate::error::{KgError, Result};

pub const EXPERIMENT_TABLE: &str = "experiment_metrics.tsv";
pub const RESULTS_TABLE: &str = "metrics.tsv";

/// Mean and sample standard deviation of one metric across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    /// `None` with fewer than two values.
    pub stdev: Option<f64>,
    pub n: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stdev {
            Some(stdev) => write!(f, "{:.3} ± {:.3}", self.mean, stdev),
            None => write!(f, "{:.3}", self.mean),
        }
    }
}

/// Summarize `values`; `None` when empty.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let stdev = (n > 1).then(|| {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });
    Some(Summary { mean, stdev, n })
}

/// Which directories count as runs/experiments and where scores live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsOptions {
    /// Substring a directory name must contain to be included.
    pub run_marker: String,
    /// Score file name inside each run directory.
    pub scores_file: String,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            run_marker: "TEST".to_string(),
            scores_file: "scores.txt".to_string(),
        }
    }
}

/// One labelled column of metric summaries in canonical metric order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricColumn {
    pub label: String,
    pub values: Vec<(String, Option<Summary>)>,
}

impl MetricColumn {
    pub fn get(&self, metric: &str) -> Option<Summary> {
        self.values
            .iter()
            .find(|(name, _)| name == metric)
            .and_then(|(_, s)| *s)
    }
}

/// Aggregated scores of every run of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentSummary {
    pub name: String,
    pub runs: usize,
    pub standard: MetricColumn,
    /// The `_rule` family, keyed by the unsuffixed metric name.
    pub pruned: MetricColumn,
}

/// Aggregate the runs of one experiment directory without writing anything.
pub fn collect_experiment(dir: &Path, options: &MetricsOptions) -> Result<ExperimentSummary> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| KgError::InvalidInput(format!("not an experiment directory: {}", dir.display())))?;

    let standard_names = metric_names(false);
    let pruned_names = metric_names(true);
    let mut standard: HashMap<String, Vec<f64>> = HashMap::new();
    let mut pruned: HashMap<String, Vec<f64>> = HashMap::new();
    let mut strict = standard_names.clone();
    strict.extend(pruned_names.iter().cloned());

    let mut runs = 0;
    for run_dir in marked_subdirs(dir, &options.run_marker)? {
        let scores_path = run_dir.join(&options.scores_file);
        if !scores_path.is_file() {
            log::warn!("Skipping run without {}: {}", options.scores_file, run_dir.display());
            continue;
        }
        runs += 1;
        for (metric, value) in read_scores(&scores_path, &strict)? {
            if standard_names.contains(&metric) {
                standard.entry(metric).or_default().push(value);
            } else if let Some(base) = metric.strip_suffix(RULE_SUFFIX) {
                if pruned_names.contains(&metric) {
                    pruned.entry(base.to_string()).or_default().push(value);
                }
            }
        }
    }

    log::info!("Aggregated {} runs for experiment {}", runs, name);

    let column = |label: String, values: &HashMap<String, Vec<f64>>| MetricColumn {
        label,
        values: standard_names
            .iter()
            .map(|m| (m.clone(), values.get(m).and_then(|v| summarize(v))))
            .collect(),
    };

    Ok(ExperimentSummary {
        standard: column(format!("{} metrics", name), &standard),
        pruned: column(format!("{} metrics (pruned)", name), &pruned),
        name,
        runs,
    })
}

/// Aggregate one experiment and write its `experiment_metrics.tsv`.
pub fn experiment_summary(dir: &Path, options: &MetricsOptions) -> Result<ExperimentSummary> {
    let summary = collect_experiment(dir, options)?;
    let table = render_tsv(&metric_names(false), &[&summary.standard, &summary.pruned]);
    let path = dir.join(EXPERIMENT_TABLE);
    fs::write(&path, table)?;
    log::info!("Wrote {}", path.display());
    Ok(summary)
}

/// Aggregate every marked experiment under `dir`, writing each experiment
/// table and the combined `metrics.tsv` (one row per column label, sorted).
pub fn results_summary(dir: &Path, options: &MetricsOptions) -> Result<Vec<ExperimentSummary>> {
    let mut summaries = Vec::new();
    for experiment_dir in marked_subdirs(dir, &options.run_marker)? {
        summaries.push(experiment_summary(&experiment_dir, options)?);
    }

    let mut rows: BTreeMap<&str, &MetricColumn> = BTreeMap::new();
    for summary in &summaries {
        rows.insert(&summary.standard.label, &summary.standard);
        rows.insert(&summary.pruned.label, &summary.pruned);
    }

    let names = metric_names(false);
    let mut out = String::from("experiment");
    for name in &names {
        out.push('\t');
        out.push_str(name);
    }
    out.push('\n');
    for (label, column) in rows {
        out.push_str(label);
        for name in &names {
            out.push('\t');
            if let Some(s) = column.get(name) {
                out.push_str(&s.to_string());
            }
        }
        out.push('\n');
    }

    let path = dir.join(RESULTS_TABLE);
    fs::write(&path, out)?;
    log::info!("Wrote {} ({} experiments)", path.display(), summaries.len());
    Ok(summaries)
}

/// Metric-per-row table with one column per `columns` entry.
fn render_tsv(metrics: &[String], columns: &[&MetricColumn]) -> String {
    let mut out = String::from("metric");
    for column in columns {
        out.push('\t');
        out.push_str(&column.label);
    }
    out.push('\n');
    for metric in metrics {
        out.push_str(metric);
        for column in columns {
            out.push('\t');
            if let Some(s) = column.get(metric) {
                out.push_str(&s.to_string());
            }
        }
        out.push('\n');
    }
    out
}

/// Immediate subdirectories whose name contains `marker`, sorted by name.
fn marked_subdirs(dir: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(KgError::InvalidInput(format!("not a directory: {}", dir.display())));
    }
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_dir() && entry.file_name().to_string_lossy().contains(marker) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_run(root: &Path, experiment: &str, run: &str, body: &str) {
        let run_dir = root.join(experiment).join(run);
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("scores.txt"), body).unwrap();
    }

    #[test]
    fn summarize_two_runs() {
        let s = summarize(&[0.5, 0.7]).unwrap();
        assert!((s.mean - 0.6).abs() < 1e-9);
        assert!((s.stdev.unwrap() - 0.141_421).abs() < 1e-5);
        assert_eq!(s.to_string(), "0.600 ± 0.141");
    }

    #[test]
    fn summarize_single_and_empty() {
        let s = summarize(&[0.25]).unwrap();
        assert_eq!(s.stdev, None);
        assert_eq!(s.to_string(), "0.250");
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn experiment_summary_aggregates_runs() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_run(root, "exp_TEST", "run1_TEST", "Hits@1: 0.5\nMRR: 0.6\nHits@1_rule: 0.4\n");
        write_run(root, "exp_TEST", "run2_TEST", "Hits@1: 0.7\nMRR: 0.8\nHits@1_rule: 0.2\n");
        // ignored: no marker
        write_run(root, "exp_TEST", "scratch", "Hits@1: 0.0\n");
        // ignored: no scores file
        fs::create_dir_all(root.join("exp_TEST").join("run3_TEST")).unwrap();

        let summary = experiment_summary(&root.join("exp_TEST"), &MetricsOptions::default()).unwrap();
        assert_eq!(summary.name, "exp_TEST");
        assert_eq!(summary.runs, 2);

        let hits1 = summary.standard.get("Hits@1").unwrap();
        assert!((hits1.mean - 0.6).abs() < 1e-9);
        assert!((hits1.stdev.unwrap() - 0.1414).abs() < 1e-3);
        let pruned = summary.pruned.get("Hits@1").unwrap();
        assert!((pruned.mean - 0.3).abs() < 1e-9);
        assert!(summary.standard.get("Hits@10").is_none());

        let table = fs::read_to_string(root.join("exp_TEST").join(EXPERIMENT_TABLE)).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next().unwrap(),
            "metric\texp_TEST metrics\texp_TEST metrics (pruned)"
        );
        assert_eq!(lines.next().unwrap(), "Hits@1\t0.600 ± 0.141\t0.300 ± 0.141");
        assert_eq!(table.lines().count(), 7);
    }

    #[test]
    fn results_summary_combines_experiments() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_run(root, "b_TEST", "r_TEST", "Hits@1: 0.1\n");
        write_run(root, "a_TEST", "r_TEST", "Hits@1: 0.2\n");
        fs::create_dir_all(root.join("notes")).unwrap();

        let summaries = results_summary(root, &MetricsOptions::default()).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "a_TEST");

        let table = fs::read_to_string(root.join(RESULTS_TABLE)).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("experiment\tHits@1\tHits@3"));
        assert!(lines[1].starts_with("a_TEST metrics\t0.200"));
        assert!(lines[2].starts_with("a_TEST metrics (pruned)\t"));
        assert!(lines[3].starts_with("b_TEST metrics\t0.100"));
        assert!(root.join("a_TEST").join(EXPERIMENT_TABLE).is_file());
    }

    #[test]
    fn custom_marker_and_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let run_dir = root.join("exp").join("seed1");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("eval.txt"), "MRR: 0.5\n").unwrap();
        let options = MetricsOptions {
            run_marker: "seed".to_string(),
            scores_file: "eval.txt".to_string(),
        };
        let summary = collect_experiment(&root.join("exp"), &options).unwrap();
        assert_eq!(summary.runs, 1);
        assert!((summary.standard.get("MRR").unwrap().mean - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_directory_is_error() {
        let err = collect_experiment(Path::new("/nonexistent/exp_TEST"), &MetricsOptions::default())
            .unwrap_err();
        assert!(matches!(err, KgError::InvalidInput(_)));
    }
}
