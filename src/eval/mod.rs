//! Evaluation reporting: score-file aggregation (mean/stdev per metric across
//! runs), TSV summary tables, and rank metrics grouped by path length.

pub mod aggregate;
pub mod metrics;
pub mod scores;

pub use aggregate::{
    collect_experiment, experiment_summary, results_summary, summarize, ExperimentSummary,
    MetricColumn, MetricsOptions, Summary,
};
pub use metrics::{metric_names, metrics_by_length, QueryMetrics, QueryPair, HITS_AT};
pub use scores::{parse_scores, read_scores};
