//! Rank-based link prediction metrics: Hits@K and Mean Reciprocal Rank (MRR).

use std::collections::{BTreeMap, HashMap};

use super::aggregate::{summarize, Summary};

const NUM_CUTOFFS: usize = 5;

/// Cutoffs reported as `Hits@K`.
pub const HITS_AT: [usize; NUM_CUTOFFS] = [1, 3, 5, 10, 20];

/// Suffix carried by the pruned (rule-filtered) metric family in score files.
pub const RULE_SUFFIX: &str = "_rule";

/// A (source, target) query pair as named in answer-position dumps.
pub type QueryPair = (String, String);

/// Canonical metric names in report order, optionally with the `_rule` suffix.
pub fn metric_names(rule: bool) -> Vec<String> {
    let ext = if rule { RULE_SUFFIX } else { "" };
    HITS_AT
        .iter()
        .map(|k| format!("Hits@{}{}", k, ext))
        .chain(std::iter::once(format!("MRR{}", ext)))
        .collect()
}

/// Accumulated Hits@K counts and reciprocal-rank sum over a set of queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMetrics {
    pub hits: [f64; NUM_CUTOFFS],
    pub mrr: f64,
}

impl QueryMetrics {
    /// Add one query whose answer sits at 0-based `answer_pos` (`None`: not ranked).
    pub fn record(&mut self, answer_pos: Option<usize>) {
        let Some(pos) = answer_pos else {
            return;
        };
        self.mrr += 1.0 / (pos + 1) as f64;
        for (hits, &k) in self.hits.iter_mut().zip(HITS_AT.iter()) {
            if pos < k {
                *hits += 1.0;
            }
        }
    }

    /// Every value divided by `denom` (0 yields all zeros).
    pub fn averaged(&self, denom: usize) -> Self {
        if denom == 0 {
            return Self::default();
        }
        let d = denom as f64;
        let mut out = self.clone();
        out.hits.iter_mut().for_each(|h| *h /= d);
        out.mrr /= d;
        out
    }

    /// `(name, value)` pairs in [`metric_names`] order.
    pub fn named(&self, rule: bool) -> Vec<(String, f64)> {
        metric_names(rule)
            .into_iter()
            .zip(self.hits.iter().copied().chain(std::iter::once(self.mrr)))
            .collect()
    }
}

/// Per path length: average each experiment's metrics over the pairs of that
/// length, then summarize across experiments.
///
/// Pairs absent from an experiment count as misses. Lengths with no pairs
/// are left out.
pub fn metrics_by_length(
    experiments: &[HashMap<QueryPair, Option<usize>>],
    path_lengths: &BTreeMap<usize, Vec<QueryPair>>,
) -> BTreeMap<usize, Vec<(String, Option<Summary>)>> {
    let mut by_length = BTreeMap::new();

    for (&length, pairs) in path_lengths {
        if pairs.is_empty() {
            continue;
        }
        let names = metric_names(false);
        let mut per_metric: Vec<Vec<f64>> = vec![Vec::with_capacity(experiments.len()); names.len()];

        for experiment in experiments {
            let mut metrics = QueryMetrics::default();
            for pair in pairs {
                if let Some(&pos) = experiment.get(pair) {
                    metrics.record(pos);
                }
            }
            let averaged = metrics.averaged(pairs.len());
            for (values, (_, value)) in per_metric.iter_mut().zip(averaged.named(false)) {
                values.push(value);
            }
        }

        let summaries = names
            .into_iter()
            .zip(per_metric.iter().map(|values| summarize(values)))
            .collect();
        by_length.insert(length, summaries);
    }

    by_length
}
