//! Triple file parsing into a `TripleGraph`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::TripleGraph;
use crate::error::{KgError, Result};
use crate::vocab::Vocab;

/// Parse a tab-separated triple file (`head\trelation\ttail`, no header).
pub fn build_graph(triple_file: &Path, entities: &Vocab, relations: &Vocab) -> Result<TripleGraph> {
    let file = File::open(triple_file)?;
    let graph = build_graph_from_reader(BufReader::new(file), entities, relations)?;
    log::info!(
        "Loaded {} triples from {}",
        graph.edge_count(),
        triple_file.display()
    );
    Ok(graph)
}

/// Same as [`build_graph`] over any buffered reader.
///
/// Blank lines are skipped. Lines are numbered from 1 in errors.
pub fn build_graph_from_reader<R: BufRead>(
    reader: R,
    entities: &Vocab,
    relations: &Vocab,
) -> Result<TripleGraph> {
    let mut graph = TripleGraph::new(entities.len());

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.split('\t');
        let (Some(head), Some(rel), Some(tail)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(KgError::Parse(format!(
                "line {}: expected 3 tab-separated fields, got '{}'",
                line_no, line
            )));
        };

        let e1 = entities.lookup(head, line_no)?;
        let r = relations.lookup(rel, line_no)?;
        let e2 = entities.lookup(tail, line_no)?;
        graph.add_edge(e1, r, e2)?;
    }

    Ok(graph)
}
