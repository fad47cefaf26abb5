//! Property-based tests for the action table, reducer and step masking.
//!
//! Graphs use 6 real entities (0..6) plus PAD = 6, and relations
//! knows = 0, _knows = 1, likes = 2, NO_OP = 3, PAD = 4.

use std::collections::{HashMap, HashSet};

use kgenv::actions::{Action, ActionTokens};
use kgenv::{reduce_graph, ActionTable, PairedRelations, StepQuery, TripleGraph};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const NUM_ENTITIES: u32 = 6;
const KNOWS: u32 = 0;
const KNOWN_BY: u32 = 1;
const LIKES: u32 = 2;
const TOKENS: ActionTokens = ActionTokens {
    entity_pad: 6,
    relation_pad: 4,
    no_op: 3,
};

fn arb_edges() -> impl Strategy<Value = Vec<(u32, u32, u32)>> {
    prop::collection::vec((0..NUM_ENTITIES, prop_oneof![Just(KNOWS), Just(LIKES)], 0..NUM_ENTITIES), 0..60)
}

fn graph_from(edges: &[(u32, u32, u32)]) -> TripleGraph {
    let mut g = TripleGraph::new(NUM_ENTITIES as usize + 1);
    for &(s, r, t) in edges {
        g.add_edge(s, r, t).unwrap();
    }
    g
}

/// Every `knows` edge gets a mirrored `_knows` edge.
fn symmetric_graph_from(edges: &[(u32, u32, u32)]) -> TripleGraph {
    let mut g = TripleGraph::new(NUM_ENTITIES as usize + 1);
    for &(s, r, t) in edges {
        g.add_edge(s, r, t).unwrap();
        if r == KNOWS {
            g.add_edge(t, KNOWN_BY, s).unwrap();
        }
    }
    g
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn stay_action_and_width_bounds(
        edges in arb_edges(),
        width in 1usize..8,
        seed in any::<u64>(),
    ) {
        let g = graph_from(&edges);
        let (table, report) = ActionTable::build(&g, width, TOKENS, &mut StdRng::seed_from_u64(seed)).unwrap();

        for node in 0..=NUM_ENTITIES {
            let row = table.row(node).unwrap();
            prop_assert_eq!(row.len(), width);
            let degree = g.out_degree(node);
            let filled = table.filled_slots(node).unwrap();
            if degree > 0 {
                prop_assert_eq!(row[0], Action::new(node, TOKENS.no_op));
                prop_assert_eq!(filled, (degree + 1).min(width));
            } else {
                prop_assert_eq!(filled, 0);
            }
            // real actions are a sub-multiset of the node's edges
            let mut available: HashMap<Action, usize> = HashMap::new();
            for e in g.edges_from(node) {
                *available.entry(Action::new(e.target, e.relation)).or_insert(0) += 1;
            }
            for action in row.iter().skip(1).filter(|a| !table.is_pad(a)) {
                let left = available.get_mut(action);
                prop_assert!(left.as_ref().map_or(false, |n| **n > 0), "action {:?} not an edge", action);
                if let Some(n) = left {
                    *n -= 1;
                }
            }
            // padding is right-aligned
            let first_pad = row.iter().position(|a| table.is_pad(a)).unwrap_or(width);
            prop_assert!(row[first_pad..].iter().all(|a| table.is_pad(a)));
        }

        let expected_dropped: usize = (0..=NUM_ENTITIES)
            .map(|n| g.out_degree(n).saturating_sub(width - 1))
            .sum();
        prop_assert_eq!(report.total_dropped(), expected_dropped);
    }

    #[test]
    fn same_seed_same_table(edges in arb_edges(), seed in any::<u64>()) {
        let g = graph_from(&edges);
        let (a, _) = ActionTable::build(&g, 4, TOKENS, &mut StdRng::seed_from_u64(seed)).unwrap();
        let (b, _) = ActionTable::build(&g, 4, TOKENS, &mut StdRng::seed_from_u64(seed)).unwrap();
        for node in 0..=NUM_ENTITIES {
            prop_assert_eq!(a.row(node).unwrap(), b.row(node).unwrap());
        }
    }

    #[test]
    fn reduction_keeps_pairs_in_lockstep(edges in arb_edges(), threshold in 0usize..12) {
        let mut g = symmetric_graph_from(&edges);
        let before = g.relation_counts();
        let paired = PairedRelations::from_pairs([(KNOWS, KNOWN_BY)]);

        let report = reduce_graph(&mut g, threshold, &paired).unwrap();
        let after = g.relation_counts();
        let count = |m: &std::collections::BTreeMap<u32, usize>, r: u32| m.get(&r).copied().unwrap_or(0);

        for r in [KNOWS, KNOWN_BY, LIKES] {
            prop_assert_eq!(count(&after, r), count(&before, r).min(threshold));
        }
        prop_assert_eq!(
            report.removed.get(&KNOWS).copied().unwrap_or(0),
            report.removed.get(&KNOWN_BY).copied().unwrap_or(0)
        );
        // graph stays symmetric
        for s in 0..NUM_ENTITIES {
            for e in g.edges_from(s).iter().filter(|e| e.relation == KNOWS) {
                prop_assert!(g.edges_from(e.target).iter().any(|m| m.relation == KNOWN_BY && m.target == s));
            }
        }
    }

    #[test]
    fn masking_only_pads_and_hides_query_edge(
        edges in arb_edges(),
        current in 0..NUM_ENTITIES,
        end in 0..NUM_ENTITIES,
        answers in prop::collection::hash_set(0..NUM_ENTITIES, 0..4),
        is_last_step in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let g = graph_from(&edges);
        let (table, _) = ActionTable::build(&g, 5, TOKENS, &mut StdRng::seed_from_u64(seed)).unwrap();
        let answers: Vec<HashSet<u32>> = vec![answers];
        let step = StepQuery {
            current: &[current],
            start: &[current],
            query_relations: &[KNOWS],
            end: &[end],
        };

        let first = table.select(&step, &answers, is_last_step, 1).unwrap();
        let second = table.select(&step, &answers, is_last_step, 1).unwrap();
        prop_assert_eq!(&first, &second);

        let original = table.row(current).unwrap();
        for (masked, orig) in first.row(0).unwrap().iter().zip(original) {
            prop_assert!(masked == orig || table.is_pad(masked));
            prop_assert!(!(masked.relation == KNOWS && masked.entity == end));
            if is_last_step && !table.is_pad(masked) {
                prop_assert!(masked.entity == end || !answers[0].contains(&masked.entity));
            }
        }
    }
}
