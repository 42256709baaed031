use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use depwatch::graph::DependencyGraph;
use depwatch::watch::normalize;

#[derive(Debug, Clone)]
enum Op {
    Build { entry: usize, deps: Vec<usize> },
    Drop { entry: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..4usize, proptest::collection::vec(0..8usize, 0..6))
            .prop_map(|(entry, deps)| Op::Build { entry, deps }),
        1 => (0..4usize).prop_map(|entry| Op::Drop { entry }),
    ]
}

fn entry_path(i: usize) -> String {
    format!("/p/entry_{i}.js")
}

fn dep_path(i: usize) -> String {
    format!("/p/dep_{i}.js")
}

fn ref_counts(model: &BTreeMap<usize, BTreeSet<usize>>) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for deps in model.values() {
        for d in deps {
            *counts.entry(*d).or_insert(0) += 1;
        }
    }
    counts
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: after any sequence of builds and removals, the two maps are
    /// duals, ref counts match the entry lists, and the diff reports exactly
    /// the 0 -> 1 and 1 -> 0 transitions.
    #[test]
    fn graph_matches_reference_model(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut graph = DependencyGraph::new();
        let mut model: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for op in ops {
            let before = ref_counts(&model);

            let diff = match &op {
                Op::Build { entry, deps } => {
                    model.insert(*entry, deps.iter().copied().collect());
                    graph.set_dependencies(&entry_path(*entry), deps.iter().map(|d| dep_path(*d)))
                }
                Op::Drop { entry } => {
                    model.remove(entry);
                    graph.drop_entry(&entry_path(*entry))
                }
            };

            let after = ref_counts(&model);

            let expected_added: BTreeSet<String> = after
                .keys()
                .filter(|d| !before.contains_key(d))
                .map(|d| dep_path(*d))
                .collect();
            let expected_released: BTreeSet<String> = before
                .keys()
                .filter(|d| !after.contains_key(d))
                .map(|d| dep_path(*d))
                .collect();

            prop_assert_eq!(diff.added.iter().cloned().collect::<BTreeSet<_>>(), expected_added);
            prop_assert_eq!(diff.released.iter().cloned().collect::<BTreeSet<_>>(), expected_released);
            prop_assert!(graph.is_consistent());

            for d in 0..8 {
                prop_assert_eq!(graph.ref_count(&dep_path(d)), after.get(&d).copied().unwrap_or(0));
            }
            for e in 0..4 {
                prop_assert_eq!(graph.contains_entry(&entry_path(e)), model.contains_key(&e));
            }
        }
    }

    /// PROPERTY: normalization is idempotent and leaves no backslashes.
    #[test]
    fn normalize_is_idempotent(path in "[A-Za-z0-9:/\\\\._-]{0,48}") {
        let once = normalize(&path);
        prop_assert!(!once.contains('\\'));
        prop_assert_eq!(normalize(&once), once.clone());
    }
}
