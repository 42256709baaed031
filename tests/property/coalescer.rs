use std::collections::BTreeSet;

use proptest::prelude::*;

use depwatch::engine::RefreshCoalescer;

#[derive(Debug, Clone)]
enum Op {
    Request(Vec<usize>),
    Complete,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::collection::vec(0..6usize, 1..4).prop_map(Op::Request),
        2 => Just(Op::Complete),
    ]
}

fn entry(i: usize) -> String {
    format!("/p/entry_{i}.js")
}

proptest! {
    /// PROPERTY: at most one cycle is in flight, and every requested entry
    /// is part of a snapshot dispatched after the request.
    #[test]
    fn no_lost_refresh_and_one_cycle_at_a_time(
        ops in proptest::collection::vec(op_strategy(), 1..60)
    ) {
        let mut coalescer = RefreshCoalescer::new();
        let mut in_flight = false;
        let mut outstanding: BTreeSet<String> = BTreeSet::new();

        for op in ops {
            let dispatched = match op {
                Op::Request(entries) => {
                    let entries: Vec<String> = entries.into_iter().map(entry).collect();
                    outstanding.extend(entries.iter().cloned());
                    let snapshot = coalescer.request(entries);
                    prop_assert!(
                        snapshot.is_none() || !in_flight,
                        "cycle started while another was in flight"
                    );
                    snapshot
                }
                Op::Complete => {
                    if !in_flight {
                        continue;
                    }
                    in_flight = false;
                    coalescer.finish_cycle()
                }
            };

            if let Some(snapshot) = dispatched {
                in_flight = true;
                let snapshot: BTreeSet<String> = snapshot.into_iter().collect();
                prop_assert_eq!(&snapshot, &outstanding);
                outstanding.clear();
            }

            prop_assert_eq!(coalescer.is_idle(), !in_flight);
            let pending: BTreeSet<String> = coalescer.pending().map(str::to_string).collect();
            prop_assert_eq!(pending, outstanding.clone());
        }

        // Drain: completing cycles eventually covers everything.
        while in_flight {
            match coalescer.finish_cycle() {
                Some(snapshot) => {
                    let snapshot: BTreeSet<String> = snapshot.into_iter().collect();
                    prop_assert_eq!(&snapshot, &outstanding);
                    outstanding.clear();
                }
                None => in_flight = false,
            }
        }
        prop_assert!(outstanding.is_empty());
        prop_assert!(coalescer.is_idle());
    }
}
