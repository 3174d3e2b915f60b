//! Property tests: slices stay in sync with the store under arbitrary
//! mutation sequences.

use estore::{sequential_ids, EStore, Entity, StoreConfig, StoreView};
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Counter {
    gid: Option<String>,
    value: u8,
}

impl Entity for Counter {
    fn gid(&self) -> Option<&str> {
        self.gid.as_deref()
    }

    fn set_gid(&mut self, gid: String) {
        self.gid = Some(gid);
    }
}

fn is_even(counter: &Counter) -> bool {
    counter.value % 2 == 0
}

#[derive(Clone, Debug)]
enum Op {
    Post(u8),
    PostBatch(Vec<u8>),
    Put { pick: usize, value: u8 },
    PutBatch(Vec<(usize, u8)>),
    Repost { pick: usize, value: u8 },
    Delete(usize),
    DeleteWhere(u8),
    Activate(usize),
    Reset,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u8>().prop_map(Op::Post),
        1 => prop::collection::vec(any::<u8>(), 0..5).prop_map(Op::PostBatch),
        4 => (any::<usize>(), any::<u8>()).prop_map(|(pick, value)| Op::Put { pick, value }),
        // Small pick range so a batch often names the same entity twice.
        2 => prop::collection::vec((0..4usize, any::<u8>()), 0..6).prop_map(Op::PutBatch),
        3 => (any::<usize>(), any::<u8>()).prop_map(|(pick, value)| Op::Repost { pick, value }),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => any::<u8>().prop_map(Op::DeleteWhere),
        2 => any::<usize>().prop_map(Op::Activate),
        1 => Just(Op::Reset),
    ]
}

/// Pick an existing entity by index, if the store holds any.
fn pick(store: &EStore<Counter>, index: usize) -> Option<Counter> {
    let all = store.all_snapshot();
    if all.is_empty() {
        None
    } else {
        Some(all[index % all.len()].clone())
    }
}

fn apply(store: &mut EStore<Counter>, op: Op) {
    match op {
        Op::Post(value) => {
            store.post(&mut Counter { gid: None, value });
        }
        Op::PostBatch(values) => {
            let mut batch: Vec<Counter> = values
                .into_iter()
                .map(|value| Counter { gid: None, value })
                .collect();
            store.post_a(&mut batch);
        }
        Op::Put { pick: index, value } => {
            if let Some(mut counter) = pick(store, index) {
                counter.value = value;
                store.put(counter).unwrap();
            }
        }
        Op::PutBatch(updates) => {
            let batch: Vec<Counter> = updates
                .into_iter()
                .filter_map(|(index, value)| {
                    pick(store, index).map(|mut counter| {
                        counter.value = value;
                        counter
                    })
                })
                .collect();
            store.put_a(&batch).unwrap();
        }
        Op::Repost { pick: index, value } => {
            if let Some(mut counter) = pick(store, index) {
                counter.value = value;
                store.post(&mut counter);
            }
        }
        Op::Delete(index) => {
            if let Some(counter) = pick(store, index) {
                store.delete(&counter);
            }
        }
        Op::DeleteWhere(threshold) => store.delete_p(|counter| counter.value < threshold),
        Op::Activate(index) => {
            if let Some(mut counter) = pick(store, index) {
                store.add_active(&mut counter);
            }
        }
        Op::Reset => store.reset(),
    }
}

fn sorted_guids(entities: &[Counter]) -> Vec<String> {
    let mut guids: Vec<String> = entities.iter().filter_map(|c| c.gid.clone()).collect();
    guids.sort();
    guids
}

proptest! {
    #[test]
    fn slice_membership_matches_predicate(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = EStore::with_config(
            Vec::new(),
            StoreConfig::default().with_id_generator(sequential_ids("c")),
        );
        store.add_slice(is_even, "even");

        for op in ops {
            apply(&mut store, op);

            let slice = store.get_slice("even").unwrap();
            prop_assert_eq!(
                sorted_guids(&slice.all_snapshot()),
                sorted_guids(&store.select(is_even))
            );
            // Slice members carry the store's current values.
            for member in slice.all_snapshot() {
                let gid = member.gid.as_deref().unwrap();
                prop_assert_eq!(store.find_one(gid), Some(member.clone()));
            }
        }
    }

    #[test]
    fn active_set_is_subset_of_store(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut store = EStore::with_config(
            Vec::new(),
            StoreConfig::default().with_id_generator(sequential_ids("c")),
        );

        for op in ops {
            apply(&mut store, op);

            for active in store.active_snapshot() {
                prop_assert!(store.contains(&active));
            }
        }
    }

    #[test]
    fn latest_snapshot_matches_store(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut store = EStore::with_config(
            Vec::new(),
            StoreConfig::default().with_id_generator(sequential_ids("c")),
        );
        let snapshots = store.observe();
        let counts = store.count();

        for op in ops {
            apply(&mut store, op);
        }

        let latest = snapshots.latest().unwrap();
        prop_assert_eq!(sorted_guids(&latest), sorted_guids(&store.all_snapshot()));
        prop_assert_eq!(latest.len(), store.count_snapshot());
        prop_assert_eq!(counts.latest(), Some(store.count_snapshot()));
    }
}
