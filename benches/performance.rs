//! Performance benchmarks for the entity store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use estore::{sequential_ids, EStore, StoreConfig, StoreView};
use serde_json::{json, Value};

fn todos(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"id": format!("{}", i), "title": format!("todo {}", i), "complete": i % 2 == 0}))
        .collect()
}

fn create_store(entities: Vec<Value>, slices: usize) -> EStore<Value> {
    let config = StoreConfig::json().with_id_generator(sequential_ids("bench"));
    let mut store = EStore::with_config(entities, config);
    for i in 0..slices {
        store.add_slice(move |todo: &Value| todo["complete"] == (i % 2 == 0), format!("slice-{}", i));
    }
    store
}

/// Benchmark batch posts with a growing number of slices
fn bench_post_with_slices(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_a");

    for slice_count in [0, 1, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("slices", slice_count),
            &slice_count,
            |b, &slices| {
                b.iter(|| {
                    let mut store = create_store(Vec::new(), slices);
                    let mut batch = todos(100);
                    store.post_a(&mut batch);
                    black_box(store.count_snapshot());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark put_a flipping every entity in and out of the slices
fn bench_put_membership_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_a");

    for size in [100, 1000] {
        group.bench_with_input(BenchmarkId::new("entities", size), &size, |b, &size| {
            let mut store = create_store(todos(size), 4);
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                let updated: Vec<Value> = store
                    .all_snapshot()
                    .into_iter()
                    .map(|mut todo| {
                        todo["complete"] = Value::Bool(flip);
                        todo
                    })
                    .collect();
                store.put_a(&updated).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark point lookups against both indices
fn bench_lookups(c: &mut Criterion) {
    let store = create_store(todos(10_000), 0);

    c.bench_function("find_one_by_id", |b| {
        b.iter(|| black_box(store.find_one_by_id(black_box("5000"))));
    });

    c.bench_function("select", |b| {
        b.iter(|| black_box(store.select(|todo| todo["complete"] == true).len()));
    });
}

/// Benchmark snapshot delivery to many subscribers
fn bench_fan_out(c: &mut Criterion) {
    let mut store = create_store(todos(100), 0);
    let subscriptions: Vec<_> = (0..32).map(|_| store.observe()).collect();

    c.bench_function("post_fan_out_32", |b| {
        b.iter(|| {
            let mut todo = json!({"title": "bench", "complete": false});
            store.post(&mut todo);
            store.delete(&todo);
            for subscription in &subscriptions {
                black_box(subscription.latest());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_post_with_slices,
    bench_put_membership_churn,
    bench_lookups,
    bench_fan_out
);
criterion_main!(benches);
