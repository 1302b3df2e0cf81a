use criterion::{black_box, criterion_group, criterion_main, Criterion};

use socialgraph::graph::query::GraphQuery;
use socialgraph::graph::store::{MemoryStore, RecordStore, SqliteStore};
use socialgraph::types::{UserId, UserRecord};

/// Ring of `n` users where each lists the next five, so every user has
/// five neighbors and a non-trivial two-hop set.
fn ring(n: i64) -> Vec<UserRecord> {
    (1..=n)
        .map(|id| {
            let friends = (1..=5).map(|k| (id + k - 1) % n + 1).collect();
            UserRecord::new(id, friends)
        })
        .collect()
}

fn bench_queries(c: &mut Criterion) {
    let records = ring(5_000);
    let memory = MemoryStore::with_records(&records).unwrap();
    let sqlite = SqliteStore::in_memory().unwrap();
    sqlite.replace_all(&records).unwrap();
    let subject = UserId::try_from(2_500).unwrap();

    let stores: [(&str, &dyn RecordStore); 2] = [("memory", &memory), ("sqlite", &sqlite)];
    for (name, store) in stores {
        let engine = GraphQuery::new(store);
        c.bench_function(&format!("{name}/neighbors"), |b| {
            b.iter(|| engine.neighbors(black_box(subject)).unwrap())
        });
        c.bench_function(&format!("{name}/neighbors_of_neighbors"), |b| {
            b.iter(|| engine.neighbors_of_neighbors(black_box(subject)).unwrap())
        });
        c.bench_function(&format!("{name}/suggestions"), |b| {
            b.iter(|| engine.suggestions(black_box(subject)).unwrap())
        });
    }
}

criterion_group!(benches, bench_queries);
criterion_main!(benches);
