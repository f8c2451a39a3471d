//! Session Store Benchmarks
//!
//! Measures performance of store operations including:
//! - Upsert (new and overwrite)
//! - Get on live and expired sessions
//! - Raw row count

use std::sync::{Arc, Mutex};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rusqlite::Connection;
use serde_json::{json, Value as JsonValue};

use sess_core::session::expiry::compute_expiry;
use sess_core::{SqliteStore, SqliteStoreOptions};

fn memory_store() -> SqliteStore {
    let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
    SqliteStore::new(SqliteStoreOptions::new().with_client(conn)).unwrap()
}

fn sample_session(items: usize) -> JsonValue {
    json!({
        "cookie": {"maxAge": 3600, "httpOnly": true, "path": "/"},
        "user": {"id": 42, "name": "bench"},
        "items": (0..items).map(|i| format!("item-{}", i)).collect::<Vec<_>>(),
    })
}

/// Benchmark expiry computation
fn bench_expiry(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_expiry");
    let with_cookie = sample_session(0);
    let without_cookie = json!({"name": "x"});

    group.bench_function("compute_with_max_age", |b| {
        b.iter(|| compute_expiry(black_box(&with_cookie), 86_400, chrono::Utc::now()))
    });

    group.bench_function("compute_default", |b| {
        b.iter(|| compute_expiry(black_box(&without_cookie), 86_400, chrono::Utc::now()))
    });

    group.finish();
}

/// Benchmark store writes
fn bench_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_upsert");

    for items in [1, 50, 500].iter() {
        let session = sample_session(*items);
        let size = serde_json::to_string(&session).unwrap().len();
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("overwrite", items), &session, |b, session| {
            let store = memory_store();
            b.iter(|| store.upsert(black_box("bench-sid"), session).unwrap())
        });
    }

    group.bench_function("insert_new", |b| {
        let store = memory_store();
        let session = sample_session(10);
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            store.upsert(&format!("sid-{}", n), &session).unwrap()
        })
    });

    group.finish();
}

/// Benchmark store reads
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_get");

    group.bench_function("get_live", |b| {
        let store = memory_store();
        store.upsert("live", &sample_session(10)).unwrap();
        b.iter(|| store.get(black_box("live")).unwrap())
    });

    group.bench_function("get_expired", |b| {
        let store = memory_store();
        store.upsert("dead", &json!({"cookie": {"maxAge": -1}})).unwrap();
        b.iter(|| store.get(black_box("dead")).unwrap())
    });

    group.bench_function("get_missing", |b| {
        let store = memory_store();
        b.iter(|| store.get(black_box("missing")).unwrap())
    });

    group.finish();
}

/// Benchmark row counting
fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_count");

    for rows in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("count", rows), rows, |b, &rows| {
            let store = memory_store();
            let session = sample_session(1);
            for i in 0..rows {
                store.upsert(&format!("sid-{}", i), &session).unwrap();
            }
            b.iter(|| store.count().unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expiry, bench_upsert, bench_get, bench_count);

criterion_main!(benches);
