//! Benchmarks for access decisions
//!
//! `evaluate_and_reclassify` runs on every `/api/check`, under the store
//! lock, so it should stay well under a millisecond even with many clients.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gatehouse::access::{AccessStore, DecisionEngine, DesktopHeuristic, DeviceTelemetry, PresenceTracker};
use gatehouse::clock::ManualClock;
use gatehouse::persistence::MemoryStore;
use std::sync::Arc;

/// Store with `size` clients, every tenth one verified and none tripping
/// the heuristic. Persistence goes to memory.
fn populated_engine(size: usize) -> DecisionEngine {
    let store = Arc::new(AccessStore::load(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(1_000)),
    ));
    let presence = PresenceTracker::new(Arc::clone(&store));
    let phone = DeviceTelemetry {
        platform: Some("iPhone".to_string()),
        user_agent: Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile".to_string()),
        ..DeviceTelemetry::default()
    };

    for i in 0..size {
        let token = format!("client-{i}");
        presence.hello(&token, Some(&phone), Some("10.0.0.1"));
        if i % 10 == 0 {
            store.verify(&token);
        }
    }

    DecisionEngine::new(store, Arc::new(DesktopHeuristic::default()))
}

fn benchmark_known_client(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_known_client");

    for size in [10, 1_000, 10_000] {
        let engine = populated_engine(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.evaluate_and_reclassify(black_box(Some("client-5")), Some("10.0.0.1")));
        });
    }

    group.finish();
}

fn benchmark_ip_ban(c: &mut Criterion) {
    let engine = populated_engine(1_000);
    let store = AccessStore::load(
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(1_000)),
    );
    store.ban_ip("10.9.9.9", Some("no"));
    let banned = DecisionEngine::new(Arc::new(store), Arc::new(DesktopHeuristic::default()));

    c.bench_function("evaluate_ip_banned", |b| {
        b.iter(|| banned.evaluate_and_reclassify(black_box(Some("client-5")), Some("10.9.9.9")));
    });
    c.bench_function("evaluate_missing_token", |b| {
        b.iter(|| engine.evaluate_and_reclassify(black_box(None), Some("10.0.0.1")));
    });
}

criterion_group!(benches, benchmark_known_client, benchmark_ip_ban);
criterion_main!(benches);
