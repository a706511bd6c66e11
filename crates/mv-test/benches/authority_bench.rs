//! Benchmarks for the authority state machine

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mv_authority::{check_rights, AuthorityManager, HandoffResponse, Mandate};
use mv_core::{ConnectionInfo, ParcelId, UserId, UserPrivacySettings};
use mv_test::{AuthorityFuzzer, FuzzerConfig, Recorder};

fn bench_rights_check(c: &mut Criterion) {
    let settings = UserPrivacySettings::default();
    let mandates: BTreeSet<Mandate> = [Mandate::VisualOverride, Mandate::PhysicsOverride]
        .into_iter()
        .collect();

    c.bench_function("rights_check", |b| {
        b.iter(|| check_rights(black_box(&mandates), black_box(&settings)))
    });
}

fn bench_handoff_cycle(c: &mut Criterion) {
    let recorder = Recorder::new();
    let mut manager =
        AuthorityManager::new(UserPrivacySettings::default(), recorder.hooks(UserId::default()));
    let server = ConnectionInfo::new("parcel.bench", 4434, [2; 32]);

    c.bench_function("request_approve_exit", |b| {
        b.iter(|| {
            manager.request_entry(ParcelId::new(1), server.clone());
            if let Some(id) = manager.pending_request() {
                manager.on_handoff_response(HandoffResponse::approve(id));
            }
            let exit = manager.emergency_exit();
            recorder.clear();
            black_box(exit)
        })
    });
}

fn bench_fuzzer(c: &mut Criterion) {
    c.bench_function("fuzz_light", |b| {
        b.iter(|| AuthorityFuzzer::new(FuzzerConfig::light()).run())
    });
}

criterion_group!(benches, bench_rights_check, bench_handoff_cycle, bench_fuzzer);
criterion_main!(benches);
