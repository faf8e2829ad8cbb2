use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use tokio::runtime::Runtime as TokioRuntime;

use distill_core::config::{Catalog, DistillConfig};
use distill_core::constants::routing;
use distill_core::distilleries::Distillery;
use distill_core::messaging::{decode, InMemoryQueueService};
use distill_core::monitors::Monitor;
use distill_core::{Runtime, TimeUnit};

const MAIL: &str = "elasticsearch.cyphon.mail";

fn runtime() -> Runtime {
    let catalog = Catalog {
        distilleries: vec![Distillery::new(MAIL)],
        monitors: vec![Monitor::new("mail_health", vec![MAIL.to_string()], 5, TimeUnit::Minutes)],
        ..Catalog::default()
    };
    Runtime::build(
        &DistillConfig::default(),
        catalog,
        Arc::new(InMemoryQueueService::new()),
    )
}

fn benchmark_decode(c: &mut Criterion) {
    let body = serde_json::to_vec(&json!({
        "@uuid": "1",
        "collection": MAIL,
        "subject": "quarterly report",
        "body": "x".repeat(512),
    }))
    .unwrap();

    c.bench_function("decode", |b| b.iter(|| decode(black_box(&body))));
}

fn benchmark_dispatch(c: &mut Criterion) {
    let tokio = TokioRuntime::new().unwrap();
    let runtime = runtime();
    let heartbeat = serde_json::to_vec(&json!({"@uuid": "1", "collection": MAIL})).unwrap();

    c.bench_function("dispatch_monitor_heartbeat", |b| {
        b.iter(|| {
            tokio.block_on(
                runtime
                    .dispatcher
                    .dispatch(routing::MONITORS, black_box(&heartbeat)),
            )
        })
    });

    c.bench_function("dispatch_unroutable", |b| {
        b.iter(|| tokio.block_on(runtime.dispatcher.dispatch("bogus", black_box(&heartbeat))))
    });
}

criterion_group!(benches, benchmark_decode, benchmark_dispatch);
criterion_main!(benches);
