/// Dispatch Performance Benchmarks
///
/// 1. Haversine distance (called once per driver per booking)
/// 2. Full dispatch pass over registries of increasing size
/// 3. Presence upserts (the hot path of `driver-info`)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dispatch_hub::application::ports::EventEmitter;
use dispatch_hub::application::services::DispatchEngine;
use dispatch_hub::domain::{distance_km, Booking, DriverRegistry, EligibilityFilter, GeoPoint};
use dispatch_hub::shared::error::EmitError;
use dispatch_hub::shared::protocol::{ConnectionId, OutboundEvent};
use rand::Rng;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 只计数不发送
#[derive(Default)]
struct CountingEmitter {
    emitted: AtomicU64,
}

impl EventEmitter for CountingEmitter {
    fn emit(&self, _target: &ConnectionId, _event: &OutboundEvent) -> Result<(), EmitError> {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn random_report(rng: &mut impl Rng) -> serde_json::Value {
    let vehicle = if rng.gen_bool(0.5) { "sedan" } else { "suv" };
    let status = if rng.gen_bool(0.8) { "available" } else { "unavailable" };
    json!({
        "driverId": "bench",
        "location": { "coordinates": [rng.gen_range(-30.0..30.0), rng.gen_range(-30.0..30.0)] },
        "vehicleType": vehicle,
        "status": status
    })
}

fn populated_engine(drivers: usize) -> DispatchEngine<CountingEmitter> {
    let engine = DispatchEngine::new(
        Arc::new(DriverRegistry::new()),
        EligibilityFilter::new(),
        CountingEmitter::default(),
    );
    let mut rng = rand::thread_rng();
    for i in 0..drivers {
        let id = ConnectionId::from(format!("bench-{}", i));
        // 连接ID非空，不会失败
        let _ = engine.on_presence_report(&id, random_report(&mut rng));
    }
    engine
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("Geo - Haversine");
    group.throughput(Throughput::Elements(1));

    let a = GeoPoint::new(-122.4194, 37.7749);
    let b = GeoPoint::new(-118.2437, 34.0522);
    group.bench_function("distance_km", |bench| {
        bench.iter(|| distance_km(black_box(a), black_box(b)));
    });

    group.finish();
}

fn bench_dispatch_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dispatch - Full Pass");
    let booking = Booking::new(json!({
        "bookingId": "b-bench",
        "pickupLocation": { "coordinates": [0.0, 0.0] },
        "vehicleType": "sedan"
    }));

    for drivers in [100usize, 1_000, 10_000] {
        let engine = populated_engine(drivers);
        group.throughput(Throughput::Elements(drivers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(drivers), &engine, |bench, engine| {
            bench.iter(|| engine.dispatch_booking(black_box(&booking)));
        });
    }

    group.finish();
}

fn bench_presence_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("Registry - Presence Upsert");
    group.throughput(Throughput::Elements(1));

    let engine = populated_engine(1_000);
    let id = ConnectionId::from("bench-42");
    let mut rng = rand::thread_rng();
    group.bench_function("replace_existing", |bench| {
        bench.iter(|| {
            let report = random_report(&mut rng);
            engine.on_presence_report(black_box(&id), report)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_distance, bench_dispatch_pass, bench_presence_upsert);
criterion_main!(benches);
