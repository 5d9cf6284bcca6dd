//! Criterion benchmarks for the shop-floor core.
//!
//! Three benchmark groups:
//! - `inventory`: receipts, reservation cycles and location queries on a
//!   stocked warehouse
//! - `random`: keyed draws across many machines
//! - `session`: full ticks with test machine drivers

use criterion::{Criterion, criterion_group, criterion_main};
use shopfloor_core::id::*;
use shopfloor_core::random::{Channel, RandomStreams};
use shopfloor_core::test_utils::*;

// ===========================================================================
// Inventory
// ===========================================================================

fn bench_inventory(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory");

    group.bench_function("receive_1000_batches", |b| {
        b.iter(|| {
            let mut inv = seeded_inventory(1);
            inv.register_location(WAREHOUSE, Default::default(), vol(1_000_000.0), 0);
            for _ in 0..1000 {
                inv.add_raw_material(RAW_SKU, 10, WAREHOUSE, None, vol(0.5)).unwrap();
            }
            inv
        });
    });

    // One work order's worth of reserve, draw, produce, release.
    group.bench_function("reserve_consume_produce_cycle", |b| {
        b.iter_batched(
            || shop_inventory(10_000),
            |mut inv| {
                let wo = WorkOrderId(1);
                inv.reserve_material(RAW_SKU, 20, WAREHOUSE, wo, "M1").unwrap();
                for _ in 0..20 {
                    inv.consume_reserved_material("M1", wo, RAW_SKU).unwrap();
                    inv.produce_finished_good("M1", wo, "Gear", FG_STORE).unwrap();
                }
                inv.release_reservation("M1", wo);
                inv
            },
            criterion::BatchSize::LargeInput,
        );
    });

    let inv = shop_inventory(10_000);
    group.bench_function("available_quantity_at_location", |b| {
        b.iter(|| inv.available_quantity(RAW_SKU, Some(WAREHOUSE)));
    });
    group.bench_function("state_hash", |b| {
        b.iter(|| inv.state_hash());
    });

    group.finish();
}

// ===========================================================================
// Random
// ===========================================================================

fn bench_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("random");
    let keys: Vec<String> = (0..1000).map(|i| format!("M{i}")).collect();
    let mut random = RandomStreams::new(42);
    random.begin_tick(17);

    group.bench_function("uniform_float_1000_keys", |b| {
        b.iter(|| {
            keys.iter()
                .map(|k| random.uniform_float(k, Channel::QUALITY, 0.0, 1.0))
                .sum::<f64>()
        });
    });

    group.bench_function("bernoulli_1000_keys", |b| {
        b.iter(|| {
            keys.iter()
                .filter(|k| random.bernoulli_event_in_step(k, Channel::FAILURES, 0.01, 5.0))
                .count()
        });
    });

    group.finish();
}

// ===========================================================================
// Session
// ===========================================================================

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function("100_ticks_10_machines", |b| {
        b.iter_batched(
            || shop_orchestrator(42, 10, 40).0,
            |mut o| {
                o.run_ticks(100);
                o
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_inventory, bench_random, bench_session);
criterion_main!(benches);
