//! Benchmarks for typed channel reads through the client interface
//!
//! Covers:
//! - Name resolution versus cached index reads
//! - Scalar coercions (float, int, bool, bitfield) on the current row
//! - Array entries and out-of-range probes
//! - `VarHolder` reads through the client manager
//!
//! Platform: Cross-platform (synthetic recording built in memory)

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use paddock::test_utils::{TestRow, consecutive_rows, ibt_bytes};
use paddock::{Client, ClientManager, DiskClient, DiskClientOptions, KnownVar, VarHolder, read_var};
use std::hint::black_box;
use std::io::Cursor;
use std::sync::Arc;

type MemoryDisk = DiskClient<Cursor<Vec<u8>>>;

fn load_client() -> Arc<MemoryDisk> {
    let mut rows = consecutive_rows(1, 64);
    rows.push(TestRow::at(65).in_session(1, 30.0));
    let bytes = ibt_bytes(&rows, "").expect("synthetic recording");
    Arc::new(
        DiskClient::from_reader(Cursor::new(bytes), DiskClientOptions::default())
            .expect("open synthetic recording"),
    )
}

fn bench_scalar_reads(c: &mut Criterion) {
    let client = load_client();
    let speed = client.var_idx_known(KnownVar::Speed).expect("Speed");
    let gear = client.var_idx_known(KnownVar::Gear).expect("Gear");
    let pit = client.var_idx_known(KnownVar::OnPitRoad).expect("OnPitRoad");
    let flags = client.var_idx_known(KnownVar::SessionFlags).expect("SessionFlags");

    let mut group = c.benchmark_group("scalar_reads");

    group.bench_function("f32_speed", |b| b.iter(|| black_box(client.get_var_float(black_box(speed), 0))));
    group.bench_function("i32_gear", |b| b.iter(|| black_box(client.get_var_int(black_box(gear), 0))));
    group.bench_function("f32_as_i32_speed", |b| {
        b.iter(|| black_box(client.get_var_int(black_box(speed), 0)))
    });
    group.bench_function("bool_on_pit_road", |b| {
        b.iter(|| black_box(client.get_var_bool(black_box(pit), 0)))
    });
    group.bench_function("bitfield_session_flags", |b| {
        b.iter(|| {
            let bits = client.get_var_bitfield(black_box(flags), 0);
            black_box(bits.map(|f| f.has_flag(0x0000_0001)))
        })
    });

    group.finish();
}

fn bench_name_resolution(c: &mut Criterion) {
    let client = load_client();
    let mut group = c.benchmark_group("name_resolution");

    group.bench_function("var_idx_lookup", |b| b.iter(|| black_box(client.var_idx(black_box("RPM")))));
    group.bench_function("read_var_by_name", |b| {
        b.iter(|| black_box(read_var::<f32>(client.as_ref(), black_box("RPM"), 0)))
    });
    group.bench_function("missing_name", |b| {
        b.iter(|| black_box(read_var::<f32>(client.as_ref(), black_box("NoSuchChannel"), 0)))
    });

    group.finish();
}

fn bench_array_entries(c: &mut Criterion) {
    let client = load_client();
    let laps = client.var_idx("CarIdxLap").expect("CarIdxLap");
    let count = client.var_count(laps).unwrap_or_default();

    let mut group = c.benchmark_group("array_entries");

    group.bench_function(BenchmarkId::new("i32_all_entries", count), |b| {
        b.iter(|| {
            let sum: i32 = (0..count).filter_map(|e| client.get_var_int(laps, e)).sum();
            black_box(sum)
        })
    });
    group.bench_function("out_of_range_entry", |b| {
        b.iter(|| black_box(client.get_var_int(laps, black_box(count))))
    });

    group.finish();
}

fn bench_var_holder(c: &mut Criterion) {
    let client = load_client();
    let manager = Arc::new(ClientManager::new());
    let dyn_client: Arc<dyn Client> = client.clone();
    manager.add(client.client_id(), Arc::downgrade(&dyn_client), true);

    let rpm = VarHolder::known(KnownVar::Rpm, manager.clone());
    let missing = VarHolder::new("NoSuchChannel", manager);

    let mut group = c.benchmark_group("var_holder");

    group.bench_function("bound_read", |b| b.iter(|| black_box(rpm.get_float(0))));
    group.bench_function("unresolved_read", |b| b.iter(|| black_box(missing.get_float(0))));

    group.finish();
}

criterion_group!(
    benches,
    bench_scalar_reads,
    bench_name_resolution,
    bench_array_entries,
    bench_var_holder
);
criterion_main!(benches);
