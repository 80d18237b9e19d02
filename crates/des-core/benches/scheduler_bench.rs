use criterion::{criterion_group, criterion_main, Criterion, SamplingMode, Throughput};
use des_core::{Des, SimConfig};

/// Drives `n` clients, each issuing one `delay` to a distinct timestamp, to
/// completion. Exercises `EventQueue::insert`/`peek_min`/`take_slot` at
/// `n` distinct slots (the non-coalescing case).
fn run_distinct_timestamps(n: u64) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build benchmark runtime");
    rt.block_on(async {
        let (mut des, sim) = Des::<f64>::new(SimConfig::default());
        let mut handles = Vec::with_capacity(n as usize);
        for i in 0..n {
            let client = sim.register();
            handles.push(tokio::spawn(async move {
                client.delay(1.0 + i as f64, false).await.unwrap();
            }));
        }
        let _report = des.simulate((n + 1) as f64, true).await;
        for h in handles {
            h.await.unwrap();
        }
    });
}

/// Same client count, but every client shares a single timestamp, so the
/// queue coalesces them into one slot and the loop hits the FIFO-delivery
/// path inside a slot instead of one pop per client.
fn run_coalesced_timestamp(n: u64) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build benchmark runtime");
    rt.block_on(async {
        let (mut des, sim) = Des::<f64>::new(SimConfig::default());
        let mut handles = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let client = sim.register();
            handles.push(tokio::spawn(async move {
                client.delay_until(1.0, 1.0, false).await.unwrap();
            }));
        }
        let _report = des.simulate(2.0, true).await;
        for h in handles {
            h.await.unwrap();
        }
    });
}

pub fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler throughput");
    group.sampling_mode(SamplingMode::Flat);

    for n in [100u64, 1_000] {
        group.throughput(Throughput::Elements(n));
        group.bench_function(format!("distinct timestamps/{n}"), |b| {
            b.iter(|| run_distinct_timestamps(std::hint::black_box(n)))
        });
        group.bench_function(format!("coalesced timestamp/{n}"), |b| {
            b.iter(|| run_coalesced_timestamp(std::hint::black_box(n)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scheduler);
criterion_main!(benches);
