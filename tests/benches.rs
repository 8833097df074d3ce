#[macro_use]
extern crate criterion;
use criterion::Criterion;

mod recorder {
    use super::*;
    use mcp_hub::base::{CallOutcome, ErrorKind};
    use mcp_hub::stat::CallRecorder;

    pub fn bench_record(c: &mut Criterion) {
        let recorder = CallRecorder::new("mes", 1_000);
        let mut n = 0u64;
        c.bench_function("record into a full ring", |b| {
            b.iter(|| {
                n += 1;
                if n % 20 == 0 {
                    recorder.record(CallOutcome::failure(
                        n % 700,
                        ErrorKind::ConnectionTimeout,
                        "timed out",
                    ))
                } else {
                    recorder.record(CallOutcome::success(n % 700))
                }
            })
        });
    }
}

mod aggregation {
    use super::*;
    use mcp_hub::base::CallOutcome;
    use mcp_hub::config::ConfigEntity;
    use mcp_hub::Hub;

    pub fn bench_overall(c: &mut Criterion) {
        let hub = Hub::new(ConfigEntity::new()).unwrap();
        for system in ["edms", "mes", "lims", "erp", "training", "equipment"] {
            let recorder = hub.recorders().get_or_create(system);
            for i in 0..1_000u64 {
                recorder.record(CallOutcome::success(i % 1_200));
            }
        }
        c.bench_function("overall metrics over 6000 records", |b| {
            b.iter(|| hub.aggregator().overall_metrics())
        });
        c.bench_function("system health over 6000 records", |b| {
            b.iter(|| hub.aggregator().system_health())
        });
    }
}

criterion_group!(
    benches,
    recorder::bench_record,
    aggregation::bench_overall
);
criterion_main!(benches);
