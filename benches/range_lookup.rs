//! 段表查询与解析引擎性能基准测试

use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use geoip_resolver::errors::Result;
use geoip_resolver::services::geoip::{
    IpRange, Location, LocationSource, RangeTable, RefreshOutcome, ResolutionEngine, parse_ipv4,
};

fn build_table(size: u32) -> RangeTable {
    let ranges = (0..size)
        .map(|i| IpRange {
            start: i * 256,
            end: i * 256 + 255,
            location: Location::new(
                format!("Country{}", i % 200),
                format!("City{}", i),
                "Region",
                "0000",
                0.0,
                0.0,
                "UTC",
            ),
        })
        .collect();
    RangeTable::new(ranges)
}

fn ip_for(value: u32) -> String {
    let [a, b, c, d] = value.to_be_bytes();
    format!("{}.{}.{}.{}", a, b, c, d)
}

// ============== parse_ipv4 基准测试 ==============

fn bench_parse_ipv4(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_table/parse_ipv4");

    group.bench_function("valid", |b| {
        b.iter(|| black_box(parse_ipv4(black_box("203.0.113.77"))));
    });

    group.bench_function("invalid", |b| {
        b.iter(|| black_box(parse_ipv4(black_box("203.0.113.777"))));
    });

    group.finish();
}

// ============== RangeTable::lookup 基准测试 ==============

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_table/lookup");

    for size in [1_000u32, 100_000, 1_000_000] {
        let table = build_table(size);
        let hit = ip_for((size / 2) * 256 + 17);
        let miss = ip_for(size * 256 + 1);

        group.bench_with_input(BenchmarkId::new("hit", size), &hit, |b, ip| {
            b.iter(|| black_box(table.lookup(ip)));
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &miss, |b, ip| {
            b.iter(|| black_box(table.lookup(ip)));
        });
    }

    group.finish();
}

// ============== ResolutionEngine::resolve 基准测试 ==============

struct TableSource(RangeTable);

#[async_trait]
impl LocationSource for TableSource {
    async fn resolve(&self, ip: &str) -> Location {
        self.0.lookup(ip)
    }

    async fn refresh(&self) -> Result<RefreshOutcome> {
        Ok(RefreshOutcome::Unchanged)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn confidence(&self) -> f64 {
        0.8
    }

    fn source_name(&self) -> &'static str {
        "BENCH_TABLE"
    }
}

fn bench_engine(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("engine/resolve");

    let source: Arc<dyn LocationSource> = Arc::new(TableSource(build_table(100_000)));
    let engine = ResolutionEngine::new(vec![source], 10_000);
    let hot = ip_for(1234 * 256 + 5);
    rt.block_on(engine.resolve(&hot));

    group.bench_function("cache_hit", |b| {
        b.to_async(&rt).iter(|| async { black_box(engine.resolve(&hot).await) });
    });

    group.bench_function("uncached", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(engine.resolve_uncached(&hot).await) });
    });

    group.finish();
}

criterion_group!(benches, bench_parse_ipv4, bench_lookup, bench_engine);
criterion_main!(benches);
