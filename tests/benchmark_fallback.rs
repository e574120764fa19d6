// tests/benchmark_fallback.rs
//
// Benchmark resolution against aggregate sources:
// - in-memory submissions: most specific usable granularity wins
// - failing source: errors become "absent", never propagate
// - disabled capability: nothing is queried
// - every granularity is queried, so each candidate reports its n

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};

use courier_earnings::aggregates::{
    resolve_benchmark, resolve_platform_ranges, AggregateSource, InMemoryAggregates,
    QueryCapability, Submission,
};
use courier_earnings::benchmark::{
    AggregateFilter, BenchmarkAggregate, BenchmarkSource, Indicator, PlatformRange, Provenance,
};

fn subs(city: &str, platform: &str, count: usize, earnings: f64) -> Vec<Submission> {
    (0..count)
        .map(|_| Submission {
            city: city.into(),
            platform: platform.into(),
            hours_week: 10.0,
            deliveries_week: 30.0,
            earnings_week_czk: earnings,
        })
        .collect()
}

#[tokio::test]
async fn city_platform_wins_when_big_enough() {
    let mut all = subs("Praha", "Wolt", 25, 2_400.0); // 240 Kč/h
    all.extend(subs("Brno", "Wolt", 30, 2_000.0));
    let mem = InMemoryAggregates::new(all);

    let cmp = resolve_benchmark(&mem, QueryCapability::Enabled, 300.0, Some("Praha"), Some("Wolt")).await;
    let sel = cmp.selected.expect("selected");
    assert_eq!(sel.source, BenchmarkSource::CityPlatform);
    assert_eq!(sel.n, 25);
    assert_eq!(cmp.hourly.benchmark_hourly, Some(240.0));
    assert_eq!(cmp.hourly.indicator, Indicator::Above);
    assert_eq!(cmp.hourly.label, "+25 % nad průměrem");

    let ns: Vec<Option<u32>> = cmp.candidates.iter().map(|c| c.n).collect();
    assert_eq!(ns, vec![Some(25), Some(55), Some(55)]);
}

#[tokio::test]
async fn small_city_falls_back_to_platform() {
    let mut all = subs("Ostrava", "Bolt", 3, 1_500.0);
    all.extend(subs("Praha", "Bolt", 40, 2_000.0));
    let mem = InMemoryAggregates::new(all);

    let cmp = resolve_benchmark(&mem, QueryCapability::Enabled, 190.0, Some("Ostrava"), Some("Bolt")).await;
    let sel = cmp.selected.expect("selected");
    assert_eq!(sel.source, BenchmarkSource::Platform);
    assert_eq!(sel.label, "Platforma");
    assert_eq!(cmp.hourly.indicator, Indicator::Neutral);
}

#[tokio::test]
async fn tiny_dataset_uses_global_but_reports_insufficient() {
    let mem = InMemoryAggregates::new(subs("Praha", "Wolt", 5, 2_000.0));
    let cmp = resolve_benchmark(&mem, QueryCapability::Enabled, 300.0, Some("Praha"), Some("Wolt")).await;
    let sel = cmp.selected.expect("selected");
    assert_eq!(sel.source, BenchmarkSource::Global);
    assert_eq!(cmp.hourly.indicator, Indicator::InsufficientData);
    assert!(cmp.candidates.iter().all(|c| !c.usable));
}

#[tokio::test]
async fn large_samples_are_labelled_trimmed() {
    let mut all = subs("Praha", "Wolt", 59, 2_500.0);
    all.extend(subs("Praha", "Wolt", 1, 90_000.0)); // outlier
    let mem = InMemoryAggregates::new(all);

    let cmp = resolve_benchmark(&mem, QueryCapability::Enabled, 250.0, Some("Praha"), Some("Wolt")).await;
    let sel = cmp.selected.expect("selected");
    assert_eq!(sel.provenance, Provenance::Trimmed);
    assert_eq!(cmp.hourly.benchmark_hourly, Some(250.0));
    assert_eq!(cmp.hourly.indicator, Indicator::Neutral);
}

/// Fails for every filter that has a city; counts calls.
#[derive(Default)]
struct Flaky {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl AggregateSource for Flaky {
    async fn fetch_aggregate(&self, filter: &AggregateFilter) -> Result<Option<BenchmarkAggregate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if filter.city.is_some() {
            return Err(anyhow!("connection reset"));
        }
        if filter.platform.is_some() {
            return Ok(None);
        }
        Ok(Some(BenchmarkAggregate {
            n: 500,
            avg_hourly_rate: Some(200.0),
            ..Default::default()
        }))
    }

    async fn fetch_platform_ranges(&self, _city: Option<&str>) -> Result<Vec<PlatformRange>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("timeout"))
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn failures_are_treated_as_absent() {
    let src = Flaky::default();
    let cmp = resolve_benchmark(&src, QueryCapability::Enabled, 180.0, Some("Praha"), Some("Wolt")).await;

    assert_eq!(src.calls.load(Ordering::SeqCst), 3);
    assert_eq!(cmp.candidates[0].n, None);
    assert_eq!(cmp.candidates[1].n, None);
    assert_eq!(cmp.candidates[2].n, Some(500));
    let sel = cmp.selected.expect("global selected");
    assert_eq!(sel.source, BenchmarkSource::Global);
    assert_eq!(cmp.hourly.indicator, Indicator::Below);

    let ranges = resolve_platform_ranges(&src, QueryCapability::Enabled, Some("Praha")).await;
    assert!(ranges.is_empty());
}

#[tokio::test]
async fn disabled_capability_queries_nothing() {
    let src = Flaky::default();
    let cmp = resolve_benchmark(&src, QueryCapability::Disabled, 250.0, Some("Praha"), Some("Wolt")).await;
    assert!(!cmp.available);
    assert!(cmp.candidates.is_empty());
    assert_eq!(cmp.hourly.indicator, Indicator::InsufficientData);

    let ranges = resolve_platform_ranges(&src, QueryCapability::Disabled, None).await;
    assert!(ranges.is_empty());
    assert_eq!(src.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_resolution_is_idempotent() {
    let mem = InMemoryAggregates::new(subs("Brno", "Wolt", 30, 2_100.0));
    let a = resolve_benchmark(&mem, QueryCapability::Enabled, 230.0, Some("Brno"), Some("Wolt")).await;
    let b = resolve_benchmark(&mem, QueryCapability::Enabled, 230.0, Some("Brno"), Some("Wolt")).await;
    assert_eq!(a, b);
}
