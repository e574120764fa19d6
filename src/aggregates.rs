//! Read side of the benchmark backend.
//!
//! `AggregateSource` is the seam: `RpcAggregates` talks to a PostgREST-style
//! RPC endpoint (`get_benchmarks`, `get_platform_ranges`), `InMemoryAggregates`
//! computes the same rows from a list of submissions (fixtures, tests).
//! `resolve_benchmark` queries every granularity and hands the candidates to
//! the pure comparator; failures become "absent", never errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::benchmark::{
    self, AggregateFilter, BenchmarkAggregate, BenchmarkComparison, Candidate, PlatformRange,
    SOURCE_PRIORITY,
};
use crate::calc::{calculate_all, CalculationInputs};

/// Sample size from which the in-memory source trims outliers.
pub const TRIM_MIN_SAMPLE: usize = 50;
/// Share of values dropped from each tail when trimming.
pub const TRIM_FRACTION: f64 = 0.10;

/// Whether a query backend is wired up at all. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCapability {
    Enabled,
    Disabled,
}

impl QueryCapability {
    pub fn is_enabled(self) -> bool {
        matches!(self, QueryCapability::Enabled)
    }
}

#[async_trait::async_trait]
pub trait AggregateSource: Send + Sync {
    /// One aggregate row for the filter; `Ok(None)` when the backend has nothing.
    async fn fetch_aggregate(&self, filter: &AggregateFilter) -> Result<Option<BenchmarkAggregate>>;
    /// Hourly quartiles per platform, optionally restricted to a city.
    async fn fetch_platform_ranges(&self, city: Option<&str>) -> Result<Vec<PlatformRange>>;
    fn name(&self) -> &'static str;
}

async fn fetch_or_absent(
    source: &dyn AggregateSource,
    filter: &AggregateFilter,
) -> Option<BenchmarkAggregate> {
    match source.fetch_aggregate(filter).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, provider = source.name(), ?filter, "aggregate fetch failed");
            counter!("aggregate_fetch_errors_total").increment(1);
            None
        }
    }
}

/// Query all granularities (most specific first) and compare.
pub async fn resolve_benchmark(
    source: &dyn AggregateSource,
    capability: QueryCapability,
    user_hourly: f64,
    city: Option<&str>,
    platform: Option<&str>,
) -> BenchmarkComparison {
    if !capability.is_enabled() {
        tracing::debug!("benchmark skipped: query backend not configured");
        counter!("benchmark_unavailable_total").increment(1);
        return benchmark::unavailable(user_hourly);
    }

    let mut candidates = Vec::with_capacity(SOURCE_PRIORITY.len());
    for src in SOURCE_PRIORITY {
        let filter = src.filter(city, platform);
        let aggregate = fetch_or_absent(source, &filter).await;
        candidates.push(Candidate {
            source: src,
            aggregate,
        });
    }

    let cmp = benchmark::compare_hourly(user_hourly, &candidates);
    match &cmp.selected {
        Some(sel) => {
            tracing::info!(source = sel.source.as_str(), n = sel.n, trimmed = sel.aggregate.trimmed, "benchmark selected");
            counter!("benchmark_source_total", "source" => sel.source.as_str()).increment(1);
        }
        None => {
            tracing::info!("benchmark unavailable");
            counter!("benchmark_unavailable_total").increment(1);
        }
    }
    cmp
}

/// Platform ranges or an empty list when disabled / failing.
pub async fn resolve_platform_ranges(
    source: &dyn AggregateSource,
    capability: QueryCapability,
    city: Option<&str>,
) -> Vec<PlatformRange> {
    if !capability.is_enabled() {
        return Vec::new();
    }
    let city = city.map(str::trim).filter(|c| !c.is_empty());
    match source.fetch_platform_ranges(city).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, provider = source.name(), "platform ranges fetch failed");
            counter!("aggregate_fetch_errors_total").increment(1);
            Vec::new()
        }
    }
}

/* ----------------------------
HTTP RPC backend
---------------------------- */

pub struct RpcAggregates {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl RpcAggregates {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building RPC http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    async fn rpc(&self, name: &str, body: Value) -> Result<Vec<Value>> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, name);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("rpc {name}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("rpc {name} returned {status}");
        }
        let v: Value = resp
            .json()
            .await
            .with_context(|| format!("parse rpc {name} JSON"))?;
        Ok(rows(v))
    }
}

#[async_trait::async_trait]
impl AggregateSource for RpcAggregates {
    async fn fetch_aggregate(&self, filter: &AggregateFilter) -> Result<Option<BenchmarkAggregate>> {
        let body = json!({ "p_city": filter.city, "p_platform": filter.platform });
        let rows = self.rpc("get_benchmarks", body).await?;
        Ok(rows.first().map(|r| {
            let mut a = aggregate_from_row(r);
            a.fetched_at = Some(chrono::Utc::now());
            a
        }))
    }

    async fn fetch_platform_ranges(&self, city: Option<&str>) -> Result<Vec<PlatformRange>> {
        let rows = self
            .rpc("get_platform_ranges", json!({ "p_city": city }))
            .await?;
        Ok(rows.iter().map(range_from_row).collect())
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}

/// Top-level RPC payload → list of rows (`null` → empty, object → single row).
fn rows(v: Value) -> Vec<Value> {
    match v {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Numbers arrive as JSON numbers or, for `numeric` columns, as strings.
fn num(v: Option<&Value>) -> Option<f64> {
    let x = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    x.filter(|x| x.is_finite())
}

fn count(v: Option<&Value>) -> u32 {
    num(v).map(|x| x.max(0.0) as u32).unwrap_or(0)
}

/// Tolerant row parse: missing fields become `None` / `0`.
pub fn aggregate_from_row(row: &Value) -> BenchmarkAggregate {
    BenchmarkAggregate {
        n: count(row.get("n")),
        avg_hourly_rate: num(row.get("avg_hourly_rate")),
        avg_earnings_per_delivery: num(row.get("avg_earnings_per_delivery")),
        avg_earnings_week_czk: num(row.get("avg_earnings_week_czk")),
        trimmed: row.get("trimmed").and_then(Value::as_bool).unwrap_or(false),
        fetched_at: None,
    }
}

pub fn range_from_row(row: &Value) -> PlatformRange {
    PlatformRange {
        platform: row
            .get("platform")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        n: count(row.get("n")),
        p25_hourly: num(row.get("p25_hourly")),
        p50_hourly: num(row.get("p50_hourly")),
        p75_hourly: num(row.get("p75_hourly")),
    }
}

/* ----------------------------
In-memory backend
---------------------------- */

/// One stored submission (raw weekly figures).
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct Submission {
    pub city: String,
    pub platform: String,
    pub hours_week: f64,
    pub deliveries_week: f64,
    pub earnings_week_czk: f64,
}

impl Submission {
    fn derived(&self) -> (f64, f64) {
        let r = calculate_all(&CalculationInputs {
            hours_per_week: self.hours_week,
            deliveries_per_week: self.deliveries_week,
            earnings_per_week: self.earnings_week_czk,
        });
        (r.hourly_rate, r.earnings_per_delivery)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAggregates {
    submissions: Vec<Submission>,
}

impl InMemoryAggregates {
    pub fn new(submissions: Vec<Submission>) -> Self {
        Self { submissions }
    }

    /// Load a JSON array of submissions.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading submissions from {}", path.display()))?;
        let submissions: Vec<Submission> = serde_json::from_str(&data)
            .with_context(|| format!("parsing submissions in {}", path.display()))?;
        Ok(Self::new(submissions))
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    fn matching<'a>(&'a self, filter: &'a AggregateFilter) -> impl Iterator<Item = &'a Submission> + 'a {
        self.submissions.iter().filter(move |s| {
            filter.city.as_deref().map_or(true, |c| s.city.trim() == c)
                && filter.platform.as_deref().map_or(true, |p| s.platform.trim() == p)
        })
    }

    /// Same shape the RPC returns: always a row, `n = 0` and nulls when empty.
    pub fn aggregate(&self, filter: &AggregateFilter) -> BenchmarkAggregate {
        let rows: Vec<&Submission> = self.matching(filter).collect();
        let n = rows.len();
        let trimmed = n >= TRIM_MIN_SAMPLE;
        let fraction = if trimmed { TRIM_FRACTION } else { 0.0 };

        let mut hourly = Vec::with_capacity(n);
        let mut per_delivery = Vec::with_capacity(n);
        let mut weekly = Vec::with_capacity(n);
        for s in &rows {
            let (h, e) = s.derived();
            hourly.push(h);
            per_delivery.push(e);
            weekly.push(s.earnings_week_czk);
        }

        BenchmarkAggregate {
            n: n as u32,
            avg_hourly_rate: trimmed_mean(&mut hourly, fraction),
            avg_earnings_per_delivery: trimmed_mean(&mut per_delivery, fraction),
            avg_earnings_week_czk: trimmed_mean(&mut weekly, fraction),
            trimmed,
            fetched_at: None,
        }
    }

    /// Quartiles of the hourly rate per platform, sorted by platform name.
    pub fn platform_ranges(&self, city: Option<&str>) -> Vec<PlatformRange> {
        let mut by_platform: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for s in &self.submissions {
            if city.is_some_and(|c| s.city.trim() != c) {
                continue;
            }
            by_platform
                .entry(s.platform.trim())
                .or_default()
                .push(s.derived().0);
        }

        by_platform
            .into_iter()
            .map(|(platform, mut values)| {
                values.sort_by(f64::total_cmp);
                PlatformRange {
                    platform: platform.to_string(),
                    n: values.len() as u32,
                    p25_hourly: percentile(&values, 0.25),
                    p50_hourly: percentile(&values, 0.50),
                    p75_hourly: percentile(&values, 0.75),
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AggregateSource for InMemoryAggregates {
    async fn fetch_aggregate(&self, filter: &AggregateFilter) -> Result<Option<BenchmarkAggregate>> {
        Ok(Some(self.aggregate(filter)))
    }

    async fn fetch_platform_ranges(&self, city: Option<&str>) -> Result<Vec<PlatformRange>> {
        Ok(self.platform_ranges(city))
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Mean after dropping `floor(n * fraction)` values from each tail.
/// Sorts `values` in place. `None` when empty.
pub fn trimmed_mean(values: &mut [f64], fraction: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let k = ((values.len() as f64) * fraction.clamp(0.0, 0.49)).floor() as usize;
    let kept = &values[k..values.len() - k];
    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Continuous percentile (linear interpolation) over sorted values.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(city: &str, platform: &str, hours: f64, deliveries: f64, earnings: f64) -> Submission {
        Submission {
            city: city.into(),
            platform: platform.into(),
            hours_week: hours,
            deliveries_week: deliveries,
            earnings_week_czk: earnings,
        }
    }

    #[test]
    fn trimmed_mean_drops_tails() {
        let mut v: Vec<f64> = (1..=10).map(f64::from).collect();
        v.push(1_000.0);
        // 11 values, 10 % → 1 dropped each side: 2..=10 → mean 6
        let m = trimmed_mean(&mut v, 0.10).unwrap();
        assert!((m - 6.0).abs() < 1e-9);
        assert_eq!(trimmed_mean(&mut [], 0.1), None);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [100.0, 200.0, 300.0, 400.0];
        assert_eq!(percentile(&v, 0.0), Some(100.0));
        assert_eq!(percentile(&v, 0.5), Some(250.0));
        assert_eq!(percentile(&v, 1.0), Some(400.0));
        assert!((percentile(&v, 0.25).unwrap() - 175.0).abs() < 1e-9);
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn aggregate_filters_and_averages() {
        let mem = InMemoryAggregates::new(vec![
            sub("Praha", "Wolt", 10.0, 30.0, 2_000.0),
            sub("Praha", "Wolt", 20.0, 40.0, 6_000.0),
            sub("Brno", "Wolt", 10.0, 10.0, 1_000.0),
            sub("Praha", "Bolt", 10.0, 20.0, 1_500.0),
        ]);
        let f = AggregateFilter {
            city: Some("Praha".into()),
            platform: Some("Wolt".into()),
        };
        let a = mem.aggregate(&f);
        assert_eq!(a.n, 2);
        assert!(!a.trimmed);
        // hourly 200 and 300
        assert!((a.avg_hourly_rate.unwrap() - 250.0).abs() < 1e-9);
        assert!((a.avg_earnings_week_czk.unwrap() - 4_000.0).abs() < 1e-9);

        let all = mem.aggregate(&AggregateFilter::default());
        assert_eq!(all.n, 4);

        let none = mem.aggregate(&AggregateFilter {
            city: Some("Ostrava".into()),
            platform: None,
        });
        assert_eq!(none.n, 0);
        assert_eq!(none.avg_hourly_rate, None);
    }

    #[test]
    fn large_samples_are_trimmed() {
        let subs = (0..60)
            .map(|i| sub("Praha", "Wolt", 10.0, 20.0, 2_000.0 + i as f64))
            .collect();
        let a = InMemoryAggregates::new(subs).aggregate(&AggregateFilter::default());
        assert_eq!(a.n, 60);
        assert!(a.trimmed);
    }

    #[test]
    fn ranges_group_by_platform() {
        let mem = InMemoryAggregates::new(vec![
            sub("Praha", "Wolt", 10.0, 30.0, 2_000.0),
            sub("Praha", "Wolt", 10.0, 30.0, 3_000.0),
            sub("Brno", "Wolt", 10.0, 30.0, 9_000.0),
            sub("Praha", "Bolt", 10.0, 30.0, 1_800.0),
        ]);
        let r = mem.platform_ranges(Some("Praha"));
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].platform, "Bolt");
        assert_eq!(r[1].platform, "Wolt");
        assert_eq!(r[1].n, 2);
        assert_eq!(r[1].p50_hourly, Some(250.0));
        assert_eq!(mem.platform_ranges(None).len(), 2);
    }

    #[test]
    fn tolerant_row_parsing() {
        let row = json!({
            "n": "42",
            "avg_hourly_rate": 231.5,
            "avg_earnings_per_delivery": "71.25",
            "avg_earnings_week_czk": null,
            "trimmed": true
        });
        let a = aggregate_from_row(&row);
        assert_eq!(a.n, 42);
        assert_eq!(a.avg_hourly_rate, Some(231.5));
        assert_eq!(a.avg_earnings_per_delivery, Some(71.25));
        assert_eq!(a.avg_earnings_week_czk, None);
        assert!(a.trimmed);

        let empty = aggregate_from_row(&json!({}));
        assert_eq!(empty.n, 0);
        assert!(!empty.trimmed);

        let r = range_from_row(&json!({ "platform": "Wolt", "n": 51, "p50_hourly": 240 }));
        assert_eq!(r.platform, "Wolt");
        assert_eq!(r.n, 51);
        assert_eq!(r.p50_hourly, Some(240.0));
        assert_eq!(r.p25_hourly, None);
    }

    #[test]
    fn rows_normalizes_payload() {
        assert!(rows(Value::Null).is_empty());
        assert_eq!(rows(json!({"n": 1})).len(), 1);
        assert_eq!(rows(json!([{"n": 1}, {"n": 2}])).len(), 2);
    }
}
