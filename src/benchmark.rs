//! # Benchmark Comparator
//! Pure combination of the courier's hourly rate with peer aggregates.
//!
//! Policy:
//! - a granularity is *usable* when its sample size `n >= 20`;
//! - sources are tried in `SOURCE_PRIORITY` order (city+platform → platform → global),
//!   the first usable one wins; the last one in the list is kept as a last resort
//!   even when small, and its indicator then reads `insufficient-data`;
//! - the relative difference is `(user - bench) / bench * 100`, undefined for a
//!   zero, non-finite or missing benchmark;
//! - ±5 percentage points separate `above` / `neutral` / `below`.
//!
//! Fetching is somebody else's job (see `crate::aggregates`); nothing here does I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calc::to_fixed;
use crate::onboarding::{onboarding_status, OnboardingStatus, PLATFORMS};

/// Minimum sample size for a point comparison.
pub const MIN_SAMPLE: u32 = 20;
/// Minimum sample size before a p25–p75 band is shown instead of a point.
pub const BAND_MIN_SAMPLE: u32 = 50;
/// Width of the neutral zone, in percentage points.
pub const THRESHOLD_PERCENT: f64 = 5.0;

/// One aggregate row as returned by the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkAggregate {
    pub n: u32,
    #[serde(default)]
    pub avg_hourly_rate: Option<f64>,
    #[serde(default)]
    pub avg_earnings_per_delivery: Option<f64>,
    #[serde(default)]
    pub avg_earnings_week_czk: Option<f64>,
    /// Averages are outlier-trimmed means.
    #[serde(default)]
    pub trimmed: bool,
    /// When the row was fetched, if the source knows. Rows may be stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl BenchmarkAggregate {
    pub fn provenance(&self) -> Provenance {
        if self.trimmed {
            Provenance::Trimmed
        } else {
            Provenance::Untrimmed
        }
    }

    pub fn is_usable(&self) -> bool {
        self.n >= MIN_SAMPLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Trimmed,
    Untrimmed,
}

/// Optional city / platform filter for an aggregate query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateFilter {
    pub city: Option<String>,
    pub platform: Option<String>,
}

/// Aggregate granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkSource {
    CityPlatform,
    Platform,
    Global,
}

/// Most specific first.
pub const SOURCE_PRIORITY: [BenchmarkSource; 3] = [
    BenchmarkSource::CityPlatform,
    BenchmarkSource::Platform,
    BenchmarkSource::Global,
];

impl BenchmarkSource {
    pub fn as_str(self) -> &'static str {
        match self {
            BenchmarkSource::CityPlatform => "city_platform",
            BenchmarkSource::Platform => "platform",
            BenchmarkSource::Global => "global",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BenchmarkSource::CityPlatform => "Město + platforma",
            BenchmarkSource::Platform => "Platforma",
            BenchmarkSource::Global => "Celkem",
        }
    }

    /// Query filter for this granularity. Blank values are treated as absent.
    pub fn filter(self, city: Option<&str>, platform: Option<&str>) -> AggregateFilter {
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match self {
            BenchmarkSource::CityPlatform => AggregateFilter {
                city: clean(city),
                platform: clean(platform),
            },
            BenchmarkSource::Platform => AggregateFilter {
                city: None,
                platform: clean(platform),
            },
            BenchmarkSource::Global => AggregateFilter::default(),
        }
    }
}

/// Result of querying one granularity; `None` means absent or failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: BenchmarkSource,
    pub aggregate: Option<BenchmarkAggregate>,
}

/// What the caller needs to apply its own sample-size gates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSummary {
    pub source: BenchmarkSource,
    /// `None` when nothing came back for this granularity.
    pub n: Option<u32>,
    pub usable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedBenchmark {
    pub source: BenchmarkSource,
    pub label: &'static str,
    pub n: u32,
    pub provenance: Provenance,
    pub aggregate: BenchmarkAggregate,
}

/// Qualitative standing against the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Indicator {
    Above,
    Below,
    Neutral,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyComparison {
    pub user_hourly: f64,
    pub benchmark_hourly: Option<f64>,
    pub pct_diff: Option<f64>,
    pub indicator: Indicator,
    /// Short Czech summary, e.g. "+20 % nad průměrem".
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkComparison {
    pub available: bool,
    pub selected: Option<SelectedBenchmark>,
    pub candidates: Vec<CandidateSummary>,
    pub hourly: HourlyComparison,
}

/// `((user - benchmark) / benchmark) * 100`, or `None` for a zero,
/// non-finite or missing benchmark.
pub fn pct_diff(user: f64, benchmark: Option<f64>) -> Option<f64> {
    let b = benchmark?;
    if b == 0.0 || !b.is_finite() {
        return None;
    }
    Some(((user - b) / b) * 100.0)
}

/// Four-state indicator; small samples always read `InsufficientData`.
pub fn indicator(user: f64, benchmark: Option<f64>, n: u32) -> Indicator {
    if n < MIN_SAMPLE {
        return Indicator::InsufficientData;
    }
    match pct_diff(user, benchmark) {
        None => Indicator::InsufficientData,
        Some(p) if p >= THRESHOLD_PERCENT => Indicator::Above,
        Some(p) if p <= -THRESHOLD_PERCENT => Indicator::Below,
        Some(_) => Indicator::Neutral,
    }
}

/// "+20 % nad průměrem" / "-7 % pod průměrem" / "Na úrovni průměru" / "—".
pub fn diff_label(pct: Option<f64>) -> String {
    match pct {
        None => "—".to_string(),
        Some(p) if p > 0.0 => format!("+{} % nad průměrem", to_fixed(p, 0)),
        Some(p) if p < 0.0 => format!("{} % pod průměrem", to_fixed(p, 0)),
        Some(_) => "Na úrovni průměru".to_string(),
    }
}

/// Walk candidates in their given order and pick the first usable one,
/// falling back to the last candidate when nothing is big enough.
pub fn select_benchmark(candidates: &[Candidate]) -> Option<SelectedBenchmark> {
    let usable = candidates
        .iter()
        .find(|c| c.aggregate.as_ref().is_some_and(BenchmarkAggregate::is_usable));
    let chosen = usable.or_else(|| candidates.last().filter(|c| c.aggregate.is_some()))?;
    let aggregate = chosen.aggregate.clone()?;
    Some(SelectedBenchmark {
        source: chosen.source,
        label: chosen.source.label(),
        n: aggregate.n,
        provenance: aggregate.provenance(),
        aggregate,
    })
}

pub fn summarize(candidates: &[Candidate]) -> Vec<CandidateSummary> {
    candidates
        .iter()
        .map(|c| CandidateSummary {
            source: c.source,
            n: c.aggregate.as_ref().map(|a| a.n),
            usable: c.aggregate.as_ref().is_some_and(BenchmarkAggregate::is_usable),
        })
        .collect()
}

pub fn compare_hourly(user_hourly: f64, candidates: &[Candidate]) -> BenchmarkComparison {
    let selected = select_benchmark(candidates);
    let (bench, n) = selected
        .as_ref()
        .map(|s| (s.aggregate.avg_hourly_rate, s.n))
        .unwrap_or((None, 0));
    let pct = pct_diff(user_hourly, bench);

    BenchmarkComparison {
        available: selected.is_some(),
        candidates: summarize(candidates),
        hourly: HourlyComparison {
            user_hourly,
            benchmark_hourly: bench,
            pct_diff: pct,
            indicator: indicator(user_hourly, bench, n),
            label: diff_label(pct),
        },
        selected,
    }
}

/// Comparison used when the query backend is not configured at all.
pub fn unavailable(user_hourly: f64) -> BenchmarkComparison {
    compare_hourly(user_hourly, &[])
}

/* ----------------------------
Per-platform hourly ranges
---------------------------- */

/// Hourly-rate quartiles for one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformRange {
    pub platform: String,
    pub n: u32,
    #[serde(default)]
    pub p25_hourly: Option<f64>,
    #[serde(default)]
    pub p50_hourly: Option<f64>,
    #[serde(default)]
    pub p75_hourly: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileBand {
    pub p25: f64,
    pub p75: f64,
}

/// Point estimate and (when present) band for one platform, plus the gates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEstimate {
    pub n: u32,
    /// Median, else the midpoint of the quartiles.
    pub point: Option<f64>,
    pub band: Option<PercentileBand>,
    /// `n >= 50` and both quartiles known.
    pub show_band: bool,
    /// `n < 20`.
    pub low_confidence: bool,
}

pub fn platform_estimate(range: Option<&PlatformRange>) -> PlatformEstimate {
    let n = range.map(|r| r.n).unwrap_or(0);
    let (p25, p50, p75) = range
        .map(|r| (r.p25_hourly, r.p50_hourly, r.p75_hourly))
        .unwrap_or((None, None, None));

    let band = match (p25, p75) {
        (Some(p25), Some(p75)) => Some(PercentileBand { p25, p75 }),
        _ => None,
    };
    let point = p50.or_else(|| band.map(|b| (b.p25 + b.p75) / 2.0));

    PlatformEstimate {
        n,
        point,
        band,
        show_band: n >= BAND_MIN_SAMPLE && band.is_some(),
        low_confidence: n < MIN_SAMPLE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformScenario {
    pub platform: String,
    pub estimate: PlatformEstimate,
    pub indicator: Indicator,
    pub onboarding: OnboardingStatus,
}

/// One card per known platform, in `PLATFORMS` order.
pub fn platform_scenarios(
    user_hourly: f64,
    ranges: &[PlatformRange],
    city: Option<&str>,
) -> Vec<PlatformScenario> {
    PLATFORMS
        .iter()
        .map(|&platform| {
            let range = ranges.iter().find(|r| r.platform == platform);
            let estimate = platform_estimate(range);
            PlatformScenario {
                platform: platform.to_string(),
                indicator: indicator(user_hourly, estimate.point, estimate.n),
                onboarding: onboarding_status(city, Some(platform)),
                estimate,
            }
        })
        .collect()
}
