//! Explainable efficiency score 0–100.
//!
//! Each metric is divided by its reference target and capped at 1.0
//! (no bonus for exceeding the target), then combined with fixed weights:
//! - hodinová sazba (hourly rate)        : 50 %
//! - doručení/hod (deliveries per hour)  : 30 %
//! - výdělek/doručení (per delivery)     : 20 %
//!
//! Rounding: `f64::round`, i.e. half away from zero. For the non-negative
//! inputs this module accepts that is the same as round-half-up.

use serde::Serialize;

use crate::calc::CalculationResults;

/// Score at or above which the score is shown as above average.
pub const SCORE_ABOVE: u8 = 60;
/// Score below which the score is shown as below average.
pub const SCORE_BELOW: u8 = 40;

/// Reference values where each component saturates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyTargets {
    pub hourly: f64,
    pub deliveries_per_hour: f64,
    pub earnings_per_delivery: f64,
}

pub const TARGETS: EfficiencyTargets = EfficiencyTargets {
    hourly: 250.0,
    deliveries_per_hour: 4.0,
    earnings_per_delivery: 80.0,
};

/// Component weights; they sum to 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub hourly: f64,
    pub deliveries_per_hour: f64,
    pub earnings_per_delivery: f64,
}

pub const WEIGHTS: ScoreWeights = ScoreWeights {
    hourly: 0.5,
    deliveries_per_hour: 0.3,
    earnings_per_delivery: 0.2,
};

/// Per-component view of the score, for display next to the number.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub hourly_ratio: f64,
    pub deliveries_per_hour_ratio: f64,
    pub earnings_per_delivery_ratio: f64,
    pub weights: ScoreWeights,
    pub targets: EfficiencyTargets,
    pub score: u8,
    pub band: ScoreBand,
}

/// Coarse colouring of the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Above,
    Neutral,
    Below,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        if score >= SCORE_ABOVE {
            Self::Above
        } else if score < SCORE_BELOW {
            Self::Below
        } else {
            Self::Neutral
        }
    }
}

#[inline]
fn capped_ratio(value: f64, target: f64) -> f64 {
    (value / target).min(1.0)
}

/// Weighted, capped composite in `[0, 100]` for non-negative inputs.
///
/// Non-finite inputs are out of contract; a `NaN` component collapses to 0
/// through the final saturating cast rather than panicking.
pub fn efficiency_score(
    hourly_rate: f64,
    deliveries_per_hour: f64,
    earnings_per_delivery: f64,
) -> u8 {
    let h = capped_ratio(hourly_rate, TARGETS.hourly);
    let d = capped_ratio(deliveries_per_hour, TARGETS.deliveries_per_hour);
    let e = capped_ratio(earnings_per_delivery, TARGETS.earnings_per_delivery);

    let raw = h * WEIGHTS.hourly + d * WEIGHTS.deliveries_per_hour + e * WEIGHTS.earnings_per_delivery;
    (raw * 100.0).round() as u8
}

/// Score straight from calculator output.
pub fn score_results(results: &CalculationResults) -> u8 {
    efficiency_score(
        results.hourly_rate,
        results.deliveries_per_hour,
        results.earnings_per_delivery,
    )
}

pub fn score_breakdown(results: &CalculationResults) -> ScoreBreakdown {
    let score = score_results(results);
    ScoreBreakdown {
        hourly_ratio: capped_ratio(results.hourly_rate, TARGETS.hourly),
        deliveries_per_hour_ratio: capped_ratio(
            results.deliveries_per_hour,
            TARGETS.deliveries_per_hour,
        ),
        earnings_per_delivery_ratio: capped_ratio(
            results.earnings_per_delivery,
            TARGETS.earnings_per_delivery,
        ),
        weights: WEIGHTS,
        targets: TARGETS,
        score,
        band: ScoreBand::from_score(score),
    }
}
