//! # Metrics Calculator
//! Pure functions mapping weekly courier figures to derived rates.
//! No I/O, no panics: a non-positive denominator yields `0.0` instead of an error.

use serde::{Deserialize, Serialize};

/// Average number of weeks in a month (52 / 12, rounded).
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Raw weekly figures entered by the courier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInputs {
    pub hours_per_week: f64,
    pub deliveries_per_week: f64,
    pub earnings_per_week: f64,
}

/// Derived metrics. All values are non-negative for non-negative inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResults {
    pub hourly_rate: f64,
    pub earnings_per_delivery: f64,
    pub monthly_estimate: f64,
    pub deliveries_per_hour: f64,
    /// Passthrough of `earnings_per_week`.
    pub weekly_earnings: f64,
}

/// Earnings divided by hours; `0.0` when `hours <= 0`.
pub fn hourly_rate(earnings_per_week: f64, hours_per_week: f64) -> f64 {
    if hours_per_week <= 0.0 {
        return 0.0;
    }
    earnings_per_week / hours_per_week
}

/// Earnings divided by deliveries; `0.0` when `deliveries <= 0`.
pub fn earnings_per_delivery(earnings_per_week: f64, deliveries_per_week: f64) -> f64 {
    if deliveries_per_week <= 0.0 {
        return 0.0;
    }
    earnings_per_week / deliveries_per_week
}

/// Deliveries divided by hours; `0.0` when `hours <= 0`.
pub fn deliveries_per_hour(deliveries_per_week: f64, hours_per_week: f64) -> f64 {
    if hours_per_week <= 0.0 {
        return 0.0;
    }
    deliveries_per_week / hours_per_week
}

/// Weekly earnings × 4.33. Not guarded: negative in, negative out.
pub fn monthly_estimate(earnings_per_week: f64) -> f64 {
    earnings_per_week * WEEKS_PER_MONTH
}

/// Run every metric over one set of inputs.
pub fn calculate_all(inputs: &CalculationInputs) -> CalculationResults {
    CalculationResults {
        hourly_rate: hourly_rate(inputs.earnings_per_week, inputs.hours_per_week),
        earnings_per_delivery: earnings_per_delivery(
            inputs.earnings_per_week,
            inputs.deliveries_per_week,
        ),
        monthly_estimate: monthly_estimate(inputs.earnings_per_week),
        deliveries_per_hour: deliveries_per_hour(inputs.deliveries_per_week, inputs.hours_per_week),
        weekly_earnings: inputs.earnings_per_week,
    }
}

/// Digits printed past the requested precision when looking for an exact tie.
const TIE_CHECK_DIGITS: usize = 24;

/// `value` with `digits` decimals; an exact binary tie rounds away from zero
/// (`2.25` → `"2.3"`, `12.5` → `"13"`), everything else to nearest.
///
/// `{:.N}` alone rounds exact ties to even. Values that only *look* like ties
/// (`0.15` is stored as `0.1499…`) keep rounding down.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    // A tie is dyadic, so its exact expansion ends right after the `5`;
    // the nearest non-tie double differs well before TIE_CHECK_DIGITS.
    let exact = format!("{:.*}", digits + TIE_CHECK_DIGITS, value.abs());
    let (head, tail) = exact.split_at(exact.len() - TIE_CHECK_DIGITS);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if !is_tie {
        return format!("{:.*}", digits, value);
    }

    let bumped = increment_last_digit(head.trim_end_matches('.'));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{bumped}")
}

/// Decimal string + one unit in the last place, with carry.
fn increment_last_digit(s: &str) -> String {
    let mut bytes = s.as_bytes().to_vec();
    for b in bytes.iter_mut().rev() {
        match *b {
            b'.' => continue,
            b'9' => *b = b'0',
            _ => {
                *b += 1;
                return String::from_utf8_lossy(&bytes).into_owned();
            }
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}

/// Format an amount as whole Czech crowns, e.g. `12 345 Kč`.
///
/// Rounds half away from zero and groups thousands with a no-break space
/// (U+00A0), the same separator used between the number and `Kč`.
pub fn format_czk(amount: f64) -> String {
    if !amount.is_finite() {
        return "—".to_string();
    }
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 2 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}\u{a0}Kč")
}
