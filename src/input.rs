//! Validace vstupů z kalkulačky a z odkazu na výsledek.
//!
//! The engine itself never rejects input; this module is the gate in front of
//! it. Form errors are reported per field, in Czech, keyed by the camelCase
//! field name the client sent.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::calc::CalculationInputs;
use crate::onboarding::OTHER;

pub const UNKNOWN_CITY: &str = "Neznámé";
pub const UNKNOWN_PLATFORM: &str = "Neznámá";

/// Field name → message.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid form ({} field errors)", .0.len())]
    Form(FieldErrors),
    #[error("neplatné parametry výpočtu")]
    InvalidResult,
}

impl InputError {
    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            InputError::Form(f) => Some(f),
            InputError::InvalidResult => None,
        }
    }
}

/// Raw calculator form. Numbers may arrive as JSON numbers or strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculatorForm {
    pub city: String,
    pub city_other: Option<String>,
    pub platform: String,
    pub platform_other: Option<String>,
    pub hours_per_week: Option<Value>,
    pub deliveries_per_week: Option<Value>,
    pub earnings_per_week: Option<Value>,
    #[serde(default = "default_contribute")]
    pub contribute_to_benchmark: bool,
}

fn default_contribute() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedForm {
    /// Resolved city (free text when `Jiné` was picked).
    pub city: String,
    pub platform: String,
    pub inputs: CalculationInputs,
    pub contribute_to_benchmark: bool,
}

struct NumberMessages {
    not_a_number: &'static str,
    not_positive: &'static str,
}

const HOURS: NumberMessages = NumberMessages {
    not_a_number: "Hodiny musí být číslo",
    not_positive: "Hodiny musí být větší než 0",
};
const DELIVERIES: NumberMessages = NumberMessages {
    not_a_number: "Počet doručení musí být číslo",
    not_positive: "Počet doručení musí být větší než 0",
};
const EARNINGS: NumberMessages = NumberMessages {
    not_a_number: "Výdělek musí být číslo",
    not_positive: "Výdělek musí být větší než 0",
};

fn positive_number(
    v: Option<&Value>,
    field: &'static str,
    msgs: &NumberMessages,
    errors: &mut FieldErrors,
) -> f64 {
    let parsed = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|x| x.is_finite());

    match parsed {
        None => {
            errors.insert(field, msgs.not_a_number);
            0.0
        }
        Some(x) if x <= 0.0 => {
            errors.insert(field, msgs.not_positive);
            0.0
        }
        Some(x) => x,
    }
}

/// Picked value, or the free-text one when the placeholder was picked.
fn choice(
    picked: &str,
    other: Option<&str>,
    field: &'static str,
    required: &'static str,
    other_field: &'static str,
    other_required: &'static str,
    errors: &mut FieldErrors,
) -> String {
    let picked = picked.trim();
    if picked.is_empty() {
        errors.insert(field, required);
        return String::new();
    }
    if picked != OTHER {
        return picked.to_string();
    }
    match other.map(str::trim).filter(|s| !s.is_empty()) {
        Some(o) => o.to_string(),
        None => {
            errors.insert(other_field, other_required);
            String::new()
        }
    }
}

impl CalculatorForm {
    /// All field errors at once, or the cleaned form.
    pub fn validate(&self) -> Result<ValidatedForm, InputError> {
        let mut errors = FieldErrors::new();

        let city = choice(
            &self.city,
            self.city_other.as_deref(),
            "city",
            "Město je povinné",
            "cityOther",
            "Zadejte název města",
            &mut errors,
        );
        let platform = choice(
            &self.platform,
            self.platform_other.as_deref(),
            "platform",
            "Platforma je povinná",
            "platformOther",
            "Zadejte název platformy",
            &mut errors,
        );
        let hours = positive_number(self.hours_per_week.as_ref(), "hoursPerWeek", &HOURS, &mut errors);
        let deliveries = positive_number(
            self.deliveries_per_week.as_ref(),
            "deliveriesPerWeek",
            &DELIVERIES,
            &mut errors,
        );
        let earnings = positive_number(
            self.earnings_per_week.as_ref(),
            "earningsPerWeek",
            &EARNINGS,
            &mut errors,
        );

        if !errors.is_empty() {
            return Err(InputError::Form(errors));
        }
        Ok(ValidatedForm {
            city,
            platform,
            inputs: CalculationInputs {
                hours_per_week: hours,
                deliveries_per_week: deliveries,
                earnings_per_week: earnings,
            },
            contribute_to_benchmark: self.contribute_to_benchmark,
        })
    }
}

/* ----------------------------
Result link (?h=&d=&e=&c=&p=)
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultQuery {
    pub h: Option<String>,
    pub d: Option<String>,
    pub e: Option<String>,
    pub c: Option<String>,
    pub p: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultParams {
    pub inputs: CalculationInputs,
    pub city: String,
    pub platform: String,
}

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid float regex")
});

/// Leading numeric prefix, like a lenient `parseFloat`: `"12.5h"` → 12.5.
/// Missing or garbage → 0.
pub fn lenient_float(s: Option<&str>) -> f64 {
    let Some(s) = s else { return 0.0 };
    LEADING_FLOAT
        .find(s.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|x| x.is_finite())
        .unwrap_or(0.0)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

impl ResultQuery {
    pub fn resolve(&self) -> Result<ResultParams, InputError> {
        let inputs = CalculationInputs {
            hours_per_week: lenient_float(self.h.as_deref()),
            deliveries_per_week: lenient_float(self.d.as_deref()),
            earnings_per_week: lenient_float(self.e.as_deref()),
        };
        let valid = inputs.hours_per_week > 0.0
            && inputs.deliveries_per_week > 0.0
            && inputs.earnings_per_week > 0.0;
        if !valid {
            return Err(InputError::InvalidResult);
        }
        Ok(ResultParams {
            inputs,
            city: non_empty(self.c.as_deref()).unwrap_or(UNKNOWN_CITY).to_string(),
            platform: non_empty(self.p.as_deref())
                .unwrap_or(UNKNOWN_PLATFORM)
                .to_string(),
        })
    }
}
