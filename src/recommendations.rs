//! Rules-based recommendations (Czech copy), exactly one per metric dimension.
//!
//! Every dimension owns a `TierRule` (where the low/high cut-offs sit and
//! which side is inclusive) and three `TierTemplate`s. Evaluation walks the
//! fixed `DIMENSIONS` table in order, so the output is always
//! `[deliveries/hour, hourly rate, earnings/delivery]`.
//!
//! Table (mid tier is whatever remains):
//!
//! | dimension            | low      | high     |
//! |----------------------|----------|----------|
//! | deliveries_per_hour  | `< 2`    | `> 4`    |
//! | hourly_rate          | `< 200`  | `>= 250` |
//! | earnings_per_delivery| `< 50`   | `>= 80`  |

use serde::{Deserialize, Serialize};

use crate::calc::{to_fixed, CalculationResults};

/// One human-readable suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub dimension: Dimension,
    pub tier: Tier,
    pub title: String,
    pub description: String,
    /// Explains the choice using the courier's own (formatted) value.
    pub reason: String,
    /// Suggested improvement range, e.g. "+20 až +50 Kč/hod", or a "keep it" phrase.
    pub target_delta: String,
}

/// The three metrics recommendations are based on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationInputs {
    pub deliveries_per_hour: f64,
    pub hourly_rate: f64,
    pub earnings_per_delivery: f64,
}

impl From<&CalculationResults> for RecommendationInputs {
    fn from(r: &CalculationResults) -> Self {
        Self {
            deliveries_per_hour: r.deliveries_per_hour,
            hourly_rate: r.hourly_rate,
            earnings_per_delivery: r.earnings_per_delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    DeliveriesPerHour,
    HourlyRate,
    EarningsPerDelivery,
}

impl Dimension {
    fn value(self, inputs: &RecommendationInputs) -> f64 {
        match self {
            Dimension::DeliveriesPerHour => inputs.deliveries_per_hour,
            Dimension::HourlyRate => inputs.hourly_rate,
            Dimension::EarningsPerDelivery => inputs.earnings_per_delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    BelowAverage,
    Average,
    AboveAverage,
}

/// Where the tiers of one dimension split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRule {
    /// Values strictly below this are `BelowAverage`.
    pub low_below: f64,
    /// Lower edge of `AboveAverage`.
    pub high_from: f64,
    /// `true`: `>= high_from`; `false`: `> high_from`.
    pub high_inclusive: bool,
}

impl TierRule {
    pub fn tier(&self, value: f64) -> Tier {
        if value < self.low_below {
            return Tier::BelowAverage;
        }
        let high = if self.high_inclusive {
            value >= self.high_from
        } else {
            value > self.high_from
        };
        if high {
            Tier::AboveAverage
        } else {
            Tier::Average
        }
    }
}

/// How the metric is printed inside `reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// One decimal place, ties up, e.g. `2.25` → `2.3`.
    OneDecimal,
    /// Rounded to a whole number, e.g. `180`.
    Whole,
}

impl ValueFormat {
    pub fn render(self, value: f64) -> String {
        match self {
            ValueFormat::OneDecimal => to_fixed(value, 1),
            ValueFormat::Whole => format!("{}", value.round() as i64),
        }
    }
}

/// Copy for one tier. `reason` contains a `{value}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub reason: &'static str,
    pub target_delta: &'static str,
}

impl TierTemplate {
    fn render(&self, dimension: Dimension, tier: Tier, value: &str) -> Recommendation {
        Recommendation {
            dimension,
            tier,
            title: self.title.to_string(),
            description: self.description.to_string(),
            reason: self.reason.replace("{value}", value),
            target_delta: self.target_delta.to_string(),
        }
    }
}

/// Rule + templates for one dimension.
#[derive(Debug, Clone, Copy)]
pub struct DimensionRules {
    pub dimension: Dimension,
    pub rule: TierRule,
    pub format: ValueFormat,
    pub below: TierTemplate,
    pub average: TierTemplate,
    pub above: TierTemplate,
}

impl DimensionRules {
    pub fn template(&self, tier: Tier) -> &TierTemplate {
        match tier {
            Tier::BelowAverage => &self.below,
            Tier::Average => &self.average,
            Tier::AboveAverage => &self.above,
        }
    }

    pub fn evaluate(&self, inputs: &RecommendationInputs) -> Recommendation {
        let value = self.dimension.value(inputs);
        let tier = self.rule.tier(value);
        self.template(tier)
            .render(self.dimension, tier, &self.format.render(value))
    }
}

/// Ordered table; order here is the output order.
pub static DIMENSIONS: [DimensionRules; 3] = [
    DimensionRules {
        dimension: Dimension::DeliveriesPerHour,
        rule: TierRule {
            low_below: 2.0,
            high_from: 4.0,
            high_inclusive: false,
        },
        format: ValueFormat::OneDecimal,
        below: TierTemplate {
            title: "Zvyšte počet doručení za hodinu",
            description: "Aktuálně doručujete méně než 2 zásilky za hodinu. Zaměřte se na efektivnější trasování a plánování.",
            reason: "Doručujete {value} zásilek za hodinu, což je pod průměrem.",
            target_delta: "+0.5 až +1 doručení/h",
        },
        average: TierTemplate {
            title: "Optimalizujte trasování",
            description: "Vaše tempo doručení je solidní. Zvažte skupinování objednávek ve stejné oblasti pro vyšší efektivitu.",
            reason: "Doručujete {value} zásilek za hodinu, což je průměrné.",
            target_delta: "+0.3 až +0.5 doručení/h",
        },
        above: TierTemplate {
            title: "Výborné tempo doručení",
            description: "Doručujete více než 4 zásilky za hodinu, což je nadprůměrné. Pokračujte v tomto tempu.",
            reason: "Doručujete {value} zásilek za hodinu, což je výborný výkon.",
            target_delta: "udržet tempo",
        },
    },
    DimensionRules {
        dimension: Dimension::HourlyRate,
        rule: TierRule {
            low_below: 200.0,
            high_from: 250.0,
            high_inclusive: true,
        },
        format: ValueFormat::Whole,
        below: TierTemplate {
            title: "Zvažte změnu platformy nebo oblasti",
            description: "Vaše hodinová sazba je pod 200 Kč/hod. Zkuste porovnat nabídky jiných platforem nebo pracovat v lépe placených oblastech.",
            reason: "Vaše hodinová sazba {value} Kč/hod je pod doporučenou úrovní.",
            target_delta: "+20 až +50 Kč/hod",
        },
        average: TierTemplate {
            title: "Zaměřte se na špičkové hodiny",
            description: "Vaše hodinová sazba je solidní. Zvažte práci během špičkových hodin (obědy, večeře) pro vyšší výdělky.",
            reason: "Vaše hodinová sazba {value} Kč/hod je průměrná.",
            target_delta: "+10 až +30 Kč/hod",
        },
        above: TierTemplate {
            title: "Výborná hodinová sazba",
            description: "Vaše hodinová sazba je nad 250 Kč/hod, což je velmi dobrý výkon. Pokračujte v současném přístupu.",
            reason: "Vaše hodinová sazba {value} Kč/hod je nadprůměrná.",
            target_delta: "udržet úroveň",
        },
    },
    DimensionRules {
        dimension: Dimension::EarningsPerDelivery,
        rule: TierRule {
            low_below: 50.0,
            high_from: 80.0,
            high_inclusive: true,
        },
        format: ValueFormat::Whole,
        below: TierTemplate {
            title: "Hledejte lépe placené objednávky",
            description: "Průměrný výdělek na doručení je pod 50 Kč. Zvažte zaměření na delší trasy nebo objednávky s vyšším spropitným.",
            reason: "Průměrně vyděláváte {value} Kč na doručení, což je pod průměrem.",
            target_delta: "+10 až +20 Kč/doručení",
        },
        average: TierTemplate {
            title: "Balancujte počet a hodnotu doručení",
            description: "Váš průměrný výdělek na doručení je solidní. Zvažte kombinaci rychlých a hodnotnějších objednávek.",
            reason: "Průměrně vyděláváte {value} Kč na doručení, což je průměrné.",
            target_delta: "+5 až +15 Kč/doručení",
        },
        above: TierTemplate {
            title: "Výborný výdělek na doručení",
            description: "Průměrně vyděláváte více než 80 Kč na doručení, což je skvělé. Pokračujte v zaměřování se na kvalitní objednávky.",
            reason: "Průměrně vyděláváte {value} Kč na doručení, což je nadprůměrné.",
            target_delta: "udržet úroveň",
        },
    },
];

/// Always exactly three recommendations, in `DIMENSIONS` order.
pub fn generate_recommendations(inputs: &RecommendationInputs) -> Vec<Recommendation> {
    DIMENSIONS.iter().map(|d| d.evaluate(inputs)).collect()
}

/// Look up the rules of one dimension.
pub fn rules_for(dimension: Dimension) -> &'static DimensionRules {
    match dimension {
        Dimension::DeliveriesPerHour => &DIMENSIONS[0],
        Dimension::HourlyRate => &DIMENSIONS[1],
        Dimension::EarningsPerDelivery => &DIMENSIONS[2],
    }
}
