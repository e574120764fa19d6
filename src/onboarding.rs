//! Orientační stav náboru podle města a platformy.
//!
//! Static placeholder data: only Praha has a per-platform map, every other
//! city resolves to `Neznámé`. Shown next to platform scenarios.

use serde::{Deserialize, Serialize};

/// Platforms offered in the calculator, in display order.
pub const PLATFORMS: [&str; 7] = [
    "Wolt",
    "Bolt",
    "Foodora",
    "Rohlík",
    "Košík",
    "DPD",
    "Zásilkovna",
];

/// Cities offered in the calculator. `OTHER` unlocks a free-text field.
pub const CITIES: [&str; 5] = ["Praha", "Brno", "Ostrava", "Plzeň", "Olomouc"];

/// Placeholder option meaning "type your own".
pub const OTHER: &str = "Jiné";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnboardingStatus {
    #[serde(rename = "Nabírá")]
    Hiring,
    #[serde(rename = "Omezeně")]
    Limited,
    #[serde(rename = "Pozastaveno")]
    Paused,
    #[serde(rename = "Waitlist")]
    Waitlist,
    #[serde(rename = "Neznámé")]
    Unknown,
}

/// Choices for the calculator form, each list ending with `OTHER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormOptions {
    pub cities: Vec<&'static str>,
    pub platforms: Vec<&'static str>,
}

pub fn form_options() -> FormOptions {
    let with_other = |items: &[&'static str]| -> Vec<&'static str> {
        items.iter().copied().chain(std::iter::once(OTHER)).collect()
    };
    FormOptions {
        cities: with_other(&CITIES),
        platforms: with_other(&PLATFORMS),
    }
}

fn praha(platform: &str) -> OnboardingStatus {
    match platform {
        "Wolt" | "Foodora" | "Rohlík" | "DPD" => OnboardingStatus::Hiring,
        "Bolt" | "Zásilkovna" => OnboardingStatus::Limited,
        "Košík" => OnboardingStatus::Waitlist,
        _ => OnboardingStatus::Unknown,
    }
}

/// Status for a city/platform pair. Missing or unknown keys → `Unknown`.
pub fn onboarding_status(city: Option<&str>, platform: Option<&str>) -> OnboardingStatus {
    let (Some(city), Some(platform)) = (city, platform) else {
        return OnboardingStatus::Unknown;
    };
    let (city, platform) = (city.trim(), platform.trim());
    if city.is_empty() || platform.is_empty() {
        return OnboardingStatus::Unknown;
    }
    match city {
        "Praha" => praha(platform),
        _ => OnboardingStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn praha_map() {
        assert_eq!(onboarding_status(Some("Praha"), Some("Wolt")), OnboardingStatus::Hiring);
        assert_eq!(onboarding_status(Some(" Praha "), Some("Bolt ")), OnboardingStatus::Limited);
        assert_eq!(onboarding_status(Some("Praha"), Some("Košík")), OnboardingStatus::Waitlist);
        assert_eq!(onboarding_status(Some("Praha"), Some("Uber")), OnboardingStatus::Unknown);
    }

    #[test]
    fn other_cities_and_missing_keys_are_unknown() {
        assert_eq!(onboarding_status(Some("Brno"), Some("Wolt")), OnboardingStatus::Unknown);
        assert_eq!(onboarding_status(None, Some("Wolt")), OnboardingStatus::Unknown);
        assert_eq!(onboarding_status(Some("Praha"), None), OnboardingStatus::Unknown);
        assert_eq!(onboarding_status(Some(""), Some("Wolt")), OnboardingStatus::Unknown);
    }

    #[test]
    fn serializes_czech_labels() {
        let v = serde_json::to_value(OnboardingStatus::Hiring).unwrap();
        assert_eq!(v, serde_json::json!("Nabírá"));
        let v = serde_json::to_value(OnboardingStatus::Paused).unwrap();
        assert_eq!(v, serde_json::json!("Pozastaveno"));
    }

    #[test]
    fn form_options_end_with_other() {
        let o = form_options();
        assert_eq!(o.cities.len(), CITIES.len() + 1);
        assert_eq!(o.cities.first(), Some(&"Praha"));
        assert_eq!(o.cities.last(), Some(&OTHER));
        assert_eq!(o.platforms.len(), PLATFORMS.len() + 1);
        assert_eq!(o.platforms.last(), Some(&OTHER));
    }
}
