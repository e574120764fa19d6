// src/devlog.rs
//! Anonymized dev logging. Never logs raw figures, only a short hash.

use tracing::info;

use crate::calc::CalculationInputs;

pub const ENV_DEV_LOG: &str = "APP_DEV_LOG";

/// Debug build, or SHUTTLE_ENV in {local, development, dev}.
pub fn is_dev_env() -> bool {
    cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        )
}

// Dev logging gate: APP_DEV_LOG=1 AND dev env
pub fn dev_logging_enabled() -> bool {
    std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1") && is_dev_env()
}

/// First 6 bytes of SHA-256, hex.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Stable id for one set of inputs.
pub fn calc_id(inputs: &CalculationInputs) -> String {
    anon_hash(&format!(
        "{}|{}|{}",
        inputs.hours_per_week, inputs.deliveries_per_week, inputs.earnings_per_week
    ))
}

pub fn dev_log_calculation(event: &str, inputs: &CalculationInputs, score: u8) {
    if !dev_logging_enabled() {
        return;
    }
    let id = calc_id(inputs);
    info!(target: "courier", %id, score, event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_short_hex_and_stable() {
        let a = anon_hash("30|90|7500");
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, anon_hash("30|90|7500"));
        assert_ne!(a, anon_hash("30|90|7501"));
    }

    #[test]
    fn calc_id_does_not_leak_figures() {
        let id = calc_id(&CalculationInputs {
            hours_per_week: 30.0,
            deliveries_per_week: 90.0,
            earnings_per_week: 7_500.0,
        });
        assert!(!id.contains("7500"));
    }
}
