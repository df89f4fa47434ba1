//! Engine configuration: detection tolerances and approximations

use crate::error::CurveResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tolerances and switches used by the sequential derivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// A month counts as missed when Payment Made vs Due is below -miss_tolerance
    #[serde(default = "default_miss_tolerance")]
    pub miss_tolerance: f64,

    /// Consecutive missed months that trigger a default
    #[serde(default = "default_trigger_months")]
    pub default_trigger_months: u32,

    /// Minimum post-default payment flagged as a recovery
    #[serde(default = "default_recovery_tolerance")]
    pub recovery_tolerance: f64,

    /// Month End Balance below this is treated as paid off
    #[serde(default = "default_paid_off_tolerance")]
    pub paid_off_tolerance: f64,

    /// Fixed month length used by the seasoning approximation
    #[serde(default = "default_days_per_month")]
    pub days_per_month: f64,

    /// Clamp Current Balance at zero
    #[serde(default = "default_true")]
    pub floor_current_balance: bool,
}

fn default_miss_tolerance() -> f64 { 0.0001 }
fn default_trigger_months() -> u32 { 3 }
fn default_recovery_tolerance() -> f64 { 0.001 }
fn default_paid_off_tolerance() -> f64 { 0.00001 }
fn default_days_per_month() -> f64 { 30.0 }
fn default_true() -> bool { true }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            miss_tolerance: 0.0001,
            default_trigger_months: 3,
            recovery_tolerance: 0.001,
            paid_off_tolerance: 0.00001,
            days_per_month: 30.0,
            floor_current_balance: true,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; omitted fields keep their defaults
    pub fn from_json_path(path: &Path) -> CurveResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "default_trigger_months": 4 }"#).unwrap();
        assert_eq!(config.default_trigger_months, 4);
        assert_eq!(config.miss_tolerance, 0.0001);
        assert_eq!(config.days_per_month, 30.0);
        assert!(config.floor_current_balance);
    }

    #[test]
    fn test_empty_json_matches_default() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        let default = EngineConfig::default();
        assert_eq!(config.recovery_tolerance, default.recovery_tolerance);
        assert_eq!(config.paid_off_tolerance, default.paid_off_tolerance);
    }
}
