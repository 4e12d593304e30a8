//! Analytics configuration
//!
//! Every threshold the engines use lives here. The JS host passes a partial
//! object; missing keys fall back to the defaults below.
//!
//! ```json
//! {
//!   "monteCarlo": { "iterations": 5000, "seed": 7 },
//!   "health": { "scheduleVarianceDays": 5 },
//!   "evm": { "spiWarning": 0.95 }
//! }
//! ```

use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsConfig {
    pub monte_carlo: MonteCarloConfig,
    pub health: HealthThresholds,
    pub evm: EvmThresholds,
    pub resources: ResourceConfig,
}

/// Triangular duration sampling: min = optimistic x duration,
/// mode = duration, max = pessimistic x duration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub optimistic_factor: f64,
    pub pessimistic_factor: f64,
    pub percentiles: Vec<f64>,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            optimistic_factor: 0.8,
            pessimistic_factor: 1.5,
            percentiles: vec![0.10, 0.25, 0.50, 0.75, 0.90],
            seed: None,
        }
    }
}

/// Baseline health classification thresholds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthThresholds {
    /// Schedule variances larger than this (days, absolute) count as significant
    pub schedule_variance_days: i64,
    /// Cost variances larger than this (absolute) count as significant
    pub cost_variance_amount: f64,
    /// More significant schedule variances than this turns health red
    pub red_schedule_count: usize,
    pub red_cost_count: usize,
    pub red_scope_change_count: usize,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            schedule_variance_days: 7,
            cost_variance_amount: 5000.0,
            red_schedule_count: 2,
            red_cost_count: 2,
            red_scope_change_count: 5,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EvmThresholds {
    pub spi_warning: f64,
    pub cpi_warning: f64,
    pub tcpi_warning: f64,
    /// EV is assumed to have been earned over this many days
    pub earn_rate_period_days: f64,
}

impl Default for EvmThresholds {
    fn default() -> Self {
        Self {
            spi_warning: 0.9,
            cpi_warning: 0.9,
            tcpi_warning: 1.1,
            earn_rate_period_days: 30.0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceConfig {
    /// Daily utilization percent above which a resource is overallocated
    pub overallocation_threshold: f64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            overallocation_threshold: 100.0,
        }
    }
}

impl AnalyticsConfig {
    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mc = &self.monte_carlo;
        if mc.iterations == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "monteCarlo.iterations must be at least 1".to_string(),
            ));
        }
        if !(mc.optimistic_factor > 0.0 && mc.optimistic_factor <= 1.0) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "monteCarlo.optimisticFactor must be in (0, 1], got {}",
                mc.optimistic_factor
            )));
        }
        if mc.pessimistic_factor < 1.0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "monteCarlo.pessimisticFactor must be >= 1, got {}",
                mc.pessimistic_factor
            )));
        }
        if let Some(p) = mc.percentiles.iter().find(|p| !(0.0..1.0).contains(*p)) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "monteCarlo.percentiles must be in [0, 1), got {p}"
            )));
        }
        if self.evm.earn_rate_period_days <= 0.0 {
            return Err(AnalyticsError::InvalidConfig(
                "evm.earnRatePeriodDays must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
