//! Concrete curves: prepayment (CPR), default (CDR) and recovery

use super::{CurveKind, LoanMonth};
use crate::panel::Metric;

/// Prepaid amount over Month End Balance by seasoning.
///
/// Any payment above the amount due is treated as a prepayment. Catch-up
/// payments on earlier arrears are counted too; they are rare and small.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrepaymentRate;

impl CurveKind for PrepaymentRate {
    fn name(&self) -> &str {
        "CPR"
    }

    fn default_index(&self) -> Metric {
        Metric::Seasoning
    }

    fn required_metrics(&self) -> Vec<Metric> {
        vec![Metric::PaymentMadeVsDue, Metric::MonthEndBalance]
    }

    fn observe(&self, obs: &LoanMonth<'_>) -> (Option<f64>, Option<f64>) {
        let prepaid = obs.value(Metric::PaymentMadeVsDue).map(|v| v.max(0.0));
        (prepaid, obs.value(Metric::MonthEndBalance))
    }
}

/// Newly defaulted loans over active loans by seasoning
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRate;

impl CurveKind for DefaultRate {
    fn name(&self) -> &str {
        "CDR"
    }

    fn default_index(&self) -> Metric {
        Metric::Seasoning
    }

    fn required_metrics(&self) -> Vec<Metric> {
        vec![Metric::IsDefaultMonth, Metric::IsActive]
    }

    fn observe(&self, obs: &LoanMonth<'_>) -> (Option<f64>, Option<f64>) {
        (obs.value(Metric::IsDefaultMonth), obs.value(Metric::IsActive))
    }
}

/// Cumulative recoveries over balance at default by time since default
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryRate;

impl CurveKind for RecoveryRate {
    fn name(&self) -> &str {
        "Recovery"
    }

    fn default_index(&self) -> Metric {
        Metric::TimeSinceDefault
    }

    fn required_metrics(&self) -> Vec<Metric> {
        vec![Metric::CumulativeRecovery, Metric::BalanceAtDefault]
    }

    fn observe(&self, obs: &LoanMonth<'_>) -> (Option<f64>, Option<f64>) {
        (
            obs.value(Metric::CumulativeRecovery),
            obs.value(Metric::BalanceAtDefault),
        )
    }
}

/// Plain ratio of two panel metrics
#[derive(Debug, Clone)]
pub struct MetricRatio {
    name: String,
    numerator: Metric,
    denominator: Metric,
}

impl MetricRatio {
    pub fn new(name: impl Into<String>, numerator: Metric, denominator: Metric) -> Self {
        Self {
            name: name.into(),
            numerator,
            denominator,
        }
    }
}

impl CurveKind for MetricRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_index(&self) -> Metric {
        Metric::Seasoning
    }

    fn required_metrics(&self) -> Vec<Metric> {
        vec![self.numerator, self.denominator]
    }

    fn observe(&self, obs: &LoanMonth<'_>) -> (Option<f64>, Option<f64>) {
        (obs.value(self.numerator), obs.value(self.denominator))
    }
}
