//! Default month detection
//!
//! Chronological scan of Payment Made vs Due per loan. A run of
//! `default_trigger_months` consecutive missed months defaults the loan at the
//! month completing the run. Any month that is not a miss (on-time, overpaid or
//! undefined) resets the run. Default is terminal: scanning stops and a loan is
//! never flagged twice.

use super::payments::is_missed;
use super::Derivation;
use crate::config::EngineConfig;
use crate::error::CurveResult;
use crate::loan::{LoanScalar, StaticTable};
use crate::panel::{CashflowPanel, LoanId, Metric, MetricRows, Series};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreakState {
    Counting(u32),
    Defaulted(usize),
}

impl StreakState {
    fn step(self, month: usize, missed: bool, trigger: u32) -> Self {
        match self {
            StreakState::Defaulted(_) => self,
            StreakState::Counting(run) if missed => {
                if run + 1 >= trigger {
                    StreakState::Defaulted(month)
                } else {
                    StreakState::Counting(run + 1)
                }
            }
            StreakState::Counting(_) => StreakState::Counting(0),
        }
    }
}

/// Index of the default month within `made_vs_due`, if any
pub fn detect_default(made_vs_due: &[Option<f64>], config: &EngineConfig) -> Option<usize> {
    let mut state = StreakState::Counting(0);
    for (month, value) in made_vs_due.iter().enumerate() {
        state = state.step(month, is_missed(*value, config), config.default_trigger_months);
        if let StreakState::Defaulted(at) = state {
            return Some(at);
        }
    }
    None
}

/// `Is Default Month` rows plus the `default_month` scalar per loan.
///
/// Loans whose default month is already recorded keep it; their indicator is
/// rebuilt from the recorded month without rescanning.
pub fn default_months(
    panel: &CashflowPanel,
    made_vs_due: &BTreeMap<LoanId, Series>,
    table: &StaticTable,
    config: &EngineConfig,
) -> CurveResult<Derivation> {
    let mut derivation = Derivation::default();
    let mut rows = MetricRows::new(Metric::IsDefaultMonth);

    for (loan_id, series) in made_vs_due {
        let loan = table.require(*loan_id, "default month detection")?;
        let month = match loan.derived.default_month {
            Some(recorded) => panel.date_index(recorded),
            None => detect_default(series, config),
        };

        let indicator = (0..panel.n_months())
            .map(|idx| Some(if Some(idx) == month { 1.0 } else { 0.0 }))
            .collect();
        rows.insert(*loan_id, indicator);

        if loan.derived.default_month.is_none() {
            let date = month.map(|idx| panel.dates()[idx]);
            derivation
                .scalars
                .push((*loan_id, LoanScalar::DefaultMonth(date)));
        }
    }

    derivation.rows.push(rows);
    Ok(derivation)
}
