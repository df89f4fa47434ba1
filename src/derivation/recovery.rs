//! Post-default metrics: recovery payments, cumulative recovery,
//! balance at default and recovery percent

use super::Derivation;
use crate::config::EngineConfig;
use crate::error::CurveResult;
use crate::loan::{LoanScalar, StaticTable};
use crate::panel::{CashflowPanel, Metric, MetricRows};

/// Flag payments strictly above `recovery_tolerance` made on or after the
/// default month, including the default month itself.
///
/// Loans without a default get an all-zero row and undefined recovery scalars.
/// Defaulted loans always get a recovered amount (possibly zero).
pub fn recovery_payments(
    panel: &CashflowPanel,
    table: &StaticTable,
    config: &EngineConfig,
) -> CurveResult<Derivation> {
    let made = panel.require(Metric::PaymentMade)?;
    let mut derivation = Derivation::default();
    let mut rows = MetricRows::new(Metric::IsRecoveryPayment);

    for loan in table.iter() {
        let mut flags = vec![Some(0.0); panel.n_months()];
        let start = loan
            .derived
            .default_month
            .and_then(|date| panel.date_index(date));

        let (recovered, last_month) = match (start, made.get(&loan.loan_id)) {
            (Some(start), Some(payments)) => {
                let mut recovered = 0.0;
                let mut last = None;
                for idx in start..panel.n_months() {
                    if let Some(paid) = payments[idx].filter(|p| *p > config.recovery_tolerance) {
                        flags[idx] = Some(1.0);
                        recovered += paid;
                        last = Some(panel.dates()[idx]);
                    }
                }
                (Some(recovered), last)
            }
            (Some(_), None) => (Some(0.0), None),
            (None, _) => (None, None),
        };

        rows.insert(loan.loan_id, flags);
        derivation.scalars.extend([
            (loan.loan_id, LoanScalar::RecoveredAmount(recovered)),
            (loan.loan_id, LoanScalar::LastRecoveryMonth(last_month)),
        ]);
    }

    derivation.rows.push(rows);
    Ok(derivation)
}

/// Running sum of `Payment Made * Is Recovery Payment`; undefined payments count as zero
pub fn cumulative_recovery(panel: &CashflowPanel) -> CurveResult<MetricRows> {
    let made = panel.require(Metric::PaymentMade)?;
    let flags = panel.require(Metric::IsRecoveryPayment)?;

    let mut rows = MetricRows::new(Metric::CumulativeRecovery);
    for (loan_id, flag_row) in flags {
        let mut total = 0.0;
        let series = flag_row
            .iter()
            .enumerate()
            .map(|(idx, flag)| {
                let paid = made
                    .get(loan_id)
                    .and_then(|row| row[idx])
                    .unwrap_or(0.0);
                total += paid * flag.unwrap_or(0.0);
                Some(total)
            })
            .collect();
        rows.insert(*loan_id, series);
    }
    Ok(rows)
}

/// Month End Balance at the default month, cached per loan and broadcast as a
/// constant row for use as a ratio denominator
pub fn exposure_at_default(panel: &CashflowPanel, table: &StaticTable) -> CurveResult<Derivation> {
    let balances = panel.require(Metric::MonthEndBalance)?;
    let mut derivation = Derivation::default();
    let mut rows = MetricRows::new(Metric::BalanceAtDefault);

    for loan in table.iter() {
        let exposure = loan
            .derived
            .default_month
            .and_then(|date| panel.date_index(date))
            .and_then(|idx| balances.get(&loan.loan_id).and_then(|row| row[idx]));

        rows.insert(loan.loan_id, vec![exposure; panel.n_months()]);
        derivation
            .scalars
            .push((loan.loan_id, LoanScalar::BalanceAtDefault(exposure)));
    }

    derivation.rows.push(rows);
    Ok(derivation)
}

/// `recovered_amount / balance_at_default`, undefined when either side is or
/// the balance is zero
pub fn recovery_percent(table: &StaticTable) -> Derivation {
    let scalars = table
        .iter()
        .map(|loan| {
            let pct = match (loan.derived.recovered_amount, loan.derived.balance_at_default) {
                (Some(recovered), Some(balance)) if balance != 0.0 => Some(recovered / balance),
                _ => None,
            };
            (loan.loan_id, LoanScalar::RecoveryPercent(pct))
        })
        .collect();
    Derivation {
        rows: Vec::new(),
        scalars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::Loan;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn dates(n: u32) -> Vec<NaiveDate> {
        (1..=n)
            .map(|m| NaiveDate::from_ymd_opt(2022, m, 28).unwrap())
            .collect()
    }

    fn setup() -> (CashflowPanel, StaticTable) {
        let dates = dates(6);
        let mut panel = CashflowPanel::new(dates.clone()).unwrap();
        let mut made = MetricRows::new(Metric::PaymentMade);
        made.insert(1, vec![Some(10.0), Some(0.0), Some(0.0), Some(0.0), Some(3.0), Some(0.0)]);
        made.insert(2, vec![Some(10.0); 6]);
        panel.add_metric(made).unwrap();
        let mut balance = MetricRows::new(Metric::MonthEndBalance);
        balance.insert(1, vec![Some(500.0), Some(500.0), Some(480.0), Some(480.0), Some(477.0), Some(477.0)]);
        balance.insert(2, vec![Some(100.0); 6]);
        panel.add_metric(balance).unwrap();

        let mut defaulted = Loan::new(1, dates[0], 500.0);
        defaulted.derived.default_month = Some(dates[2]);
        let table = StaticTable::new([defaulted, Loan::new(2, dates[0], 100.0)]);
        (panel, table)
    }

    #[test]
    fn test_recovery_after_default() {
        let (panel, table) = setup();
        let derivation = recovery_payments(&panel, &table, &EngineConfig::default()).unwrap();
        let flags = derivation.rows[0].get(1).unwrap();
        // Default at month 2; payments [0, 3, 0] at months 3..5
        assert_eq!(&flags[3..], &[Some(0.0), Some(1.0), Some(0.0)]);
        // Pre-default payment is never a recovery
        assert_eq!(flags[0], Some(0.0));

        assert!(derivation
            .scalars
            .contains(&(1, LoanScalar::RecoveredAmount(Some(3.0)))));
        assert!(derivation
            .scalars
            .contains(&(1, LoanScalar::LastRecoveryMonth(Some(panel.dates()[4])))));

        // No default: zero flags and undefined scalars
        assert_eq!(derivation.rows[0].get(2).unwrap(), &vec![Some(0.0); 6]);
        assert!(derivation.scalars.contains(&(2, LoanScalar::RecoveredAmount(None))));
    }

    #[test]
    fn test_default_month_payment_is_recovery() {
        let (mut panel, table) = setup();
        let mut made = MetricRows::new(Metric::PaymentMade);
        made.insert(1, vec![Some(10.0), Some(0.0), Some(2.0), Some(0.0), Some(3.0), Some(0.0)]);
        panel.add_metric(made).unwrap();
        let derivation = recovery_payments(&panel, &table, &EngineConfig::default()).unwrap();
        assert_eq!(derivation.rows[0].get(1).unwrap()[2], Some(1.0));
        assert!(derivation
            .scalars
            .contains(&(1, LoanScalar::RecoveredAmount(Some(5.0)))));
    }

    #[test]
    fn test_cumulative_recovery() {
        let (mut panel, table) = setup();
        let derivation = recovery_payments(&panel, &table, &EngineConfig::default()).unwrap();
        panel.add_metric(derivation.rows[0].clone()).unwrap();

        let rows = cumulative_recovery(&panel).unwrap();
        let series: Vec<f64> = rows.get(1).unwrap().iter().map(|v| v.unwrap()).collect();
        assert_eq!(series, vec![0.0, 0.0, 0.0, 0.0, 3.0, 3.0]);
        assert!(series.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(rows.get(2).unwrap(), &vec![Some(0.0); 6]);
    }

    #[test]
    fn test_exposure_and_recovery_percent() {
        let (panel, mut table) = setup();
        let exposure = exposure_at_default(&panel, &table).unwrap();
        assert_eq!(exposure.rows[0].get(1).unwrap(), &vec![Some(480.0); 6]);
        assert_eq!(exposure.rows[0].get(2).unwrap(), &vec![None; 6]);
        table.apply_all(exposure.scalars).unwrap();

        let recovery = recovery_payments(&panel, &table, &EngineConfig::default()).unwrap();
        table.apply_all(recovery.scalars).unwrap();

        let pct = recovery_percent(&table);
        match pct.scalars[0] {
            (1, LoanScalar::RecoveryPercent(Some(value))) => assert_relative_eq!(value, 3.0 / 480.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(pct.scalars[1], (2, LoanScalar::RecoveryPercent(None)));
    }

    #[test]
    fn test_recovery_percent_zero_balance() {
        let mut loan = Loan::new(1, dates(1)[0], 100.0);
        loan.derived.recovered_amount = Some(10.0);
        loan.derived.balance_at_default = Some(0.0);
        let pct = recovery_percent(&StaticTable::new([loan]));
        assert_eq!(pct.scalars, vec![(1, LoanScalar::RecoveryPercent(None))]);
    }
}
