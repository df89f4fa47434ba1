//! Balance and status metrics: Current Balance, Prepayment Date, Is Active,
//! Is Post Seller Purchase

use super::Derivation;
use crate::config::EngineConfig;
use crate::error::CurveResult;
use crate::loan::{DateAttribute, LoanScalar, StaticTable};
use crate::panel::{CashflowPanel, Metric, MetricRows};

/// `original_balance - cumulative Payment Made`, undefined payments counting as zero.
/// With `floor` set, overpayment beyond the outstanding balance clamps to zero.
pub fn current_balance(
    panel: &CashflowPanel,
    table: &StaticTable,
    floor: bool,
) -> CurveResult<MetricRows> {
    let made = panel.require(Metric::PaymentMade)?;
    let mut rows = MetricRows::new(Metric::CurrentBalance);

    for (loan_id, payments) in made {
        let loan = table.require(*loan_id, "current balance")?;
        let mut paid = 0.0;
        let series = payments
            .iter()
            .map(|payment| {
                paid += payment.unwrap_or(0.0);
                let balance = loan.original_balance - paid;
                Some(if floor { balance.max(0.0) } else { balance })
            })
            .collect();
        rows.insert(*loan_id, series);
    }
    Ok(rows)
}

/// First month whose Month End Balance is below `paid_off_tolerance`.
/// Scanning stops at the first hit.
pub fn prepayment_dates(
    panel: &CashflowPanel,
    table: &StaticTable,
    config: &EngineConfig,
) -> CurveResult<Derivation> {
    let balances = panel.require(Metric::MonthEndBalance)?;
    let mut derivation = Derivation::default();

    for (loan_id, series) in balances {
        table.require(*loan_id, "prepayment date")?;
        let paid_off = series
            .iter()
            .position(|b| matches!(b, Some(v) if *v < config.paid_off_tolerance))
            .map(|idx| panel.dates()[idx]);
        derivation
            .scalars
            .push((*loan_id, LoanScalar::PrepaymentDate(paid_off)));
    }
    Ok(derivation)
}

/// 1 from origination up to and including the default month, else 0
pub fn is_active(panel: &CashflowPanel, table: &StaticTable) -> MetricRows {
    let mut rows = MetricRows::new(Metric::IsActive);
    for loan in table.iter() {
        let series = panel
            .date_columns()
            .map(|date| {
                let originated = date >= loan.origination_date;
                let performing = loan.derived.default_month.map_or(true, |d| date <= d);
                Some(if originated && performing { 1.0 } else { 0.0 })
            })
            .collect();
        rows.insert(loan.loan_id, series);
    }
    rows
}

/// 1 on/after the seller purchase date, 0 before, undefined without a date
pub fn post_seller_purchase(panel: &CashflowPanel, table: &StaticTable) -> MetricRows {
    let mut rows = MetricRows::new(Metric::IsPostSellerPurchase);
    for loan in table.iter() {
        let series = panel
            .date_columns()
            .map(|date| {
                loan.date(DateAttribute::SellerPurchase)
                    .map(|purchased| if date >= purchased { 1.0 } else { 0.0 })
            })
            .collect();
        rows.insert(loan.loan_id, series);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::Loan;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn month_ends() -> Vec<NaiveDate> {
        vec![date(2022, 1, 31), date(2022, 2, 28), date(2022, 3, 31), date(2022, 4, 30)]
    }

    fn panel_with(metric: Metric, series: Vec<Option<f64>>) -> CashflowPanel {
        let mut panel = CashflowPanel::new(month_ends()).unwrap();
        let mut rows = MetricRows::new(metric);
        rows.insert(1, series);
        panel.add_metric(rows).unwrap();
        panel
    }

    #[test]
    fn test_current_balance_floor() {
        let panel = panel_with(
            Metric::PaymentMade,
            vec![Some(100.0), Some(100.0), Some(100.0), Some(800.0)],
        );
        let table = StaticTable::new([Loan::new(1, date(2021, 12, 31), 1000.0)]);

        let floored = current_balance(&panel, &table, true).unwrap();
        assert_eq!(
            floored.get(1).unwrap(),
            &vec![Some(900.0), Some(800.0), Some(700.0), Some(0.0)]
        );
        let unfloored = current_balance(&panel, &table, false).unwrap();
        assert_eq!(unfloored.get(1).unwrap()[3], Some(-100.0));
    }

    #[test]
    fn test_current_balance_skips_undefined() {
        let panel = panel_with(Metric::PaymentMade, vec![None, Some(50.0), None, None]);
        let table = StaticTable::new([Loan::new(1, date(2021, 12, 31), 200.0)]);
        let rows = current_balance(&panel, &table, true).unwrap();
        assert_eq!(
            rows.get(1).unwrap(),
            &vec![Some(200.0), Some(150.0), Some(150.0), Some(150.0)]
        );
    }

    #[test]
    fn test_prepayment_date_first_hit() {
        let panel = panel_with(
            Metric::MonthEndBalance,
            vec![Some(100.0), Some(0.000001), Some(50.0), Some(0.0)],
        );
        let table = StaticTable::new([Loan::new(1, date(2021, 12, 31), 100.0)]);
        let derivation = prepayment_dates(&panel, &table, &EngineConfig::default()).unwrap();
        assert_eq!(
            derivation.scalars,
            vec![(1, LoanScalar::PrepaymentDate(Some(date(2022, 2, 28))))]
        );
    }

    #[test]
    fn test_no_prepayment() {
        let panel = panel_with(Metric::MonthEndBalance, vec![Some(100.0), None, Some(0.01), None]);
        let table = StaticTable::new([Loan::new(1, date(2021, 12, 31), 100.0)]);
        let derivation = prepayment_dates(&panel, &table, &EngineConfig::default()).unwrap();
        assert_eq!(derivation.scalars, vec![(1, LoanScalar::PrepaymentDate(None))]);
    }

    #[test]
    fn test_is_active_window() {
        let panel = CashflowPanel::new(month_ends()).unwrap();
        let mut defaulted = Loan::new(1, date(2022, 2, 15), 100.0);
        defaulted.derived.default_month = Some(date(2022, 3, 31));
        let performing = Loan::new(2, date(2022, 1, 31), 100.0);
        let rows = is_active(&panel, &StaticTable::new([defaulted, performing]));

        assert_eq!(
            rows.get(1).unwrap(),
            &vec![Some(0.0), Some(1.0), Some(1.0), Some(0.0)]
        );
        assert_eq!(rows.get(2).unwrap(), &vec![Some(1.0); 4]);
    }

    #[test]
    fn test_post_seller_purchase() {
        let panel = CashflowPanel::new(month_ends()).unwrap();
        let mut purchased = Loan::new(1, date(2021, 6, 30), 100.0);
        purchased.seller_purchase_date = Some(date(2022, 3, 1));
        let rows = post_seller_purchase(
            &panel,
            &StaticTable::new([purchased, Loan::new(2, date(2021, 6, 30), 100.0)]),
        );
        assert_eq!(
            rows.get(1).unwrap(),
            &vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)]
        );
        assert_eq!(rows.get(2).unwrap(), &vec![None; 4]);
    }
}
