//! Months-since metrics: Seasoning, Time Since Default, Time Since Reversion

use crate::config::EngineConfig;
use crate::error::CurveResult;
use crate::loan::{DateAttribute, StaticTable};
use crate::panel::{CashflowPanel, Metric, MetricRows};
use chrono::NaiveDate;

/// Whole months between `reference` and `date` using a fixed month length.
///
/// Not calendar accurate. Halves round to even; dates before the reference
/// give negative values.
pub fn months_between(date: NaiveDate, reference: NaiveDate, days_per_month: f64) -> f64 {
    let days = (date - reference).num_days() as f64;
    (days / days_per_month).round_ties_even()
}

/// One row per static loan, counting months since the loan's `anchor` date.
/// Loans without that date get an all-undefined row.
pub fn months_since(
    panel: &CashflowPanel,
    table: &StaticTable,
    metric: Metric,
    anchor: DateAttribute,
    config: &EngineConfig,
) -> CurveResult<MetricRows> {
    let mut rows = MetricRows::new(metric);
    for loan in table.iter() {
        let series = match loan.date(anchor) {
            Some(reference) => panel
                .date_columns()
                .map(|d| Some(months_between(d, reference, config.days_per_month)))
                .collect(),
            None => vec![None; panel.n_months()],
        };
        rows.insert(loan.loan_id, series);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::Loan;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_between() {
        let orig = date(2022, 1, 1);
        assert_eq!(months_between(date(2022, 1, 31), orig, 30.0), 1.0);
        assert_eq!(months_between(orig, orig, 30.0), 0.0);
        assert_eq!(months_between(date(2021, 12, 31), orig, 30.0), -0.0);
        assert_eq!(months_between(date(2021, 10, 31), orig, 30.0), -2.0);
        // 45 days is 1.5 months, rounds to even
        assert_eq!(months_between(date(2022, 2, 15), orig, 30.0), 2.0);
        // 365 days drifts from the calendar count
        assert_eq!(months_between(date(2023, 1, 1), orig, 30.0), 12.0);
    }

    #[test]
    fn test_months_since_anchor_missing() {
        let panel = CashflowPanel::new(vec![date(2022, 1, 31), date(2022, 2, 28)]).unwrap();
        let mut with_reversion = Loan::new(1, date(2021, 12, 31), 100.0);
        with_reversion.reversion_date = Some(date(2022, 2, 28));
        let table = StaticTable::new([with_reversion, Loan::new(2, date(2022, 1, 1), 100.0)]);

        let rows = months_since(
            &panel,
            &table,
            Metric::TimeSinceReversion,
            DateAttribute::Reversion,
            &EngineConfig::default(),
        )
        .unwrap();

        assert_eq!(rows.get(1).unwrap(), &vec![Some(-1.0), Some(0.0)]);
        assert_eq!(rows.get(2).unwrap(), &vec![None, None]);

        let seasoning = months_since(
            &panel,
            &table,
            Metric::Seasoning,
            DateAttribute::Origination,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(seasoning.get(1).unwrap(), &vec![Some(1.0), Some(2.0)]);
    }
}
