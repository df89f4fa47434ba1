//! Payment Made vs Due and the running missed-payment counter

use crate::config::EngineConfig;
use crate::error::CurveResult;
use crate::panel::{CashflowPanel, LoanId, Metric, MetricRows, Series};
use std::collections::BTreeMap;

/// `Payment Made - Payment Due` per loan and month.
///
/// A one-sided undefined value counts as zero; the cell is undefined only when
/// both sides are. Positive is an overpayment, negative a shortfall.
pub fn payment_made_vs_due(panel: &CashflowPanel) -> CurveResult<MetricRows> {
    let made = panel.require(Metric::PaymentMade)?;
    let due = panel.require(Metric::PaymentDue)?;
    let empty: Series = vec![None; panel.n_months()];

    let mut rows = MetricRows::new(Metric::PaymentMadeVsDue);
    let loan_ids = made.keys().chain(due.keys()).copied();
    for loan_id in loan_ids {
        if rows.get(loan_id).is_some() {
            continue;
        }
        let made_row = made.get(&loan_id).unwrap_or(&empty);
        let due_row = due.get(&loan_id).unwrap_or(&empty);
        let series = made_row
            .iter()
            .zip(due_row)
            .map(|(m, d)| match (m, d) {
                (None, None) => None,
                _ => Some(m.unwrap_or(0.0) - d.unwrap_or(0.0)),
            })
            .collect();
        rows.insert(loan_id, series);
    }
    Ok(rows)
}

/// True when the month is a shortfall beyond tolerance
pub fn is_missed(value: Option<f64>, config: &EngineConfig) -> bool {
    matches!(value, Some(v) if v < -config.miss_tolerance)
}

/// Running count of missed months, non-decreasing per loan
pub fn missing_payments(made_vs_due: &BTreeMap<LoanId, Series>, config: &EngineConfig) -> MetricRows {
    let mut rows = MetricRows::new(Metric::MissingPayments);
    for (loan_id, series) in made_vs_due {
        let counts = series
            .iter()
            .scan(0.0, |count, value| {
                if is_missed(*value, config) {
                    *count += 1.0;
                }
                Some(Some(*count))
            })
            .collect();
        rows.insert(*loan_id, counts);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CurveError;
    use chrono::NaiveDate;

    fn panel(made: Series, due: Series) -> CashflowPanel {
        let dates = (1..=made.len() as u32)
            .map(|m| NaiveDate::from_ymd_opt(2022, m, 1).unwrap())
            .collect();
        let mut panel = CashflowPanel::new(dates).unwrap();
        let mut made_rows = MetricRows::new(Metric::PaymentMade);
        made_rows.insert(1, made);
        let mut due_rows = MetricRows::new(Metric::PaymentDue);
        due_rows.insert(1, due);
        panel.add_metric(made_rows).unwrap();
        panel.add_metric(due_rows).unwrap();
        panel
    }

    #[test]
    fn test_made_vs_due() {
        let panel = panel(
            vec![Some(100.0), Some(0.0), None, Some(250.0), None],
            vec![Some(100.0), Some(100.0), Some(100.0), Some(100.0), None],
        );
        let rows = payment_made_vs_due(&panel).unwrap();
        assert_eq!(
            rows.get(1).unwrap(),
            &vec![Some(0.0), Some(-100.0), Some(-100.0), Some(150.0), None]
        );
    }

    #[test]
    fn test_missing_payment_counter() {
        let mut pmvd = MetricRows::new(Metric::PaymentMadeVsDue);
        pmvd.insert(
            1,
            vec![Some(-1.0), Some(-0.00005), Some(0.0), None, Some(-3.0), Some(2.0)],
        );
        let rows = missing_payments(&pmvd.rows, &EngineConfig::default());
        let counts: Vec<f64> = rows.get(1).unwrap().iter().map(|v| v.unwrap()).collect();
        assert_eq!(counts, vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0]);
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_requires_raw_metrics() {
        let dates = vec![NaiveDate::from_ymd_opt(2022, 1, 31).unwrap()];
        let mut panel = CashflowPanel::new(dates).unwrap();
        let mut made = MetricRows::new(Metric::PaymentMade);
        made.insert(1, vec![Some(1.0)]);
        panel.add_metric(made).unwrap();
        let err = payment_made_vs_due(&panel).unwrap_err();
        assert!(matches!(err, CurveError::MissingMetric { ref metric } if metric == "Payment Due"));
    }
}
