//! In-memory long-format cashflow panel

use super::Metric;
use crate::error::{CurveError, CurveResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Dense 1-based loan identifier shared by the panel and the static table
pub type LoanId = u32;

/// One value per month-end date column; `None` means no obligation / undefined
pub type Series = Vec<Option<f64>>;

/// All rows of a single metric, one series per loan, sorted by loan id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRows {
    pub metric: Metric,
    pub rows: BTreeMap<LoanId, Series>,
}

impl MetricRows {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            rows: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, loan_id: LoanId, series: Series) {
        self.rows.insert(loan_id, series);
    }

    pub fn get(&self, loan_id: LoanId) -> Option<&Series> {
        self.rows.get(&loan_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Panel of (loan, metric) rows over a shared ascending month-end date axis.
///
/// Each metric holds at most one row per loan. Adding a metric that is already
/// present replaces its rows, so the last write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashflowPanel {
    dates: Vec<NaiveDate>,
    metrics: BTreeMap<Metric, BTreeMap<LoanId, Series>>,
}

impl CashflowPanel {
    /// Create an empty panel; the date axis must be strictly ascending
    pub fn new(dates: Vec<NaiveDate>) -> CurveResult<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(CurveError::InvalidDates {
                reason: format!("{} is not before {}", pair[0], pair[1]),
            });
        }
        Ok(Self {
            dates,
            metrics: BTreeMap::new(),
        })
    }

    /// Ordered month-end date columns
    pub fn date_columns(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn n_months(&self) -> usize {
        self.dates.len()
    }

    /// Position of a date on the axis
    pub fn date_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Commit a metric's rows, replacing any earlier rows for that metric
    pub fn add_metric(&mut self, rows: MetricRows) -> CurveResult<()> {
        for (loan_id, series) in &rows.rows {
            if series.len() != self.dates.len() {
                return Err(CurveError::ShapeMismatch {
                    loan_id: *loan_id,
                    metric: rows.metric.to_string(),
                    expected: self.dates.len(),
                    got: series.len(),
                });
            }
        }
        self.metrics.insert(rows.metric, rows.rows);
        Ok(())
    }

    /// Merge rows into a metric, keeping rows of loans not in `rows`
    pub fn merge_metric(&mut self, rows: MetricRows) -> CurveResult<()> {
        let metric = rows.metric;
        let mut merged = self.metrics.remove(&metric).unwrap_or_default();
        merged.extend(rows.rows);
        self.add_metric(MetricRows {
            metric,
            rows: merged,
        })
    }

    pub fn contains(&self, metric: Metric) -> bool {
        self.metrics.contains_key(&metric)
    }

    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.metrics.keys().copied()
    }

    pub fn metric(&self, metric: Metric) -> Option<&BTreeMap<LoanId, Series>> {
        self.metrics.get(&metric)
    }

    /// Like [`metric`](Self::metric) but absence is an error
    pub fn require(&self, metric: Metric) -> CurveResult<&BTreeMap<LoanId, Series>> {
        self.metric(metric)
            .ok_or_else(|| CurveError::missing_metric(metric))
    }

    pub fn row(&self, loan_id: LoanId, metric: Metric) -> Option<&Series> {
        self.metrics.get(&metric).and_then(|rows| rows.get(&loan_id))
    }

    pub fn value(&self, loan_id: LoanId, metric: Metric, month: usize) -> Option<f64> {
        self.row(loan_id, metric)
            .and_then(|series| series.get(month).copied().flatten())
    }

    /// Every loan id appearing under any metric
    pub fn loan_ids(&self) -> BTreeSet<LoanId> {
        self.metrics
            .values()
            .flat_map(|rows| rows.keys().copied())
            .collect()
    }
}
