//! Generic group-by-index ratio aggregation shared by every curve kind

use crate::error::{CurveError, CurveResult};
use crate::loan::attribute_key;
use crate::panel::Metric;
use crate::portfolio::{LoanView, Portfolio};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One loan in one month, as seen by a curve kind
#[derive(Debug, Clone, Copy)]
pub struct LoanMonth<'a> {
    pub view: &'a LoanView<'a>,
    pub month: usize,
}

impl LoanMonth<'_> {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.view.value(metric, self.month)
    }
}

/// The single capability a curve needs: turn a loan-month into a
/// (numerator, denominator) contribution. Undefined parts are skipped by the sums.
pub trait CurveKind: Send + Sync {
    /// Short name used to label output series (e.g. "CPR")
    fn name(&self) -> &str;

    /// Index the curve is conventionally plotted against
    fn default_index(&self) -> Metric;

    /// Panel metrics `observe` reads
    fn required_metrics(&self) -> Vec<Metric>;

    fn observe(&self, obs: &LoanMonth<'_>) -> (Option<f64>, Option<f64>);
}

/// Totals and ratio at one index value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub index: f64,
    pub numerator: f64,
    pub denominator: f64,
    /// Undefined when the denominator sums to zero or has no defined values
    pub ratio: Option<f64>,
}

/// Ratio series of one cohort; `cohort` is `None` without pivots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSeries {
    pub cohort: Option<String>,
    pub points: Vec<CurvePoint>,
}

impl CurveSeries {
    pub fn ratio_at(&self, index: f64) -> Option<f64> {
        self.point_at(index).and_then(|p| p.ratio)
    }

    pub fn point_at(&self, index: f64) -> Option<&CurvePoint> {
        self.points.iter().find(|p| p.index == index)
    }

    pub fn indices(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.index)
    }
}

/// All cohort series of one curve computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    pub kind: String,
    pub index: Metric,
    pub series: Vec<CurveSeries>,
}

impl CurveSet {
    /// Column label of a series: `<cohort>_<kind>`, or just the kind
    pub fn label(&self, series: &CurveSeries) -> String {
        match &series.cohort {
            Some(cohort) => format!("{cohort}_{}", self.kind),
            None => self.kind.clone(),
        }
    }

    pub fn cohort(&self, name: &str) -> Option<&CurveSeries> {
        self.series
            .iter()
            .find(|s| s.cohort.as_deref() == Some(name))
    }

    /// Series combined column-wise on the union of their indices
    pub fn aligned(&self) -> Vec<(f64, Vec<Option<f64>>)> {
        let columns: Vec<BTreeMap<IndexKey, Option<f64>>> = self
            .series
            .iter()
            .map(|s| {
                s.points
                    .iter()
                    .map(|p| (IndexKey::new(p.index), p.ratio))
                    .collect()
            })
            .collect();
        let indices: BTreeSet<IndexKey> = columns
            .iter()
            .flat_map(|column| column.keys().copied())
            .collect();
        indices
            .into_iter()
            .map(|key| {
                let ratios = columns
                    .iter()
                    .map(|column| column.get(&key).copied().flatten())
                    .collect();
                (key.0, ratios)
            })
            .collect()
    }
}

/// Totally ordered index value; -0.0 is folded into 0.0
#[derive(Debug, Clone, Copy)]
struct IndexKey(f64);

impl IndexKey {
    fn new(value: f64) -> Self {
        Self(value + 0.0)
    }
}

impl PartialEq for IndexKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexKey {}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    numerator: f64,
    denominator: f64,
    has_denominator: bool,
}

impl Totals {
    fn add(&mut self, (numerator, denominator): (Option<f64>, Option<f64>)) {
        if let Some(n) = numerator {
            self.numerator += n;
        }
        if let Some(d) = denominator {
            self.denominator += d;
            self.has_denominator = true;
        }
    }

    fn ratio(&self) -> Option<f64> {
        (self.has_denominator && self.denominator != 0.0)
            .then(|| self.numerator / self.denominator)
    }
}

/// Aggregate one partition of loans into an index-sorted series
fn aggregate(
    views: &[&LoanView<'_>],
    kind: &dyn CurveKind,
    index: Metric,
    n_months: usize,
    filter_index_nonnegative: bool,
) -> Vec<CurvePoint> {
    let mut groups: BTreeMap<IndexKey, Totals> = BTreeMap::new();
    for &view in views {
        for month in 0..n_months {
            let Some(idx) = view.value(index, month).filter(|v| !v.is_nan()) else {
                continue;
            };
            let obs = LoanMonth { view, month };
            groups.entry(IndexKey::new(idx)).or_default().add(kind.observe(&obs));
        }
    }

    groups
        .into_iter()
        .filter(|(key, _)| !filter_index_nonnegative || key.0 >= 0.0)
        .map(|(key, totals)| CurvePoint {
            index: key.0,
            numerator: totals.numerator,
            denominator: totals.denominator,
            ratio: totals.ratio(),
        })
        .collect()
}

/// Build one ratio series per cohort.
///
/// With pivots, loans are partitioned by the distinct combinations of those
/// static attributes (cohort name = values joined with `_`); loans missing any
/// pivot value are left out. Every metric the kind reads must already be in
/// the panel.
pub fn build_curve(
    portfolio: &Portfolio,
    kind: &dyn CurveKind,
    index: Metric,
    pivots: &[&str],
    filter_index_nonnegative: bool,
) -> CurveResult<CurveSet> {
    let panel = portfolio.panel();
    panel.require(index)?;
    for metric in kind.required_metrics() {
        panel.require(metric)?;
    }
    let keys: Vec<String> = pivots.iter().map(|p| attribute_key(p)).collect();
    let known = portfolio.static_table().attribute_names();
    if let Some(pos) = keys.iter().position(|k| !known.contains(k.as_str())) {
        return Err(CurveError::UnknownAttribute {
            name: pivots[pos].to_string(),
        });
    }

    let views = portfolio.all_data();
    let mut partitions: BTreeMap<Vec<String>, Vec<&LoanView<'_>>> = BTreeMap::new();
    let mut dropped = 0usize;
    for view in &views {
        let key: Option<Vec<String>> = keys
            .iter()
            .map(|k| view.loan.and_then(|l| l.attributes.get(k)).cloned())
            .collect();
        match key {
            Some(key) => partitions.entry(key).or_default().push(view),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        log::warn!(
            "{dropped} loans without values for pivots {pivots:?} left out of {}",
            kind.name()
        );
    }

    let series = partitions
        .into_iter()
        .map(|(key, members)| CurveSeries {
            cohort: (!pivots.is_empty()).then(|| key.join("_")),
            points: aggregate(
                &members,
                kind,
                index,
                panel.n_months(),
                filter_index_nonnegative,
            ),
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Built {} by {index}: {} series",
        kind.name(),
        series.len()
    );
    Ok(CurveSet {
        kind: kind.name().to_string(),
        index,
        series,
    })
}
