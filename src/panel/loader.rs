//! Load the cashflow panel from CSV
//!
//! Two layouts are accepted:
//! - long format: `loan_id,data,<date>,<date>,...` with the metric label in `data`
//! - single-metric tab: `loan_id,<date>,<date>,...`, metric supplied by the caller
//!
//! Empty cells are undefined values.

use super::{CashflowPanel, LoanId, Metric, MetricRows, Series};
use crate::error::{CurveError, CurveResult};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a date cell, tolerating a trailing midnight timestamp
pub(crate) fn parse_date(raw: &str) -> CurveResult<NaiveDate> {
    let trimmed = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .map_err(|_| CurveError::parse("date", trimmed))
}

pub(crate) fn parse_loan_id(raw: &str) -> CurveResult<LoanId> {
    let trimmed = raw.trim();
    // Spreadsheet exports often write integer ids as floats
    let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    trimmed
        .parse()
        .map_err(|_| CurveError::parse("loan_id", raw))
}

pub(crate) fn parse_optional_f64(raw: &str, context: &str) -> CurveResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .replace(',', "")
        .parse()
        .map(Some)
        .map_err(|_| CurveError::parse(context, raw))
}

/// Rows of one file, still detached from a panel
#[derive(Debug)]
struct PanelFragment {
    dates: Vec<NaiveDate>,
    rows: Vec<MetricRows>,
}

/// Load and merge long-format panel files
pub fn load_panel<P: AsRef<Path>>(paths: &[P]) -> CurveResult<CashflowPanel> {
    let mut fragments = Vec::with_capacity(paths.len());
    for path in paths {
        let file = File::open(path.as_ref())?;
        fragments.push(read_long_format(file)?);
        log::debug!("Read panel file {}", path.as_ref().display());
    }
    assemble(fragments)
}

/// Load a long-format panel from any reader
pub fn load_panel_from_reader<R: Read>(reader: R) -> CurveResult<CashflowPanel> {
    assemble(vec![read_long_format(reader)?])
}

/// Load one single-metric tab into an existing panel, or start a new one
pub fn load_metric_tab<R: Read>(
    reader: R,
    metric: Metric,
    panel: Option<CashflowPanel>,
) -> CurveResult<CashflowPanel> {
    let fragment = read_metric_tab(reader, metric)?;
    match panel {
        Some(mut existing) => {
            if existing.dates() != fragment.dates.as_slice() {
                return Err(CurveError::InvalidDates {
                    reason: format!("{metric} tab has a different date axis"),
                });
            }
            for rows in fragment.rows {
                existing.merge_metric(rows)?;
            }
            Ok(existing)
        }
        None => assemble(vec![fragment]),
    }
}

fn assemble(fragments: Vec<PanelFragment>) -> CurveResult<CashflowPanel> {
    let mut iter = fragments.into_iter();
    let first = iter.next().ok_or_else(|| CurveError::InvalidDates {
        reason: "no panel input".to_string(),
    })?;
    let mut panel = CashflowPanel::new(first.dates)?;
    for rows in first.rows {
        panel.merge_metric(rows)?;
    }
    for fragment in iter {
        if fragment.dates.as_slice() != panel.dates() {
            return Err(CurveError::InvalidDates {
                reason: "panel files disagree on date columns".to_string(),
            });
        }
        for rows in fragment.rows {
            panel.merge_metric(rows)?;
        }
    }
    log::info!(
        "Loaded panel: {} loans, {} months, {} metrics",
        panel.loan_ids().len(),
        panel.n_months(),
        panel.metrics().count()
    );
    Ok(panel)
}

fn header_dates(headers: &StringRecord, skip: usize) -> CurveResult<Vec<NaiveDate>> {
    headers.iter().skip(skip).map(parse_date).collect()
}

fn parse_series(record: &StringRecord, skip: usize, n_months: usize) -> CurveResult<Series> {
    let mut series = Vec::with_capacity(n_months);
    for idx in 0..n_months {
        let cell = record.get(idx + skip).unwrap_or("");
        series.push(parse_optional_f64(cell, "panel value")?);
    }
    Ok(series)
}

fn check_key_column(headers: &StringRecord, idx: usize, expected: &str) -> CurveResult<()> {
    match headers.get(idx) {
        Some(name) if name.trim().eq_ignore_ascii_case(expected) => Ok(()),
        other => Err(CurveError::parse(
            format!("header column {idx} (expected {expected})"),
            other.unwrap_or(""),
        )),
    }
}

fn read_long_format<R: Read>(reader: R) -> CurveResult<PanelFragment> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    check_key_column(&headers, 0, "loan_id")?;
    check_key_column(&headers, 1, "data")?;
    let dates = header_dates(&headers, 2)?;

    let mut by_metric: BTreeMap<Metric, MetricRows> = BTreeMap::new();
    for result in rdr.records() {
        let record = result?;
        let loan_id = parse_loan_id(record.get(0).unwrap_or(""))?;
        let label = record.get(1).unwrap_or("");
        let metric: Metric = label
            .parse()
            .map_err(|_| CurveError::parse("metric label", label))?;
        let series = parse_series(&record, 2, dates.len())?;
        by_metric
            .entry(metric)
            .or_insert_with(|| MetricRows::new(metric))
            .insert(loan_id, series);
    }

    Ok(PanelFragment {
        dates,
        rows: by_metric.into_values().collect(),
    })
}

fn read_metric_tab<R: Read>(reader: R, metric: Metric) -> CurveResult<PanelFragment> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    check_key_column(&headers, 0, "loan_id")?;
    let dates = header_dates(&headers, 1)?;

    let mut rows = MetricRows::new(metric);
    for result in rdr.records() {
        let record = result?;
        let loan_id = parse_loan_id(record.get(0).unwrap_or(""))?;
        rows.insert(loan_id, parse_series(&record, 1, dates.len())?);
    }

    Ok(PanelFragment {
        dates,
        rows: vec![rows],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "\
LOAN_ID,Data,2022-01-31,2022-02-28,2022-03-31
2,Payment Made,10,,30
1,Payment Made,1,2,3
1,Payment Due,1,1,1
";

    #[test]
    fn test_long_format() {
        let panel = load_panel_from_reader(LONG.as_bytes()).unwrap();
        assert_eq!(panel.n_months(), 3);
        assert_eq!(panel.value(2, Metric::PaymentMade, 1), None);
        assert_eq!(panel.value(2, Metric::PaymentMade, 2), Some(30.0));
        assert_eq!(panel.value(1, Metric::PaymentDue, 0), Some(1.0));
        let ids: Vec<_> = panel
            .require(Metric::PaymentMade)
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_merge_long_format_files() {
        let made = "loan_id,data,2022-01-31,2022-02-28\n1,Payment Made,5,0\n2,Payment Made,7,7\n";
        let due = "loan_id,data,2022-01-31,2022-02-28\n1,Payment Due,5,5\n3,Payment Due,1,1\n";
        let fragments = vec![
            read_long_format(made.as_bytes()).unwrap(),
            read_long_format(due.as_bytes()).unwrap(),
        ];
        let panel = assemble(fragments).unwrap();

        assert!(panel.contains(Metric::PaymentMade));
        assert!(panel.contains(Metric::PaymentDue));
        assert_eq!(panel.value(1, Metric::PaymentMade, 1), Some(0.0));
        assert_eq!(panel.value(1, Metric::PaymentDue, 1), Some(5.0));
        assert_eq!(panel.row(2, Metric::PaymentDue), None);
        assert_eq!(panel.loan_ids().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_merge_rejects_shifted_dates() {
        let made = "loan_id,data,2022-01-31,2022-02-28\n1,Payment Made,5,0\n";
        let due = "loan_id,data,2022-02-28,2022-03-31\n1,Payment Due,5,5\n";
        let fragments = vec![
            read_long_format(made.as_bytes()).unwrap(),
            read_long_format(due.as_bytes()).unwrap(),
        ];
        let err = assemble(fragments).unwrap_err();
        assert!(matches!(err, CurveError::InvalidDates { ref reason } if reason.contains("disagree")));
    }

    #[test]
    fn test_no_panel_input() {
        assert!(matches!(assemble(Vec::new()), Err(CurveError::InvalidDates { .. })));
    }

    #[test]
    fn test_metric_tabs_merge() {
        let due = "loan_id,31/01/2022,28/02/2022\n1,5,5\n2,7,7\n";
        let made = "loan_id,31/01/2022,28/02/2022\n1,5,0\n";
        let panel = load_metric_tab(due.as_bytes(), Metric::PaymentDue, None).unwrap();
        let panel = load_metric_tab(made.as_bytes(), Metric::PaymentMade, Some(panel)).unwrap();
        assert_eq!(panel.value(2, Metric::PaymentDue, 1), Some(7.0));
        assert_eq!(panel.value(1, Metric::PaymentMade, 1), Some(0.0));
        assert_eq!(panel.dates()[0], NaiveDate::from_ymd_opt(2022, 1, 31).unwrap());
    }

    #[test]
    fn test_mismatched_tab_dates() {
        let due = "loan_id,2022-01-31\n1,5\n";
        let made = "loan_id,2022-02-28\n1,5\n";
        let panel = load_metric_tab(due.as_bytes(), Metric::PaymentDue, None).unwrap();
        let err = load_metric_tab(made.as_bytes(), Metric::PaymentMade, Some(panel)).unwrap_err();
        assert!(matches!(err, CurveError::InvalidDates { .. }));
    }

    #[test]
    fn test_unknown_metric_label() {
        let text = "loan_id,data,2022-01-31\n1,Arrears,5\n";
        let err = load_panel_from_reader(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Arrears"));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_loan_id("12.0").unwrap(), 12);
        assert_eq!(parse_optional_f64("1,250.5", "x").unwrap(), Some(1250.5));
        assert_eq!(parse_optional_f64(" ", "x").unwrap(), None);
        assert_eq!(
            parse_date("2022-03-31 00:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2022, 3, 31).unwrap()
        );
        assert!(parse_date("March").is_err());
    }
}
