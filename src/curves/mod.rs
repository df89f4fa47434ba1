//! Curve aggregation
//!
//! A curve is a ratio of summed loan-month contributions grouped by an index
//! metric (seasoning, time since default), optionally split into cohorts by
//! static attributes. Concrete curves only say what each loan-month contributes.

mod framework;
mod kinds;
pub mod report;

pub use framework::{build_curve, CurveKind, CurvePoint, CurveSeries, CurveSet, LoanMonth};
pub use kinds::{DefaultRate, MetricRatio, PrepaymentRate, RecoveryRate};
pub use report::{save_curve, write_curve_csv, write_curve_json};
