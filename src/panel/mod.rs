//! Cashflow panel: per-loan, per-metric monthly value grid

mod metric;
mod store;
pub mod loader;

pub use metric::Metric;
pub use store::{CashflowPanel, LoanId, MetricRows, Series};
pub use loader::{load_metric_tab, load_panel, load_panel_from_reader};
