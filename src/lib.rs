//! Loan cashflow panel analytics
//!
//! Loads a long-format monthly cashflow panel and a static loan table, derives
//! behavioral metrics in dependency order (seasoning, missed payments, default,
//! recovery, balances), and aggregates them into prepayment (CPR), default
//! (CDR) and recovery curves, optionally split into cohorts.

pub mod config;
pub mod curves;
pub mod derivation;
pub mod error;
pub mod loan;
pub mod panel;
pub mod portfolio;

pub use config::EngineConfig;
pub use curves::{
    build_curve, CurveKind, CurvePoint, CurveSeries, CurveSet, DefaultRate, MetricRatio,
    PrepaymentRate, RecoveryRate,
};
pub use error::{CurveError, CurveResult};
pub use loan::{Loan, StaticTable};
pub use panel::{CashflowPanel, LoanId, Metric};
pub use portfolio::{LoanView, Portfolio};
