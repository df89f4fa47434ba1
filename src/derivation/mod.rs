//! Sequential metric derivers
//!
//! Every deriver is a pure function of the committed panel and static table.
//! It returns new panel rows and/or scalar updates in a [`Derivation`]; the
//! [`Portfolio`](crate::Portfolio) commits them.

mod seasoning;
mod payments;
mod default;
mod recovery;
mod balance;

pub use seasoning::{months_between, months_since};
pub use payments::{is_missed, missing_payments, payment_made_vs_due};
pub use default::{default_months, detect_default};
pub use recovery::{cumulative_recovery, exposure_at_default, recovery_payments, recovery_percent};
pub use balance::{current_balance, is_active, post_seller_purchase, prepayment_dates};

use crate::loan::LoanScalar;
use crate::panel::{LoanId, MetricRows};

/// Result of one deriver: rows to add to the panel and scalars to set on loans
#[derive(Debug, Clone, Default)]
pub struct Derivation {
    pub rows: Vec<MetricRows>,
    pub scalars: Vec<(LoanId, LoanScalar)>,
}

impl Derivation {
    pub fn from_rows(rows: MetricRows) -> Self {
        Self {
            rows: vec![rows],
            scalars: Vec::new(),
        }
    }
}
