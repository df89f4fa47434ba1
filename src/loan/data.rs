use crate::error::{CurveError, CurveResult};
use crate::panel::LoanId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Scalars produced by the derivers and committed onto the loan.
/// `None` means "not applicable", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedScalars {
    pub default_month: Option<NaiveDate>,
    pub last_recovery_month: Option<NaiveDate>,
    pub recovered_amount: Option<f64>,
    pub balance_at_default: Option<f64>,
    pub recovery_percent: Option<f64>,
    pub prepayment_date: Option<NaiveDate>,
}

/// A single derived scalar update, returned by a deriver and applied by the portfolio
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoanScalar {
    DefaultMonth(Option<NaiveDate>),
    LastRecoveryMonth(Option<NaiveDate>),
    RecoveredAmount(Option<f64>),
    BalanceAtDefault(Option<f64>),
    RecoveryPercent(Option<f64>),
    PrepaymentDate(Option<NaiveDate>),
}

/// Canonical attribute key: trimmed, lowercase, spaces read as underscores.
/// Static headers and pivot names both go through this before lookup.
pub fn attribute_key(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(' ', "_")
}

/// Date attributes that can anchor a months-since metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAttribute {
    Origination,
    Reversion,
    SellerPurchase,
    DefaultMonth,
}

/// Static per-loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub origination_date: NaiveDate,
    pub reversion_date: Option<NaiveDate>,
    pub seller_purchase_date: Option<NaiveDate>,
    pub original_balance: f64,
    /// Categorical columns usable as pivots (e.g. product)
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub derived: DerivedScalars,
}

impl Loan {
    pub fn new(loan_id: LoanId, origination_date: NaiveDate, original_balance: f64) -> Self {
        Self {
            loan_id,
            origination_date,
            reversion_date: None,
            seller_purchase_date: None,
            original_balance,
            attributes: BTreeMap::new(),
            derived: DerivedScalars::default(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(attribute_key(name), value.to_string());
        self
    }

    pub fn date(&self, attribute: DateAttribute) -> Option<NaiveDate> {
        match attribute {
            DateAttribute::Origination => Some(self.origination_date),
            DateAttribute::Reversion => self.reversion_date,
            DateAttribute::SellerPurchase => self.seller_purchase_date,
            DateAttribute::DefaultMonth => self.derived.default_month,
        }
    }

    /// Attribute value by name, as written in the static file or already normalized
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&attribute_key(name)).map(String::as_str)
    }

    /// Apply a derived scalar. The default month is terminal: once set it is kept.
    /// Returns false when the update was refused for that reason.
    pub fn apply(&mut self, scalar: LoanScalar) -> bool {
        let derived = &mut self.derived;
        match scalar {
            LoanScalar::DefaultMonth(month) => {
                if derived.default_month.is_some() {
                    return derived.default_month == month;
                }
                derived.default_month = month;
            }
            LoanScalar::LastRecoveryMonth(month) => derived.last_recovery_month = month,
            LoanScalar::RecoveredAmount(amount) => derived.recovered_amount = amount,
            LoanScalar::BalanceAtDefault(amount) => derived.balance_at_default = amount,
            LoanScalar::RecoveryPercent(pct) => derived.recovery_percent = pct,
            LoanScalar::PrepaymentDate(date) => derived.prepayment_date = date,
        }
        true
    }
}

/// Static attribute table keyed by loan id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticTable {
    loans: BTreeMap<LoanId, Loan>,
}

impl StaticTable {
    pub fn new(loans: impl IntoIterator<Item = Loan>) -> Self {
        Self {
            loans: loans.into_iter().map(|loan| (loan.loan_id, loan)).collect(),
        }
    }

    pub fn get(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(&loan_id)
    }

    /// Look up a loan needed by `context`, failing loudly if absent
    pub fn require(&self, loan_id: LoanId, context: &str) -> CurveResult<&Loan> {
        self.get(loan_id)
            .ok_or_else(|| CurveError::unknown_loan(loan_id, context))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    pub fn loan_ids(&self) -> BTreeSet<LoanId> {
        self.loans.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.loans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty()
    }

    /// Categorical attribute names present on at least one loan
    pub fn attribute_names(&self) -> BTreeSet<&str> {
        self.loans
            .values()
            .flat_map(|loan| loan.attributes.keys().map(String::as_str))
            .collect()
    }

    /// Commit a batch of scalar updates; returns how many default months were kept
    /// rather than overwritten
    pub fn apply_all(
        &mut self,
        updates: impl IntoIterator<Item = (LoanId, LoanScalar)>,
    ) -> CurveResult<usize> {
        let mut refused = 0;
        for (loan_id, scalar) in updates {
            let loan = self
                .loans
                .get_mut(&loan_id)
                .ok_or_else(|| CurveError::unknown_loan(loan_id, "scalar commit"))?;
            if !loan.apply(scalar) {
                refused += 1;
            }
        }
        Ok(refused)
    }
}
