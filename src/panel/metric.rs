//! Metric identities carried by the cashflow panel

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row kind of the long-format panel.
///
/// The first three variants are raw inputs supplied by ingestion; every other
/// variant is produced by a deriver and can be rebuilt from the raw ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    MonthEndBalance,
    PaymentDue,
    PaymentMade,
    Seasoning,
    PaymentMadeVsDue,
    MissingPayments,
    IsDefaultMonth,
    IsRecoveryPayment,
    IsActive,
    CurrentBalance,
    CumulativeRecovery,
    TimeSinceDefault,
    TimeSinceReversion,
    IsPostSellerPurchase,
    BalanceAtDefault,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::MonthEndBalance,
        Metric::PaymentDue,
        Metric::PaymentMade,
        Metric::Seasoning,
        Metric::PaymentMadeVsDue,
        Metric::MissingPayments,
        Metric::IsDefaultMonth,
        Metric::IsRecoveryPayment,
        Metric::IsActive,
        Metric::CurrentBalance,
        Metric::CumulativeRecovery,
        Metric::TimeSinceDefault,
        Metric::TimeSinceReversion,
        Metric::IsPostSellerPurchase,
        Metric::BalanceAtDefault,
    ];

    /// Human readable label used in input files and output tables
    pub fn label(self) -> &'static str {
        match self {
            Metric::MonthEndBalance => "Month End Balance",
            Metric::PaymentDue => "Payment Due",
            Metric::PaymentMade => "Payment Made",
            Metric::Seasoning => "Seasoning",
            Metric::PaymentMadeVsDue => "Payment Made vs Due",
            Metric::MissingPayments => "N missing payments",
            Metric::IsDefaultMonth => "Is Default Month",
            Metric::IsRecoveryPayment => "Is Recovery Payment",
            Metric::IsActive => "Is Active",
            Metric::CurrentBalance => "Current Balance",
            Metric::CumulativeRecovery => "Cumulative Recovery",
            Metric::TimeSinceDefault => "Time Since Default",
            Metric::TimeSinceReversion => "Time Since Reversion",
            Metric::IsPostSellerPurchase => "Is Post Seller Purchase",
            Metric::BalanceAtDefault => "Balance At Default",
        }
    }

    /// Raw metrics come from ingestion and cannot be derived
    pub fn is_raw(self) -> bool {
        matches!(
            self,
            Metric::MonthEndBalance | Metric::PaymentDue | Metric::PaymentMade
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Case-insensitive match on the label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown metric {wanted:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_parse_back() {
        for metric in Metric::ALL {
            assert_eq!(metric.label().parse::<Metric>().unwrap(), metric);
        }
        assert_eq!(
            "month end balance".parse::<Metric>().unwrap(),
            Metric::MonthEndBalance
        );
        assert!("Payment Late".parse::<Metric>().is_err());
    }

    #[test]
    fn test_raw_metrics() {
        let raw: Vec<_> = Metric::ALL.iter().filter(|m| m.is_raw()).collect();
        assert_eq!(raw.len(), 3);
        assert!(!Metric::Seasoning.is_raw());
    }
}
