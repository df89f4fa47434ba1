//! Portfolio of outstanding loans: owner of the panel and static table
//!
//! Derivations are computed by the pure functions in [`crate::derivation`] and
//! committed here. `add_*` always recomputes; [`Portfolio::ensure`] reuses a
//! metric already produced in this session and only computes what is missing.

use crate::config::EngineConfig;
use crate::curves::{build_curve, CurveKind, CurveSet};
use crate::derivation::{self, Derivation};
use crate::error::{CurveError, CurveResult};
use crate::loan::{DateAttribute, Loan, LoanScalar, StaticTable};
use crate::panel::{CashflowPanel, LoanId, Metric, Series};
use std::collections::{BTreeMap, BTreeSet};

/// One loan of the panel/static outer join.
/// Either side may be absent for loans present in only one table.
#[derive(Debug, Clone)]
pub struct LoanView<'a> {
    pub loan_id: LoanId,
    pub loan: Option<&'a Loan>,
    pub rows: BTreeMap<Metric, &'a Series>,
}

impl LoanView<'_> {
    pub fn value(&self, metric: Metric, month: usize) -> Option<f64> {
        self.rows
            .get(&metric)
            .and_then(|series| series.get(month).copied().flatten())
    }
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    panel: CashflowPanel,
    statics: StaticTable,
    config: EngineConfig,
    /// Metrics computed (not loaded) in this session
    derived: BTreeSet<Metric>,
}

impl Portfolio {
    pub fn new(panel: CashflowPanel, statics: StaticTable) -> Self {
        Self::with_config(panel, statics, EngineConfig::default())
    }

    pub fn with_config(panel: CashflowPanel, statics: StaticTable, config: EngineConfig) -> Self {
        let static_ids = statics.loan_ids();
        let orphans = panel
            .loan_ids()
            .into_iter()
            .filter(|id| !static_ids.contains(id))
            .count();
        if orphans > 0 {
            log::warn!("{orphans} panel loans have no static record");
        }
        Self {
            panel,
            statics,
            config,
            derived: BTreeSet::new(),
        }
    }

    pub fn panel(&self) -> &CashflowPanel {
        &self.panel
    }

    pub fn static_table(&self) -> &StaticTable {
        &self.statics
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn date_columns(&self) -> impl Iterator<Item = chrono::NaiveDate> + '_ {
        self.panel.date_columns()
    }

    /// Outer join of panel and static table on loan id
    pub fn all_data(&self) -> Vec<LoanView<'_>> {
        let mut ids = self.panel.loan_ids();
        ids.extend(self.statics.loan_ids());
        ids.into_iter()
            .map(|loan_id| LoanView {
                loan_id,
                loan: self.statics.get(loan_id),
                rows: self
                    .panel
                    .metrics()
                    .filter_map(|m| self.panel.row(loan_id, m).map(|row| (m, row)))
                    .collect(),
            })
            .collect()
    }

    fn commit(&mut self, derivation: Derivation) -> CurveResult<()> {
        for rows in derivation.rows {
            let metric = rows.metric;
            log::debug!("Committing {} rows of {metric}", rows.len());
            self.panel.add_metric(rows)?;
            self.derived.insert(metric);
        }
        let kept = self.statics.apply_all(derivation.scalars)?;
        if kept > 0 {
            log::debug!("Kept {kept} previously recorded default months");
        }
        Ok(())
    }

    /// Metrics whose derivation also commits loan scalars; reusing them is only
    /// safe when they were computed in this session
    fn carries_scalars(metric: Metric) -> bool {
        matches!(
            metric,
            Metric::IsDefaultMonth | Metric::IsRecoveryPayment | Metric::BalanceAtDefault
        )
    }

    pub fn is_resolved(&self, metric: Metric) -> bool {
        self.panel.contains(metric)
            && (!Self::carries_scalars(metric) || self.derived.contains(&metric))
    }

    /// Make `metric` available, computing it (and its dependencies) only if needed
    pub fn ensure(&mut self, metric: Metric) -> CurveResult<()> {
        if self.is_resolved(metric) {
            log::debug!("Reusing {metric}");
            return Ok(());
        }
        if metric.is_raw() {
            return Err(CurveError::missing_metric(metric));
        }
        log::debug!("Computing {metric}");
        match metric {
            Metric::Seasoning => self.add_seasoning().map(drop),
            Metric::PaymentMadeVsDue => self.add_payment_made_vs_due().map(drop),
            Metric::MissingPayments => self.add_n_missing_payments().map(drop),
            Metric::IsDefaultMonth => self.add_default_month().map(drop),
            Metric::IsRecoveryPayment => self.add_is_recovery_payment().map(drop),
            Metric::IsActive => self.add_is_active().map(drop),
            Metric::CurrentBalance => self.add_current_balance().map(drop),
            Metric::CumulativeRecovery => self.add_cumulative_recovery().map(drop),
            Metric::TimeSinceDefault => self.add_time_since_default().map(drop),
            Metric::TimeSinceReversion => self.add_time_since_reversion().map(drop),
            Metric::IsPostSellerPurchase => self.add_is_post_seller_purchase().map(drop),
            Metric::BalanceAtDefault => self.add_exposure_at_default().map(drop),
            Metric::MonthEndBalance | Metric::PaymentDue | Metric::PaymentMade => {
                Err(CurveError::missing_metric(metric))
            }
        }
    }

    fn add_months_since(&mut self, metric: Metric, anchor: DateAttribute) -> CurveResult<&CashflowPanel> {
        let rows = derivation::months_since(&self.panel, &self.statics, metric, anchor, &self.config)?;
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    /// Months since origination
    pub fn add_seasoning(&mut self) -> CurveResult<&CashflowPanel> {
        self.add_months_since(Metric::Seasoning, DateAttribute::Origination)
    }

    pub fn add_time_since_reversion(&mut self) -> CurveResult<&CashflowPanel> {
        self.add_months_since(Metric::TimeSinceReversion, DateAttribute::Reversion)
    }

    pub fn add_time_since_default(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::IsDefaultMonth)?;
        self.add_months_since(Metric::TimeSinceDefault, DateAttribute::DefaultMonth)
    }

    pub fn add_payment_made_vs_due(&mut self) -> CurveResult<&CashflowPanel> {
        let rows = derivation::payment_made_vs_due(&self.panel)?;
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    pub fn add_n_missing_payments(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::PaymentMadeVsDue)?;
        let made_vs_due = self.panel.require(Metric::PaymentMadeVsDue)?;
        let rows = derivation::missing_payments(made_vs_due, &self.config);
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    pub fn add_default_month(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::PaymentMadeVsDue)?;
        let made_vs_due = self.panel.require(Metric::PaymentMadeVsDue)?;
        let derivation =
            derivation::default_months(&self.panel, made_vs_due, &self.statics, &self.config)?;
        let defaults = derivation
            .scalars
            .iter()
            .filter(|(_, s)| matches!(s, LoanScalar::DefaultMonth(Some(_))))
            .count();
        self.commit(derivation)?;
        log::info!("Default detection: {defaults} new defaults");
        Ok(&self.panel)
    }

    pub fn add_is_recovery_payment(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::IsDefaultMonth)?;
        let derivation = derivation::recovery_payments(&self.panel, &self.statics, &self.config)?;
        self.commit(derivation)?;
        Ok(&self.panel)
    }

    pub fn add_cumulative_recovery(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::IsRecoveryPayment)?;
        let rows = derivation::cumulative_recovery(&self.panel)?;
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    pub fn add_is_active(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::IsDefaultMonth)?;
        let rows = derivation::is_active(&self.panel, &self.statics);
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    /// Current balance, floored per the engine configuration
    pub fn add_current_balance(&mut self) -> CurveResult<&CashflowPanel> {
        let floor = self.config.floor_current_balance;
        self.add_current_balance_with(floor)
    }

    pub fn add_current_balance_with(&mut self, floor: bool) -> CurveResult<&CashflowPanel> {
        let rows = derivation::current_balance(&self.panel, &self.statics, floor)?;
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    /// Balance at default (scalar + broadcast row)
    pub fn add_exposure_at_default(&mut self) -> CurveResult<&CashflowPanel> {
        self.ensure(Metric::IsDefaultMonth)?;
        let derivation = derivation::exposure_at_default(&self.panel, &self.statics)?;
        self.commit(derivation)?;
        Ok(&self.panel)
    }

    pub fn add_is_post_seller_purchase(&mut self) -> CurveResult<&CashflowPanel> {
        let rows = derivation::post_seller_purchase(&self.panel, &self.statics);
        self.commit(Derivation::from_rows(rows))?;
        Ok(&self.panel)
    }

    /// Recovery percent; only touches the static table
    pub fn add_recovery_percent(&mut self) -> CurveResult<&StaticTable> {
        self.ensure(Metric::IsRecoveryPayment)?;
        self.ensure(Metric::BalanceAtDefault)?;
        let derivation = derivation::recovery_percent(&self.statics);
        self.commit(derivation)?;
        Ok(&self.statics)
    }

    /// Prepayment date; only touches the static table
    pub fn add_prepayment_date(&mut self) -> CurveResult<&StaticTable> {
        let derivation = derivation::prepayment_dates(&self.panel, &self.statics, &self.config)?;
        self.commit(derivation)?;
        Ok(&self.statics)
    }

    /// Run every deriver in dependency order
    pub fn derive_all(&mut self) -> CurveResult<()> {
        self.add_seasoning()?;
        self.add_payment_made_vs_due()?;
        self.add_n_missing_payments()?;
        self.add_default_month()?;
        self.add_is_recovery_payment()?;
        self.add_is_post_seller_purchase()?;
        self.add_time_since_reversion()?;
        self.add_time_since_default()?;
        self.add_is_active()?;
        self.add_current_balance()?;
        self.add_cumulative_recovery()?;
        self.add_exposure_at_default()?;
        self.add_recovery_percent()?;
        self.add_prepayment_date()?;
        log::info!(
            "Derived {} metrics for {} loans",
            self.derived.len(),
            self.statics.len()
        );
        Ok(())
    }

    /// Resolve the curve's metrics, then aggregate
    pub fn curve(
        &mut self,
        kind: &dyn CurveKind,
        index: Metric,
        pivots: &[&str],
        filter_index_nonnegative: bool,
    ) -> CurveResult<CurveSet> {
        self.ensure(index)?;
        for metric in kind.required_metrics() {
            self.ensure(metric)?;
        }
        build_curve(self, kind, index, pivots, filter_index_nonnegative)
    }
}
