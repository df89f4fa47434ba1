//! Static per-loan attribute table loading from CSV
//!
//! Required columns: `loan_id`, `origination_date`, `original_balance`.
//! Optional: `reversion_date`, `seller_purchase_date`.
//! Every other column is kept as a categorical attribute.
//! Header names are matched case-insensitively with spaces read as underscores.

use super::{attribute_key, Loan, StaticTable};
use crate::error::{CurveError, CurveResult};
use crate::panel::loader::{parse_date, parse_loan_id, parse_optional_f64};
use csv::ReaderBuilder;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Load the static table from a file
pub fn load_static_table(path: &Path) -> CurveResult<StaticTable> {
    let table = load_static_table_from_reader(File::open(path)?)?;
    log::info!("Loaded {} static records from {}", table.len(), path.display());
    Ok(table)
}

/// Load the static table from any reader
pub fn load_static_table_from_reader<R: Read>(reader: R) -> CurveResult<StaticTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(attribute_key).collect();
    let column = |name: &str| -> CurveResult<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CurveError::parse("static table header", name))
    };
    let id_col = column("loan_id")?;
    let orig_col = column("origination_date")?;
    let balance_col = column("original_balance")?;
    let reversion_col = headers.iter().position(|h| h == "reversion_date");
    let purchase_col = headers.iter().position(|h| h == "seller_purchase_date");

    let mut loans = Vec::new();
    let mut seen = BTreeSet::new();
    let mut duplicates = 0usize;
    for result in rdr.records() {
        let record = result?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        let optional_date = |idx: Option<usize>| -> CurveResult<_> {
            match idx.map(cell) {
                Some(raw) if !raw.is_empty() => parse_date(raw).map(Some),
                _ => Ok(None),
            }
        };

        let loan_id = parse_loan_id(cell(id_col))?;
        if !seen.insert(loan_id) {
            duplicates += 1;
        }
        let original_balance = parse_optional_f64(cell(balance_col), "original_balance")?
            .ok_or_else(|| CurveError::parse("original_balance", format!("loan {loan_id}")))?;
        let mut loan = Loan::new(loan_id, parse_date(cell(orig_col))?, original_balance);
        loan.reversion_date = optional_date(reversion_col)?;
        loan.seller_purchase_date = optional_date(purchase_col)?;

        for (idx, name) in headers.iter().enumerate() {
            let reserved = [Some(id_col), Some(orig_col), Some(balance_col), reversion_col, purchase_col];
            if reserved.contains(&Some(idx)) {
                continue;
            }
            let value = cell(idx);
            if !value.is_empty() {
                loan.attributes.insert(name.clone(), value.to_string());
            }
        }
        loans.push(loan);
    }

    if duplicates > 0 {
        log::warn!("{duplicates} repeated loan ids in static table; the last row of each wins");
    }
    Ok(StaticTable::new(loans))
}
