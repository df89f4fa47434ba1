//! Static per-loan attributes and derived scalars

mod data;
pub mod loader;

pub use data::{attribute_key, DateAttribute, DerivedScalars, Loan, LoanScalar, StaticTable};
pub use loader::{load_static_table, load_static_table_from_reader};
