pub mod contracts;
pub mod cost;

pub use contracts::{SupplierQuote, resolve_contract};
pub use cost::{FuelCostBreakdown, estimate_cost, fee_rate, tax_rate};
