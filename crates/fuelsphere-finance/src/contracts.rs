use std::cmp::Ordering;

use chrono::NaiveDate;
use fuelsphere_core::{
    ContractQuery, DEFAULT_CURRENCY, OpsError, OpsResult, StoreTx, SupplierContract,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const UNKNOWN_SUPPLIER: &str = "Unknown";

/// Best supplier offer for a requested volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierQuote {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub contract_id: Uuid,
    pub price_per_liter: Decimal,
    pub estimated_total: Decimal,
    pub currency: String,
}

/// Candidate ordering: cheapest first, then the longest-standing contract,
/// then contract id so the pick never depends on backend row order.
fn by_preference(a: &SupplierContract, b: &SupplierContract) -> Ordering {
    a.price_per_liter
        .cmp(&b.price_per_liter)
        .then_with(|| a.valid_from.cmp(&b.valid_from))
        .then_with(|| a.id.cmp(&b.id))
}

/// Picks the cheapest active contract for `fuel_type_id` that is valid on
/// `as_of` and whose volume band contains `volume`.
pub async fn resolve_contract<T: StoreTx>(
    tx: &mut T,
    fuel_type_id: &str,
    volume: Decimal,
    as_of: NaiveDate,
) -> OpsResult<Option<SupplierQuote>> {
    let query = ContractQuery {
        fuel_type_id: fuel_type_id.to_string(),
        volume,
        as_of,
    };

    let candidates = tx.matching_contracts(&query).await?;
    debug!(fuel_type_id, %volume, %as_of, candidates = candidates.len(), "contract candidates");

    let Some(best) = candidates.into_iter().min_by(by_preference) else {
        return Ok(None);
    };

    let estimated_total = best.price_per_liter.checked_mul(volume).ok_or_else(|| {
        OpsError::Invalid(format!(
            "estimated total out of range: {} x {volume}",
            best.price_per_liter
        ))
    })?;

    let supplier_name = tx
        .supplier(best.supplier_id)
        .await?
        .map(|supplier| supplier.name)
        .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string());

    Ok(Some(SupplierQuote {
        supplier_id: best.supplier_id,
        supplier_name,
        contract_id: best.id,
        price_per_liter: best.price_per_liter,
        estimated_total,
        currency: best
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    }))
}
