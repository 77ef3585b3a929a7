//! Per-facility fuel stock and its append-only ledger.
//!
//! Every stock movement goes through [`post`], which reads the facility under
//! its row lock, appends one [`InventoryTransaction`] and writes the new level
//! back, all inside the caller's transaction. Posts to the same facility are
//! therefore applied one after another and each entry's `balance_before`
//! equals the previous entry's `balance_after`.

use chrono::Utc;
use fuelsphere_core::{
    DocumentKind, InventoryTransaction, InventoryTransactionType, OpsError, OpsResult, StoreTx,
    next_document_number,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Balances of a single ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub balance_before: Decimal,
    pub volume: Decimal,
    pub balance_after: Decimal,
}

impl Movement {
    /// Fails when the resulting balance leaves the representable range.
    pub fn apply(balance_before: Decimal, volume: Decimal) -> OpsResult<Self> {
        let balance_after = balance_before.checked_add(volume).ok_or_else(|| {
            OpsError::Invalid(format!(
                "ledger balance out of range: {balance_before} + {volume}"
            ))
        })?;
        Ok(Self {
            balance_before,
            volume,
            balance_after,
        })
    }
}

/// Posts a signed `volume` against a facility.
///
/// Returns `Ok(None)` without touching anything when the facility does not
/// exist; stock updates are best effort with respect to missing facilities.
pub async fn post<T: StoreTx>(
    tx: &mut T,
    facility_id: Uuid,
    transaction_type: InventoryTransactionType,
    volume: Decimal,
    reference_doc: &str,
) -> OpsResult<Option<InventoryTransaction>> {
    let Some(facility) = tx.facility_for_update(facility_id).await? else {
        debug!(%facility_id, reference_doc, "facility missing, inventory post skipped");
        return Ok(None);
    };

    let now = Utc::now();
    let movement = Movement::apply(facility.level(), volume)?;
    let transaction = InventoryTransaction {
        id: Uuid::new_v4(),
        transaction_number: next_document_number(tx, DocumentKind::Inventory, now).await?,
        storage_facility_id: facility_id,
        transaction_type,
        volume: movement.volume,
        balance_before: movement.balance_before,
        balance_after: movement.balance_after,
        reference_doc: reference_doc.to_string(),
        transaction_date: now,
    };

    tx.insert_inventory_transaction(&transaction).await?;
    tx.set_facility_level(facility_id, movement.balance_after)
        .await?;

    debug!(
        transaction_number = %transaction.transaction_number,
        %facility_id,
        transaction_type = %transaction_type,
        volume = %volume,
        balance_after = %movement.balance_after,
        "inventory posted"
    );

    Ok(Some(transaction))
}

/// Total stock held by operational facilities at an airport for one fuel type.
pub async fn available_fuel<T: StoreTx>(
    tx: &mut T,
    airport_id: &str,
    fuel_type_id: &str,
) -> OpsResult<Decimal> {
    let facilities = tx.operational_facilities(airport_id, fuel_type_id).await?;
    facilities
        .iter()
        .try_fold(Decimal::ZERO, |total, facility| {
            total.checked_add(facility.level())
        })
        .ok_or_else(|| {
            OpsError::Invalid(format!(
                "available {fuel_type_id} at {airport_id} exceeds the representable volume"
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{transaction_number}: balance_after does not equal balance_before + volume")]
    Unbalanced { transaction_number: String },

    #[error("{transaction_number}: opens at {found}, previous entry closed at {expected}")]
    Broken {
        transaction_number: String,
        expected: Decimal,
        found: Decimal,
    },
}

/// Checks a facility's entries, in posting order, for arithmetic and chain
/// continuity. Returns the closing balance, or `None` for an empty ledger.
pub fn verify_chain(entries: &[InventoryTransaction]) -> Result<Option<Decimal>, LedgerError> {
    let mut closing: Option<Decimal> = None;

    for entry in entries {
        if entry.balance_before.checked_add(entry.volume) != Some(entry.balance_after) {
            return Err(LedgerError::Unbalanced {
                transaction_number: entry.transaction_number.clone(),
            });
        }
        match closing {
            Some(expected) if expected != entry.balance_before => {
                return Err(LedgerError::Broken {
                    transaction_number: entry.transaction_number.clone(),
                    expected,
                    found: entry.balance_before,
                });
            }
            _ => {}
        }
        closing = Some(entry.balance_after);
    }

    Ok(closing)
}
