use fuelsphere_core::{
    InventoryTransaction, InventoryTransactionType, OperationsStore, OpsError, OpsResult,
    StorageFacility, StoreTx,
};
use fuelsphere_inventory as inventory;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::OperationsService;

const OPENING_BALANCE_REF: &str = "OPENING-BALANCE";

#[derive(Debug, Clone)]
pub struct NewFacility {
    pub name: String,
    pub airport_id: String,
    pub fuel_type_id: String,
    pub capacity: Option<Decimal>,
    pub initial_level: Decimal,
    pub is_operational: bool,
}

/// Outcome of replaying a facility's ledger against its stored level.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LedgerReport {
    pub facility_id: Uuid,
    pub entries: usize,
    pub closing_balance: Option<Decimal>,
    pub current_level: Decimal,
    pub consistent: bool,
    pub problem: Option<String>,
}

impl<S: OperationsStore> OperationsService<S> {
    /// Registers a storage facility. A non-zero initial level is booked as an
    /// opening ADJUSTMENT so the level is always backed by the ledger.
    pub async fn register_facility(&self, new: NewFacility) -> OpsResult<StorageFacility> {
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(OpsError::Invalid("name is required".to_string()));
        }
        if new.initial_level < Decimal::ZERO {
            return Err(OpsError::Invalid(
                "initial_level cannot be negative".to_string(),
            ));
        }
        if new.capacity.is_some_and(|capacity| new.initial_level > capacity) {
            return Err(OpsError::Invalid(
                "initial_level exceeds capacity".to_string(),
            ));
        }

        let mut facility = StorageFacility {
            id: Uuid::new_v4(),
            name,
            airport_id: new.airport_id.trim().to_ascii_uppercase(),
            fuel_type_id: new.fuel_type_id.trim().to_string(),
            capacity: new.capacity,
            current_level: Some(Decimal::ZERO),
            is_operational: new.is_operational,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_facility(&facility).await?;
        if !new.initial_level.is_zero() {
            inventory::post(
                &mut tx,
                facility.id,
                InventoryTransactionType::Adjustment,
                new.initial_level,
                OPENING_BALANCE_REF,
            )
            .await?;
            facility.current_level = Some(new.initial_level);
        }
        tx.commit().await?;

        info!(
            facility_id = %facility.id,
            airport = %facility.airport_id,
            level = %facility.level(),
            "storage facility registered"
        );
        Ok(facility)
    }

    /// Ledger of one facility in posting order.
    pub async fn facility_transactions(
        &self,
        facility_id: Uuid,
    ) -> OpsResult<Vec<InventoryTransaction>> {
        let mut tx = self.store.begin().await?;
        tx.facility(facility_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Storage facility", facility_id))?;
        Ok(tx.inventory_transactions(facility_id).await?)
    }

    /// Replays the ledger of one facility and compares the closing balance with
    /// the stored level. An empty ledger is consistent with a zero level.
    pub async fn verify_facility_ledger(&self, facility_id: Uuid) -> OpsResult<LedgerReport> {
        let mut tx = self.store.begin().await?;
        let facility = tx
            .facility(facility_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Storage facility", facility_id))?;
        let entries = tx.inventory_transactions(facility_id).await?;
        let current_level = facility.level();

        let (closing_balance, problem) = match inventory::verify_chain(&entries) {
            Ok(closing) if closing.unwrap_or(Decimal::ZERO) == current_level => (closing, None),
            Ok(closing) => (
                closing,
                Some(format!(
                    "ledger closes at {} but facility level is {current_level}",
                    closing.unwrap_or(Decimal::ZERO)
                )),
            ),
            Err(err) => (None, Some(err.to_string())),
        };

        if let Some(problem) = &problem {
            warn!(%facility_id, problem = %problem, "facility ledger inconsistent");
        }

        Ok(LedgerReport {
            facility_id,
            entries: entries.len(),
            closing_balance,
            current_level,
            consistent: problem.is_none(),
            problem,
        })
    }
}
