use chrono::Utc;
use fuelsphere_core::{
    DocumentKind, FuelingOperation, InventoryTransaction, InventoryTransactionType,
    OperationStatus, OperationsStore, OpsError, OpsResult, StoreTx, next_document_number,
};
use fuelsphere_inventory as inventory;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::OperationsService;

#[derive(Debug, Clone, Default)]
pub struct NewOperation {
    pub storage_facility_id: Option<Uuid>,
    pub aircraft_registration: Option<String>,
}

/// Result of completing a fueling operation.
#[derive(Debug, Clone)]
pub struct FuelingOutcome {
    pub operation: FuelingOperation,
    /// The DISPENSE entry, when the operation draws from a known facility.
    pub ledger_entry: Option<InventoryTransaction>,
}

impl<S: OperationsStore> OperationsService<S> {
    pub async fn create_operation(&self, new: NewOperation) -> OpsResult<FuelingOperation> {
        let mut tx = self.store.begin().await?;

        if let Some(facility_id) = new.storage_facility_id {
            tx.facility(facility_id)
                .await?
                .ok_or_else(|| OpsError::not_found("Storage facility", facility_id))?;
        }

        let operation = FuelingOperation {
            id: Uuid::new_v4(),
            operation_number: next_document_number(&mut tx, DocumentKind::Operation, Utc::now())
                .await?,
            storage_facility_id: new.storage_facility_id,
            aircraft_registration: new
                .aircraft_registration
                .map(|r| r.trim().to_ascii_uppercase()),
            status: OperationStatus::Pending,
            start_time: None,
            end_time: None,
            volume_dispensed: None,
        };

        tx.insert_operation(&operation).await?;
        tx.commit().await?;

        info!(operation_number = %operation.operation_number, "fueling operation created");
        Ok(operation)
    }

    pub async fn start_fueling(&self, id: Uuid) -> OpsResult<FuelingOperation> {
        let mut tx = self.store.begin().await?;
        let mut operation = load_operation(&mut tx, id).await?;

        operation.status = OperationStatus::InProgress;
        operation.start_time = Some(Utc::now());
        tx.update_operation(&operation).await?;
        tx.commit().await?;

        info!(operation_number = %operation.operation_number, "fueling started");
        Ok(operation)
    }

    /// Completes an operation and, when it draws from a storage facility,
    /// dispenses `volume_dispensed` from that facility's ledger in the same
    /// transaction.
    pub async fn complete_fueling(
        &self,
        id: Uuid,
        volume_dispensed: Decimal,
    ) -> OpsResult<FuelingOutcome> {
        let mut tx = self.store.begin().await?;
        let mut operation = load_operation(&mut tx, id).await?;

        operation.status = OperationStatus::Completed;
        operation.volume_dispensed = Some(volume_dispensed);
        operation.end_time = Some(Utc::now());
        tx.update_operation(&operation).await?;

        let ledger_entry = match operation.storage_facility_id {
            Some(facility_id) => {
                inventory::post(
                    &mut tx,
                    facility_id,
                    InventoryTransactionType::Dispense,
                    -volume_dispensed,
                    &operation.operation_number,
                )
                .await?
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            operation_number = %operation.operation_number,
            volume = %volume_dispensed,
            posted = ledger_entry.is_some(),
            "fueling completed"
        );
        Ok(FuelingOutcome {
            operation,
            ledger_entry,
        })
    }
}

async fn load_operation<T: StoreTx>(tx: &mut T, id: Uuid) -> OpsResult<FuelingOperation> {
    tx.operation_for_update(id)
        .await?
        .ok_or_else(|| OpsError::not_found("Operation", id))
}
