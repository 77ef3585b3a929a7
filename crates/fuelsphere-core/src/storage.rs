use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    ContractQuery, FlightFuelRequirement, FuelDelivery, FuelOrder, FuelingOperation,
    InventoryTransaction, StorageFacility, Supplier, SupplierContract,
};

/// Entry point to a transactional store holding the operations documents.
///
/// Every service operation runs inside exactly one transaction obtained from
/// [`OperationsStore::begin`]. Dropping a transaction without calling
/// [`StoreTx::commit`] must discard all of its writes.
#[async_trait]
pub trait OperationsStore: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One unit of work against the store.
///
/// Methods named `*_for_update` lock the returned row until the transaction
/// ends. Concurrent transactions touching the same row are serialized by that
/// lock, which is what keeps the inventory ledger linear per facility.
#[async_trait]
pub trait StoreTx: Send {
    async fn commit(self) -> Result<(), StoreError>;

    /// Advances the counter for `scope` and returns `max(previous + 1, floor)`.
    /// A scope seen for the first time yields `floor`.
    async fn next_sequence(&mut self, scope: &str, floor: i64) -> Result<i64, StoreError>;

    // requirements

    async fn insert_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError>;
    async fn requirement(&mut self, id: Uuid)
    -> Result<Option<FlightFuelRequirement>, StoreError>;
    async fn requirement_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FlightFuelRequirement>, StoreError>;
    async fn update_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError>;

    // orders

    async fn insert_order(&mut self, order: &FuelOrder) -> Result<(), StoreError>;
    async fn order(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError>;
    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError>;
    async fn update_order(&mut self, order: &FuelOrder) -> Result<(), StoreError>;
    async fn orders_for_requirement(
        &mut self,
        requirement_id: Uuid,
    ) -> Result<Vec<FuelOrder>, StoreError>;

    // deliveries

    async fn insert_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError>;
    async fn delivery_for_update(&mut self, id: Uuid) -> Result<Option<FuelDelivery>, StoreError>;
    async fn update_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError>;
    async fn deliveries_for_order(&mut self, order_id: Uuid)
    -> Result<Vec<FuelDelivery>, StoreError>;

    // fueling operations

    async fn insert_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError>;
    async fn operation_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FuelingOperation>, StoreError>;
    async fn update_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError>;

    // storage facilities and their ledger

    async fn insert_facility(&mut self, facility: &StorageFacility) -> Result<(), StoreError>;
    async fn facility(&mut self, id: Uuid) -> Result<Option<StorageFacility>, StoreError>;
    async fn facility_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<StorageFacility>, StoreError>;
    async fn set_facility_level(&mut self, id: Uuid, level: Decimal) -> Result<(), StoreError>;
    /// Facilities at `airport_id` holding `fuel_type_id` with `is_operational = true`.
    async fn operational_facilities(
        &mut self,
        airport_id: &str,
        fuel_type_id: &str,
    ) -> Result<Vec<StorageFacility>, StoreError>;
    async fn insert_inventory_transaction(
        &mut self,
        transaction: &InventoryTransaction,
    ) -> Result<(), StoreError>;
    /// Ledger entries of one facility in the order they were posted.
    async fn inventory_transactions(
        &mut self,
        facility_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>, StoreError>;

    // suppliers and contracts

    async fn insert_supplier(&mut self, supplier: &Supplier) -> Result<(), StoreError>;
    async fn supplier(&mut self, id: Uuid) -> Result<Option<Supplier>, StoreError>;
    async fn insert_contract(&mut self, contract: &SupplierContract) -> Result<(), StoreError>;
    /// Contracts satisfying [`ContractQuery::matches`], in no particular order.
    async fn matching_contracts(
        &mut self,
        query: &ContractQuery,
    ) -> Result<Vec<SupplierContract>, StoreError>;
}
