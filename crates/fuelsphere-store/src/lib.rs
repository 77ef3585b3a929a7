pub mod conformance;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fuelsphere_core::{
    ContractQuery, FlightFuelRequirement, FuelDelivery, FuelOrder, FuelingOperation,
    InventoryTransaction, OperationsStore, StorageFacility, StoreError, StoreTx, Supplier,
    SupplierContract,
};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    requirements: HashMap<Uuid, FlightFuelRequirement>,
    orders: HashMap<Uuid, FuelOrder>,
    deliveries: HashMap<Uuid, FuelDelivery>,
    operations: HashMap<Uuid, FuelingOperation>,
    facilities: HashMap<Uuid, StorageFacility>,
    inventory: Vec<InventoryTransaction>,
    suppliers: HashMap<Uuid, Supplier>,
    contracts: HashMap<Uuid, SupplierContract>,
    sequences: HashMap<String, i64>,
}

/// Process-local store for tests and local runs.
///
/// Transactions are serialized: `begin` takes the store-wide lock and works on
/// a private copy of the tables, `commit` publishes the copy. A transaction
/// dropped without commit leaves the store untouched.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl OperationsStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTx { guard, staged })
    }
}

fn insert_unique<T>(
    table: &mut HashMap<Uuid, T>,
    name: &'static str,
    id: Uuid,
    row: T,
) -> Result<(), StoreError> {
    if table.contains_key(&id) {
        return Err(StoreError::Backend(format!(
            "duplicate key {id} in {name}"
        )));
    }
    table.insert(id, row);
    Ok(())
}

fn replace_existing<T>(
    table: &mut HashMap<Uuid, T>,
    name: &'static str,
    id: Uuid,
    row: T,
) -> Result<(), StoreError> {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(StoreError::Missing { table: name, id }),
    }
}

fn ensure_unique_number<'a, T: 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    number_of: impl Fn(&T) -> &str,
    number: &str,
    name: &'static str,
) -> Result<(), StoreError> {
    if rows.into_iter().any(|row| number_of(row) == number) {
        return Err(StoreError::Backend(format!(
            "duplicate document number {number} in {name}"
        )));
    }
    Ok(())
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn commit(self) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn next_sequence(&mut self, scope: &str, floor: i64) -> Result<i64, StoreError> {
        let next = match self.staged.sequences.get(scope) {
            Some(previous) => (previous + 1).max(floor),
            None => floor,
        };
        self.staged.sequences.insert(scope.to_string(), next);
        Ok(next)
    }

    async fn insert_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError> {
        insert_unique(
            &mut self.staged.requirements,
            "flight_fuel_requirements",
            requirement.id,
            requirement.clone(),
        )
    }

    async fn requirement(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FlightFuelRequirement>, StoreError> {
        Ok(self.staged.requirements.get(&id).cloned())
    }

    async fn requirement_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FlightFuelRequirement>, StoreError> {
        self.requirement(id).await
    }

    async fn update_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError> {
        replace_existing(
            &mut self.staged.requirements,
            "flight_fuel_requirements",
            requirement.id,
            requirement.clone(),
        )
    }

    async fn insert_order(&mut self, order: &FuelOrder) -> Result<(), StoreError> {
        ensure_unique_number(
            self.staged.orders.values(),
            |row: &FuelOrder| row.order_number.as_str(),
            &order.order_number,
            "fuel_orders",
        )?;
        insert_unique(&mut self.staged.orders, "fuel_orders", order.id, order.clone())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError> {
        self.order(id).await
    }

    async fn update_order(&mut self, order: &FuelOrder) -> Result<(), StoreError> {
        replace_existing(&mut self.staged.orders, "fuel_orders", order.id, order.clone())
    }

    async fn orders_for_requirement(
        &mut self,
        requirement_id: Uuid,
    ) -> Result<Vec<FuelOrder>, StoreError> {
        let mut orders: Vec<FuelOrder> = self
            .staged
            .orders
            .values()
            .filter(|order| order.requirement_id == Some(requirement_id))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.order_number.cmp(&b.order_number));
        Ok(orders)
    }

    async fn insert_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError> {
        ensure_unique_number(
            self.staged.deliveries.values(),
            |row: &FuelDelivery| row.delivery_number.as_str(),
            &delivery.delivery_number,
            "fuel_deliveries",
        )?;
        insert_unique(
            &mut self.staged.deliveries,
            "fuel_deliveries",
            delivery.id,
            delivery.clone(),
        )
    }

    async fn delivery_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FuelDelivery>, StoreError> {
        Ok(self.staged.deliveries.get(&id).cloned())
    }

    async fn update_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError> {
        replace_existing(
            &mut self.staged.deliveries,
            "fuel_deliveries",
            delivery.id,
            delivery.clone(),
        )
    }

    async fn deliveries_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<FuelDelivery>, StoreError> {
        let mut deliveries: Vec<FuelDelivery> = self
            .staged
            .deliveries
            .values()
            .filter(|delivery| delivery.order_id == order_id)
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| a.delivery_number.cmp(&b.delivery_number));
        Ok(deliveries)
    }

    async fn insert_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError> {
        ensure_unique_number(
            self.staged.operations.values(),
            |row: &FuelingOperation| row.operation_number.as_str(),
            &operation.operation_number,
            "fueling_operations",
        )?;
        insert_unique(
            &mut self.staged.operations,
            "fueling_operations",
            operation.id,
            operation.clone(),
        )
    }

    async fn operation_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FuelingOperation>, StoreError> {
        Ok(self.staged.operations.get(&id).cloned())
    }

    async fn update_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError> {
        replace_existing(
            &mut self.staged.operations,
            "fueling_operations",
            operation.id,
            operation.clone(),
        )
    }

    async fn insert_facility(&mut self, facility: &StorageFacility) -> Result<(), StoreError> {
        insert_unique(
            &mut self.staged.facilities,
            "storage_facilities",
            facility.id,
            facility.clone(),
        )
    }

    async fn facility(&mut self, id: Uuid) -> Result<Option<StorageFacility>, StoreError> {
        Ok(self.staged.facilities.get(&id).cloned())
    }

    async fn facility_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<StorageFacility>, StoreError> {
        self.facility(id).await
    }

    async fn set_facility_level(&mut self, id: Uuid, level: Decimal) -> Result<(), StoreError> {
        match self.staged.facilities.get_mut(&id) {
            Some(facility) => {
                facility.current_level = Some(level);
                Ok(())
            }
            None => Err(StoreError::Missing {
                table: "storage_facilities",
                id,
            }),
        }
    }

    async fn operational_facilities(
        &mut self,
        airport_id: &str,
        fuel_type_id: &str,
    ) -> Result<Vec<StorageFacility>, StoreError> {
        Ok(self
            .staged
            .facilities
            .values()
            .filter(|facility| {
                facility.is_operational
                    && facility.airport_id == airport_id
                    && facility.fuel_type_id == fuel_type_id
            })
            .cloned()
            .collect())
    }

    async fn insert_inventory_transaction(
        &mut self,
        transaction: &InventoryTransaction,
    ) -> Result<(), StoreError> {
        ensure_unique_number(
            self.staged.inventory.iter(),
            |row: &InventoryTransaction| row.transaction_number.as_str(),
            &transaction.transaction_number,
            "inventory_transactions",
        )?;
        self.staged.inventory.push(transaction.clone());
        Ok(())
    }

    async fn inventory_transactions(
        &mut self,
        facility_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>, StoreError> {
        Ok(self
            .staged
            .inventory
            .iter()
            .filter(|entry| entry.storage_facility_id == facility_id)
            .cloned()
            .collect())
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> Result<(), StoreError> {
        insert_unique(
            &mut self.staged.suppliers,
            "suppliers",
            supplier.id,
            supplier.clone(),
        )
    }

    async fn supplier(&mut self, id: Uuid) -> Result<Option<Supplier>, StoreError> {
        Ok(self.staged.suppliers.get(&id).cloned())
    }

    async fn insert_contract(&mut self, contract: &SupplierContract) -> Result<(), StoreError> {
        insert_unique(
            &mut self.staged.contracts,
            "supplier_contracts",
            contract.id,
            contract.clone(),
        )
    }

    async fn matching_contracts(
        &mut self,
        query: &ContractQuery,
    ) -> Result<Vec<SupplierContract>, StoreError> {
        Ok(self
            .staged
            .contracts
            .values()
            .filter(|contract| query.matches(contract))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use fuelsphere_core::{ContractStatus, RequirementStatus};

    use super::*;

    fn requirement() -> FlightFuelRequirement {
        FlightFuelRequirement {
            id: Uuid::new_v4(),
            flight_number: "LH400".to_string(),
            fuel_type_id: "JET-A1".to_string(),
            requested_volume: Decimal::new(12_000, 0),
            currency: None,
            status: RequirementStatus::Open,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        let requirement = requirement();

        let mut tx = store.begin().await.unwrap();
        tx.insert_requirement(&requirement).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.requirement(requirement.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = InMemoryStore::new();
        let requirement = requirement();

        let mut tx = store.begin().await.unwrap();
        tx.insert_requirement(&requirement).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.requirement(requirement.id).await.unwrap(), Some(requirement));
    }

    #[tokio::test]
    async fn sequences_start_at_floor_and_never_go_back() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        assert_eq!(tx.next_sequence("FO-20240601", 1).await.unwrap(), 1);
        assert_eq!(tx.next_sequence("FO-20240601", 1).await.unwrap(), 2);
        assert_eq!(tx.next_sequence("FO-20240602", 1).await.unwrap(), 1);

        assert_eq!(tx.next_sequence("IT", 1_000).await.unwrap(), 1_000);
        assert_eq!(tx.next_sequence("IT", 1_000).await.unwrap(), 1_001);
        assert_eq!(tx.next_sequence("IT", 5_000).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn updating_a_missing_row_fails() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx.update_requirement(&requirement()).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn contract_lookup_applies_the_query_predicate() {
        let store = InMemoryStore::new();
        let date = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        let contract = |status, min, max| SupplierContract {
            id: Uuid::new_v4(),
            supplier_id: Uuid::new_v4(),
            fuel_type_id: "JET-A1".to_string(),
            valid_from: date(1),
            valid_to: date(30),
            min_volume: Decimal::new(min, 0),
            max_volume: Decimal::new(max, 0),
            price_per_liter: Decimal::new(90, 2),
            currency: None,
            status,
        };
        let in_band = contract(ContractStatus::Active, 500, 5_000);
        let out_of_band = contract(ContractStatus::Active, 2_000, 5_000);
        let inactive = contract(ContractStatus::Inactive, 500, 5_000);

        let mut tx = store.begin().await.unwrap();
        for c in [&in_band, &out_of_band, &inactive] {
            tx.insert_contract(c).await.unwrap();
        }

        let query = ContractQuery {
            fuel_type_id: "JET-A1".to_string(),
            volume: Decimal::new(1_000, 0),
            as_of: date(30),
        };
        let found = tx.matching_contracts(&query).await.unwrap();
        assert_eq!(found, vec![in_band]);
    }
}
