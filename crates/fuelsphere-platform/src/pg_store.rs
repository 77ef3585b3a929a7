use async_trait::async_trait;
use fuelsphere_core::{
    ContractQuery, FlightFuelRequirement, FuelDelivery, FuelOrder, FuelingOperation,
    InventoryTransaction, OperationsStore, StorageFacility, StoreError, StoreTx, Supplier,
    SupplierContract,
};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const REQUIREMENT_COLUMNS: &str =
    "id, flight_number, fuel_type_id, requested_volume, currency, status, created_at";
const ORDER_COLUMNS: &str = "id, order_number, requirement_id, supplier_id, contract_id, fuel_type_id, ordered_volume, unit_price, total_amount, currency, priority, order_date, status, delivered_volume, actual_delivery_date";
const DELIVERY_COLUMNS: &str =
    "id, delivery_number, order_id, delivered_volume, temperature, density, delivery_date, status";
const OPERATION_COLUMNS: &str = "id, operation_number, storage_facility_id, aircraft_registration, status, start_time, end_time, volume_dispensed";
const FACILITY_COLUMNS: &str =
    "id, name, airport_id, fuel_type_id, capacity, current_level, is_operational";
const INVENTORY_COLUMNS: &str = "id, transaction_number, storage_facility_id, transaction_type, volume, balance_before, balance_after, reference_doc, transaction_date";
const CONTRACT_COLUMNS: &str = "id, supplier_id, fuel_type_id, valid_from, valid_to, min_volume, max_volume, price_per_liter, currency, status";

/// PostgreSQL-backed operations store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OperationsStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(PgTx { tx })
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(backend)
}

fn ensure_updated(rows: u64, table: &'static str, id: Uuid) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::Missing { table, id });
    }
    Ok(())
}

fn requirement_from_row(row: &PgRow) -> Result<FlightFuelRequirement, StoreError> {
    Ok(FlightFuelRequirement {
        id: col(row, "id")?,
        flight_number: col(row, "flight_number")?,
        fuel_type_id: col(row, "fuel_type_id")?,
        requested_volume: col(row, "requested_volume")?,
        currency: col(row, "currency")?,
        status: col::<String>(row, "status")?.parse()?,
        created_at: col(row, "created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<FuelOrder, StoreError> {
    Ok(FuelOrder {
        id: col(row, "id")?,
        order_number: col(row, "order_number")?,
        requirement_id: col(row, "requirement_id")?,
        supplier_id: col(row, "supplier_id")?,
        contract_id: col(row, "contract_id")?,
        fuel_type_id: col(row, "fuel_type_id")?,
        ordered_volume: col(row, "ordered_volume")?,
        unit_price: col(row, "unit_price")?,
        total_amount: col(row, "total_amount")?,
        currency: col(row, "currency")?,
        priority: col::<String>(row, "priority")?.parse()?,
        order_date: col(row, "order_date")?,
        status: col::<String>(row, "status")?.parse()?,
        delivered_volume: col(row, "delivered_volume")?,
        actual_delivery_date: col(row, "actual_delivery_date")?,
    })
}

fn delivery_from_row(row: &PgRow) -> Result<FuelDelivery, StoreError> {
    Ok(FuelDelivery {
        id: col(row, "id")?,
        delivery_number: col(row, "delivery_number")?,
        order_id: col(row, "order_id")?,
        delivered_volume: col(row, "delivered_volume")?,
        temperature: col(row, "temperature")?,
        density: col(row, "density")?,
        delivery_date: col(row, "delivery_date")?,
        status: col::<String>(row, "status")?.parse()?,
    })
}

fn operation_from_row(row: &PgRow) -> Result<FuelingOperation, StoreError> {
    Ok(FuelingOperation {
        id: col(row, "id")?,
        operation_number: col(row, "operation_number")?,
        storage_facility_id: col(row, "storage_facility_id")?,
        aircraft_registration: col(row, "aircraft_registration")?,
        status: col::<String>(row, "status")?.parse()?,
        start_time: col(row, "start_time")?,
        end_time: col(row, "end_time")?,
        volume_dispensed: col(row, "volume_dispensed")?,
    })
}

fn facility_from_row(row: &PgRow) -> Result<StorageFacility, StoreError> {
    Ok(StorageFacility {
        id: col(row, "id")?,
        name: col(row, "name")?,
        airport_id: col(row, "airport_id")?,
        fuel_type_id: col(row, "fuel_type_id")?,
        capacity: col(row, "capacity")?,
        current_level: col(row, "current_level")?,
        is_operational: col(row, "is_operational")?,
    })
}

fn inventory_from_row(row: &PgRow) -> Result<InventoryTransaction, StoreError> {
    Ok(InventoryTransaction {
        id: col(row, "id")?,
        transaction_number: col(row, "transaction_number")?,
        storage_facility_id: col(row, "storage_facility_id")?,
        transaction_type: col::<String>(row, "transaction_type")?.parse()?,
        volume: col(row, "volume")?,
        balance_before: col(row, "balance_before")?,
        balance_after: col(row, "balance_after")?,
        reference_doc: col(row, "reference_doc")?,
        transaction_date: col(row, "transaction_date")?,
    })
}

fn contract_from_row(row: &PgRow) -> Result<SupplierContract, StoreError> {
    Ok(SupplierContract {
        id: col(row, "id")?,
        supplier_id: col(row, "supplier_id")?,
        fuel_type_id: col(row, "fuel_type_id")?,
        valid_from: col(row, "valid_from")?,
        valid_to: col(row, "valid_to")?,
        min_volume: col(row, "min_volume")?,
        max_volume: col(row, "max_volume")?,
        price_per_liter: col(row, "price_per_liter")?,
        currency: col(row, "currency")?,
        status: col::<String>(row, "status")?.parse()?,
    })
}

impl PgTx {
    async fn fetch_one_by_id<T>(
        &mut self,
        sql: &str,
        id: Uuid,
        decode: fn(&PgRow) -> Result<T, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;
        row.as_ref().map(decode).transpose()
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(backend)
    }

    async fn next_sequence(&mut self, scope: &str, floor: i64) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO document_sequences (scope, value)
            VALUES ($1, $2)
            ON CONFLICT (scope)
            DO UPDATE SET value = GREATEST(document_sequences.value + 1, EXCLUDED.value)
            RETURNING value
            "#,
        )
        .bind(scope)
        .bind(floor)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(backend)
    }

    async fn insert_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO flight_fuel_requirements (
                id, flight_number, fuel_type_id, requested_volume, currency, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(requirement.id)
        .bind(&requirement.flight_number)
        .bind(&requirement.fuel_type_id)
        .bind(requirement.requested_volume)
        .bind(&requirement.currency)
        .bind(requirement.status.as_str())
        .bind(requirement.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn requirement(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FlightFuelRequirement>, StoreError> {
        let sql =
            format!("SELECT {REQUIREMENT_COLUMNS} FROM flight_fuel_requirements WHERE id = $1");
        self.fetch_one_by_id(&sql, id, requirement_from_row).await
    }

    async fn requirement_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FlightFuelRequirement>, StoreError> {
        let sql = format!(
            "SELECT {REQUIREMENT_COLUMNS} FROM flight_fuel_requirements WHERE id = $1 FOR UPDATE"
        );
        self.fetch_one_by_id(&sql, id, requirement_from_row).await
    }

    async fn update_requirement(
        &mut self,
        requirement: &FlightFuelRequirement,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE flight_fuel_requirements SET status = $2 WHERE id = $1")
            .bind(requirement.id)
            .bind(requirement.status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        ensure_updated(result.rows_affected(), "flight_fuel_requirements", requirement.id)
    }

    async fn insert_order(&mut self, order: &FuelOrder) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fuel_orders (
                id, order_number, requirement_id, supplier_id, contract_id, fuel_type_id,
                ordered_volume, unit_price, total_amount, currency, priority, order_date,
                status, delivered_volume, actual_delivery_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.requirement_id)
        .bind(order.supplier_id)
        .bind(order.contract_id)
        .bind(&order.fuel_type_id)
        .bind(order.ordered_volume)
        .bind(order.unit_price)
        .bind(order.total_amount)
        .bind(&order.currency)
        .bind(order.priority.as_str())
        .bind(order.order_date)
        .bind(order.status.as_str())
        .bind(order.delivered_volume)
        .bind(order.actual_delivery_date)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn order(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM fuel_orders WHERE id = $1");
        self.fetch_one_by_id(&sql, id, order_from_row).await
    }

    async fn order_for_update(&mut self, id: Uuid) -> Result<Option<FuelOrder>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM fuel_orders WHERE id = $1 FOR UPDATE");
        self.fetch_one_by_id(&sql, id, order_from_row).await
    }

    async fn update_order(&mut self, order: &FuelOrder) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE fuel_orders
            SET status = $2, delivered_volume = $3, actual_delivery_date = $4
            WHERE id = $1
            "#,
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.delivered_volume)
        .bind(order.actual_delivery_date)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        ensure_updated(result.rows_affected(), "fuel_orders", order.id)
    }

    async fn orders_for_requirement(
        &mut self,
        requirement_id: Uuid,
    ) -> Result<Vec<FuelOrder>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM fuel_orders WHERE requirement_id = $1 ORDER BY order_number"
        );
        let rows = sqlx::query(&sql)
            .bind(requirement_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;
        rows.iter().map(order_from_row).collect()
    }

    async fn insert_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fuel_deliveries (
                id, delivery_number, order_id, delivered_volume, temperature, density,
                delivery_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(delivery.id)
        .bind(&delivery.delivery_number)
        .bind(delivery.order_id)
        .bind(delivery.delivered_volume)
        .bind(delivery.temperature)
        .bind(delivery.density)
        .bind(delivery.delivery_date)
        .bind(delivery.status.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn delivery_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FuelDelivery>, StoreError> {
        let sql =
            format!("SELECT {DELIVERY_COLUMNS} FROM fuel_deliveries WHERE id = $1 FOR UPDATE");
        self.fetch_one_by_id(&sql, id, delivery_from_row).await
    }

    async fn update_delivery(&mut self, delivery: &FuelDelivery) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE fuel_deliveries SET status = $2 WHERE id = $1")
            .bind(delivery.id)
            .bind(delivery.status.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        ensure_updated(result.rows_affected(), "fuel_deliveries", delivery.id)
    }

    async fn deliveries_for_order(
        &mut self,
        order_id: Uuid,
    ) -> Result<Vec<FuelDelivery>, StoreError> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM fuel_deliveries WHERE order_id = $1 ORDER BY delivery_number"
        );
        let rows = sqlx::query(&sql)
            .bind(order_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;
        rows.iter().map(delivery_from_row).collect()
    }

    async fn insert_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fueling_operations (
                id, operation_number, storage_facility_id, aircraft_registration, status,
                start_time, end_time, volume_dispensed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(operation.id)
        .bind(&operation.operation_number)
        .bind(operation.storage_facility_id)
        .bind(&operation.aircraft_registration)
        .bind(operation.status.as_str())
        .bind(operation.start_time)
        .bind(operation.end_time)
        .bind(operation.volume_dispensed)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn operation_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<FuelingOperation>, StoreError> {
        let sql =
            format!("SELECT {OPERATION_COLUMNS} FROM fueling_operations WHERE id = $1 FOR UPDATE");
        self.fetch_one_by_id(&sql, id, operation_from_row).await
    }

    async fn update_operation(&mut self, operation: &FuelingOperation) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE fueling_operations
            SET status = $2, start_time = $3, end_time = $4, volume_dispensed = $5
            WHERE id = $1
            "#,
        )
        .bind(operation.id)
        .bind(operation.status.as_str())
        .bind(operation.start_time)
        .bind(operation.end_time)
        .bind(operation.volume_dispensed)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        ensure_updated(result.rows_affected(), "fueling_operations", operation.id)
    }

    async fn insert_facility(&mut self, facility: &StorageFacility) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO storage_facilities (
                id, name, airport_id, fuel_type_id, capacity, current_level, is_operational
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(facility.id)
        .bind(&facility.name)
        .bind(&facility.airport_id)
        .bind(&facility.fuel_type_id)
        .bind(facility.capacity)
        .bind(facility.current_level)
        .bind(facility.is_operational)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn facility(&mut self, id: Uuid) -> Result<Option<StorageFacility>, StoreError> {
        let sql = format!("SELECT {FACILITY_COLUMNS} FROM storage_facilities WHERE id = $1");
        self.fetch_one_by_id(&sql, id, facility_from_row).await
    }

    async fn facility_for_update(
        &mut self,
        id: Uuid,
    ) -> Result<Option<StorageFacility>, StoreError> {
        let sql =
            format!("SELECT {FACILITY_COLUMNS} FROM storage_facilities WHERE id = $1 FOR UPDATE");
        self.fetch_one_by_id(&sql, id, facility_from_row).await
    }

    async fn set_facility_level(&mut self, id: Uuid, level: Decimal) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE storage_facilities SET current_level = $2 WHERE id = $1")
            .bind(id)
            .bind(level)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        ensure_updated(result.rows_affected(), "storage_facilities", id)
    }

    async fn operational_facilities(
        &mut self,
        airport_id: &str,
        fuel_type_id: &str,
    ) -> Result<Vec<StorageFacility>, StoreError> {
        let sql = format!(
            "SELECT {FACILITY_COLUMNS} FROM storage_facilities WHERE airport_id = $1 AND fuel_type_id = $2 AND is_operational = TRUE"
        );
        let rows = sqlx::query(&sql)
            .bind(airport_id)
            .bind(fuel_type_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;
        rows.iter().map(facility_from_row).collect()
    }

    async fn insert_inventory_transaction(
        &mut self,
        transaction: &InventoryTransaction,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_transactions (
                id, transaction_number, storage_facility_id, transaction_type, volume,
                balance_before, balance_after, reference_doc, transaction_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.transaction_number)
        .bind(transaction.storage_facility_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.volume)
        .bind(transaction.balance_before)
        .bind(transaction.balance_after)
        .bind(&transaction.reference_doc)
        .bind(transaction.transaction_date)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn inventory_transactions(
        &mut self,
        facility_id: Uuid,
    ) -> Result<Vec<InventoryTransaction>, StoreError> {
        let sql = format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_transactions WHERE storage_facility_id = $1 ORDER BY seq"
        );
        let rows = sqlx::query(&sql)
            .bind(facility_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;
        rows.iter().map(inventory_from_row).collect()
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO suppliers (id, name) VALUES ($1, $2)")
            .bind(supplier.id)
            .bind(&supplier.name)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn supplier(&mut self, id: Uuid) -> Result<Option<Supplier>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM suppliers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;
        row.map(|row| {
            Ok(Supplier {
                id: col(&row, "id")?,
                name: col(&row, "name")?,
            })
        })
        .transpose()
    }

    async fn insert_contract(&mut self, contract: &SupplierContract) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO supplier_contracts (
                id, supplier_id, fuel_type_id, valid_from, valid_to, min_volume, max_volume,
                price_per_liter, currency, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(contract.id)
        .bind(contract.supplier_id)
        .bind(&contract.fuel_type_id)
        .bind(contract.valid_from)
        .bind(contract.valid_to)
        .bind(contract.min_volume)
        .bind(contract.max_volume)
        .bind(contract.price_per_liter)
        .bind(&contract.currency)
        .bind(contract.status.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn matching_contracts(
        &mut self,
        query: &ContractQuery,
    ) -> Result<Vec<SupplierContract>, StoreError> {
        let sql = format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM supplier_contracts
            WHERE fuel_type_id = $1
              AND status = 'ACTIVE'
              AND valid_from <= $2 AND valid_to >= $2
              AND min_volume <= $3 AND max_volume >= $3
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(&query.fuel_type_id)
            .bind(query.as_of)
            .bind(query.volume)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;
        rows.iter().map(contract_from_row).collect()
    }
}
