use chrono::NaiveDate;
use fuelsphere_core::{OperationsStore, OpsResult};
use fuelsphere_finance::{self as finance, FuelCostBreakdown, SupplierQuote};
use fuelsphere_inventory as inventory;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::OperationsService;

impl<S: OperationsStore> OperationsService<S> {
    pub async fn available_fuel(&self, airport_id: &str, fuel_type_id: &str) -> OpsResult<Decimal> {
        let mut tx = self.store.begin().await?;
        Ok(inventory::available_fuel(&mut tx, airport_id, fuel_type_id).await?)
    }

    /// Cheapest valid contract for `volume` on `as_of`.
    ///
    /// Contracts carry no airport, so `airport_id` only scopes the log line.
    pub async fn optimal_supplier(
        &self,
        airport_id: &str,
        fuel_type_id: &str,
        volume: Decimal,
        as_of: NaiveDate,
    ) -> OpsResult<Option<SupplierQuote>> {
        let mut tx = self.store.begin().await?;
        let quote = finance::resolve_contract(&mut tx, fuel_type_id, volume, as_of).await?;
        debug!(airport_id, fuel_type_id, found = quote.is_some(), "optimal supplier resolved");
        Ok(quote)
    }

    pub async fn flight_fuel_cost(&self, requirement_id: Uuid) -> OpsResult<FuelCostBreakdown> {
        let mut tx = self.store.begin().await?;
        finance::estimate_cost(&mut tx, requirement_id).await
    }
}
