use chrono::NaiveDate;
use fuelsphere_core::OrderPriority;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequirementRequest {
    pub flight_number: String,
    pub fuel_type_id: String,
    pub requested_volume: Decimal,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub requirement_id: Option<Uuid>,
    pub supplier_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub fuel_type_id: String,
    pub ordered_volume: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    #[serde(default)]
    pub priority: OrderPriority,
    /// Places the order directly in SUBMITTED instead of DRAFT.
    #[serde(default)]
    pub submit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDeliveryRequest {
    pub volume: Decimal,
    pub temperature: Decimal,
    pub density: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOperationRequest {
    pub storage_facility_id: Option<Uuid>,
    pub aircraft_registration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteFuelingRequest {
    pub volume_dispensed: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFacilityRequest {
    pub name: String,
    pub airport_id: String,
    pub fuel_type_id: String,
    pub capacity: Option<Decimal>,
    #[serde(default)]
    pub initial_level: Decimal,
    #[serde(default = "default_operational")]
    pub is_operational: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableFuelQuery {
    pub airport_id: String,
    pub fuel_type_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableFuelResponse {
    pub airport_id: String,
    pub fuel_type_id: String,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimalSupplierQuery {
    pub airport_id: String,
    pub fuel_type_id: String,
    pub volume: Decimal,
    /// Contract validity date; today (UTC) when omitted.
    pub as_of: Option<NaiveDate>,
}

fn default_operational() -> bool {
    true
}
