use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

macro_rules! stored_enum {
    ($name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = StoreError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(StoreError::Decode {
                        field: $label,
                        detail: format!("unknown value {other:?}"),
                    }),
                }
            }
        }
    };
}

stored_enum!(RequirementStatus, "requirement status" {
    Open => "OPEN",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
});

stored_enum!(OrderStatus, "order status" {
    Draft => "DRAFT",
    Submitted => "SUBMITTED",
    Confirmed => "CONFIRMED",
    InProgress => "IN_PROGRESS",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

stored_enum!(OrderPriority, "order priority" {
    Normal => "NORMAL",
    High => "HIGH",
    Urgent => "URGENT",
});

stored_enum!(DeliveryStatus, "delivery status" {
    Scheduled => "SCHEDULED",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Verified => "VERIFIED",
    Disputed => "DISPUTED",
});

stored_enum!(OperationStatus, "operation status" {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
});

stored_enum!(InventoryTransactionType, "inventory transaction type" {
    Receipt => "RECEIPT",
    Dispense => "DISPENSE",
    Adjustment => "ADJUSTMENT",
});

stored_enum!(ContractStatus, "contract status" {
    Active => "ACTIVE",
    Inactive => "INACTIVE",
    Expired => "EXPIRED",
});

impl Default for OrderPriority {
    fn default() -> Self {
        Self::Normal
    }
}

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightFuelRequirement {
    pub id: Uuid,
    pub flight_number: String,
    pub fuel_type_id: String,
    pub requested_volume: Decimal,
    pub currency: Option<String>,
    pub status: RequirementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelOrder {
    pub id: Uuid,
    pub order_number: String,
    pub requirement_id: Option<Uuid>,
    pub supplier_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub fuel_type_id: String,
    pub ordered_volume: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Option<Decimal>,
    pub currency: String,
    pub priority: OrderPriority,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub delivered_volume: Option<Decimal>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelDelivery {
    pub id: Uuid,
    pub delivery_number: String,
    pub order_id: Uuid,
    pub delivered_volume: Decimal,
    pub temperature: Decimal,
    pub density: Decimal,
    pub delivery_date: DateTime<Utc>,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelingOperation {
    pub id: Uuid,
    pub operation_number: String,
    pub storage_facility_id: Option<Uuid>,
    pub aircraft_registration: Option<String>,
    pub status: OperationStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub volume_dispensed: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageFacility {
    pub id: Uuid,
    pub name: String,
    pub airport_id: String,
    pub fuel_type_id: String,
    pub capacity: Option<Decimal>,
    pub current_level: Option<Decimal>,
    pub is_operational: bool,
}

impl StorageFacility {
    /// Level used for ledger arithmetic; an unset level counts as empty.
    pub fn level(&self) -> Decimal {
        self.current_level.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub transaction_number: String,
    pub storage_facility_id: Uuid,
    pub transaction_type: InventoryTransactionType,
    pub volume: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_doc: String,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierContract {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub fuel_type_id: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    pub min_volume: Decimal,
    pub max_volume: Decimal,
    pub price_per_liter: Decimal,
    pub currency: Option<String>,
    pub status: ContractStatus,
}

/// Typed predicate for supplier contract lookup. Backends bind these values as
/// query parameters; `matches` is the reference semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractQuery {
    pub fuel_type_id: String,
    pub volume: Decimal,
    pub as_of: NaiveDate,
}

impl ContractQuery {
    pub fn matches(&self, contract: &SupplierContract) -> bool {
        contract.fuel_type_id == self.fuel_type_id
            && contract.status == ContractStatus::Active
            && contract.valid_from <= self.as_of
            && self.as_of <= contract.valid_to
            && contract.min_volume <= self.volume
            && self.volume <= contract.max_volume
    }
}
