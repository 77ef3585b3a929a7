use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::{FuelDelivery, FuelOrder, FuelingOperation, InventoryTransaction};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FuelEventKind {
    OrderCancelled,
    DeliveryRecorded,
    FuelingCompleted,
    InventoryPosted,
}

impl FuelEventKind {
    pub fn channel(self) -> &'static str {
        match self {
            Self::OrderCancelled => "fuel.orders.cancelled",
            Self::DeliveryRecorded => "fuel.orders.delivered",
            Self::FuelingCompleted => "fuel.operations.completed",
            Self::InventoryPosted => "fuel.inventory.posted",
        }
    }
}

/// Notification emitted after a state change has been committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub kind: FuelEventKind,
    pub document_number: String,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl FuelEvent {
    fn new(
        kind: FuelEventKind,
        aggregate_id: Uuid,
        document_number: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            kind,
            document_number: document_number.to_string(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn order_cancelled(order: &FuelOrder) -> Self {
        Self::new(
            FuelEventKind::OrderCancelled,
            order.id,
            &order.order_number,
            json!({ "status": order.status }),
        )
    }

    pub fn delivery_recorded(delivery: &FuelDelivery) -> Self {
        Self::new(
            FuelEventKind::DeliveryRecorded,
            delivery.order_id,
            &delivery.delivery_number,
            json!({
                "delivery_id": delivery.id,
                "delivered_volume": delivery.delivered_volume,
            }),
        )
    }

    pub fn fueling_completed(operation: &FuelingOperation) -> Self {
        Self::new(
            FuelEventKind::FuelingCompleted,
            operation.id,
            &operation.operation_number,
            json!({
                "storage_facility_id": operation.storage_facility_id,
                "volume_dispensed": operation.volume_dispensed,
            }),
        )
    }

    pub fn inventory_posted(transaction: &InventoryTransaction) -> Self {
        Self::new(
            FuelEventKind::InventoryPosted,
            transaction.storage_facility_id,
            &transaction.transaction_number,
            json!({
                "transaction_type": transaction.transaction_type,
                "volume": transaction.volume,
                "balance_after": transaction.balance_after,
                "reference_doc": transaction.reference_doc,
            }),
        )
    }
}
