use chrono::Utc;
use fuelsphere_core::{
    DEFAULT_CURRENCY, DeliveryStatus, DocumentKind, FuelDelivery, FuelOrder, OperationsStore,
    OpsError, OpsResult, OrderPriority, OrderStatus, StoreTx, next_document_number,
};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::OperationsService;

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub requirement_id: Option<Uuid>,
    pub supplier_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub fuel_type_id: String,
    pub ordered_volume: Decimal,
    pub unit_price: Decimal,
    /// Defaults to `ordered_volume * unit_price`.
    pub total_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub priority: OrderPriority,
    /// Place the order as Submitted instead of Draft.
    pub submit: bool,
}

/// Result of a cancel request. `cancelled_now` is false when the order was
/// already cancelled and nothing was written.
#[derive(Debug, Clone)]
pub struct OrderCancellation {
    pub order: FuelOrder,
    pub cancelled_now: bool,
}

/// Measured values of a delivery into storage.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryReading {
    pub volume: Decimal,
    pub temperature: Decimal,
    pub density: Decimal,
}

impl<S: OperationsStore> OperationsService<S> {
    pub async fn place_order(&self, new: NewOrder) -> OpsResult<FuelOrder> {
        if new.ordered_volume <= Decimal::ZERO {
            return Err(OpsError::Invalid(
                "ordered_volume must be positive".to_string(),
            ));
        }
        if new.unit_price < Decimal::ZERO {
            return Err(OpsError::Invalid(
                "unit_price cannot be negative".to_string(),
            ));
        }

        let total_amount = match new.total_amount {
            Some(total) => total,
            None => new
                .ordered_volume
                .checked_mul(new.unit_price)
                .map(|total| total.round_dp(4))
                .ok_or_else(|| {
                    OpsError::Invalid("ordered_volume x unit_price is out of range".to_string())
                })?,
        };

        let mut tx = self.store.begin().await?;

        if let Some(requirement_id) = new.requirement_id {
            tx.requirement(requirement_id)
                .await?
                .ok_or_else(|| OpsError::not_found("Flight requirement", requirement_id))?;
        }
        tx.supplier(new.supplier_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Supplier", new.supplier_id))?;

        let now = Utc::now();
        let order = FuelOrder {
            id: Uuid::new_v4(),
            order_number: next_document_number(&mut tx, DocumentKind::Order, now).await?,
            requirement_id: new.requirement_id,
            supplier_id: new.supplier_id,
            contract_id: new.contract_id,
            fuel_type_id: new.fuel_type_id.trim().to_string(),
            ordered_volume: new.ordered_volume,
            unit_price: new.unit_price,
            total_amount: Some(total_amount),
            currency: new
                .currency
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            priority: new.priority,
            order_date: now,
            status: if new.submit {
                OrderStatus::Submitted
            } else {
                OrderStatus::Draft
            },
            delivered_volume: None,
            actual_delivery_date: None,
        };

        tx.insert_order(&order).await?;
        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            order_id = %order.id,
            status = %order.status,
            "fuel order placed"
        );
        Ok(order)
    }

    /// Confirms an order. Confirming an already confirmed order changes nothing.
    pub async fn confirm_order(&self, id: Uuid) -> OpsResult<FuelOrder> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(&mut tx, id).await?;

        if order.status != OrderStatus::Confirmed {
            let previous = order.status;
            order.status = OrderStatus::Confirmed;
            tx.update_order(&order).await?;
            tx.commit().await?;
            info!(order_number = %order.order_number, from = %previous, "fuel order confirmed");
        }

        Ok(order)
    }

    /// Cancels an order unless it has already been delivered.
    pub async fn cancel_order(&self, id: Uuid) -> OpsResult<OrderCancellation> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(&mut tx, id).await?;

        if order.status == OrderStatus::Delivered {
            warn!(order_number = %order.order_number, "refused to cancel a delivered order");
            return Err(OpsError::Conflict(
                "Cannot cancel a delivered order".to_string(),
            ));
        }

        let cancelled_now = order.status != OrderStatus::Cancelled;
        if cancelled_now {
            order.status = OrderStatus::Cancelled;
            tx.update_order(&order).await?;
            tx.commit().await?;
            info!(order_number = %order.order_number, "fuel order cancelled");
        }

        Ok(OrderCancellation {
            order,
            cancelled_now,
        })
    }

    /// Records a delivery against an order and marks the order delivered.
    ///
    /// The delivery row and the order update commit together. Facility stock is
    /// not touched here; stock only moves through fueling operations and
    /// explicit ledger posts.
    pub async fn record_delivery(
        &self,
        order_id: Uuid,
        reading: DeliveryReading,
    ) -> OpsResult<FuelDelivery> {
        let mut tx = self.store.begin().await?;
        let mut order = load_order(&mut tx, order_id).await?;

        let now = Utc::now();
        let delivery = FuelDelivery {
            id: Uuid::new_v4(),
            delivery_number: next_document_number(&mut tx, DocumentKind::Delivery, now).await?,
            order_id,
            delivered_volume: reading.volume,
            temperature: reading.temperature,
            density: reading.density,
            delivery_date: now,
            status: DeliveryStatus::Completed,
        };
        tx.insert_delivery(&delivery).await?;

        order.status = OrderStatus::Delivered;
        order.delivered_volume = Some(reading.volume);
        order.actual_delivery_date = Some(now);
        tx.update_order(&order).await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            delivery_number = %delivery.delivery_number,
            volume = %reading.volume,
            "delivery recorded"
        );
        Ok(delivery)
    }

    pub async fn verify_delivery(&self, id: Uuid) -> OpsResult<FuelDelivery> {
        self.set_delivery_status(id, DeliveryStatus::Verified).await
    }

    pub async fn dispute_delivery(&self, id: Uuid) -> OpsResult<FuelDelivery> {
        self.set_delivery_status(id, DeliveryStatus::Disputed).await
    }

    pub async fn deliveries_for_order(&self, order_id: Uuid) -> OpsResult<Vec<FuelDelivery>> {
        let mut tx = self.store.begin().await?;
        tx.order(order_id)
            .await?
            .ok_or_else(|| OpsError::not_found("Order", order_id))?;
        Ok(tx.deliveries_for_order(order_id).await?)
    }

    async fn set_delivery_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
    ) -> OpsResult<FuelDelivery> {
        let mut tx = self.store.begin().await?;
        let mut delivery = tx
            .delivery_for_update(id)
            .await?
            .ok_or_else(|| OpsError::not_found("Delivery", id))?;

        if delivery.status != status {
            delivery.status = status;
            tx.update_delivery(&delivery).await?;
            tx.commit().await?;
            info!(
                delivery_number = %delivery.delivery_number,
                status = %status,
                "delivery status corrected"
            );
        }

        Ok(delivery)
    }
}

async fn load_order<T: StoreTx>(tx: &mut T, id: Uuid) -> OpsResult<FuelOrder> {
    tx.order_for_update(id)
        .await?
        .ok_or_else(|| OpsError::not_found("Order", id))
}
