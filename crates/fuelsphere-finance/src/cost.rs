use fuelsphere_core::{DEFAULT_CURRENCY, OpsError, OpsResult, StoreTx};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuelCostBreakdown {
    pub fuel_cost: Decimal,
    pub taxes: Decimal,
    pub fees: Decimal,
    pub total_cost: Decimal,
    pub currency: String,
}

pub fn tax_rate() -> Decimal {
    Decimal::new(5, 2) // 5.00%
}

pub fn fee_rate() -> Decimal {
    Decimal::new(2, 2) // 2.00%
}

impl FuelCostBreakdown {
    pub fn from_fuel_cost(fuel_cost: Decimal, currency: String) -> OpsResult<Self> {
        let taxes = fuel_cost.checked_mul(tax_rate()).ok_or_else(out_of_range)?;
        let fees = fuel_cost.checked_mul(fee_rate()).ok_or_else(out_of_range)?;
        let total_cost = fuel_cost
            .checked_add(taxes)
            .and_then(|subtotal| subtotal.checked_add(fees))
            .ok_or_else(out_of_range)?;
        Ok(Self {
            fuel_cost,
            taxes,
            fees,
            total_cost,
            currency,
        })
    }
}

fn out_of_range() -> OpsError {
    OpsError::Invalid("fuel cost out of range".to_string())
}

/// Fuel cost of a flight requirement, summed over the orders placed for it.
pub async fn estimate_cost<T: StoreTx>(
    tx: &mut T,
    requirement_id: Uuid,
) -> OpsResult<FuelCostBreakdown> {
    let requirement = tx
        .requirement(requirement_id)
        .await?
        .ok_or_else(|| OpsError::not_found("Flight requirement", requirement_id))?;

    let fuel_cost = tx
        .orders_for_requirement(requirement_id)
        .await?
        .iter()
        .try_fold(Decimal::ZERO, |total, order| {
            total.checked_add(order.total_amount.unwrap_or(Decimal::ZERO))
        })
        .ok_or_else(out_of_range)?;

    FuelCostBreakdown::from_fuel_cost(
        fuel_cost,
        requirement
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    )
}
