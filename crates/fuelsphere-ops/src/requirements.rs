use chrono::Utc;
use fuelsphere_core::{
    FlightFuelRequirement, OperationsStore, OpsError, OpsResult, RequirementStatus, StoreTx,
};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::OperationsService;

#[derive(Debug, Clone)]
pub struct NewRequirement {
    pub flight_number: String,
    pub fuel_type_id: String,
    pub requested_volume: Decimal,
    pub currency: Option<String>,
}

impl<S: OperationsStore> OperationsService<S> {
    pub async fn create_requirement(
        &self,
        new: NewRequirement,
    ) -> OpsResult<FlightFuelRequirement> {
        let flight_number = new.flight_number.trim().to_ascii_uppercase();
        if flight_number.is_empty() {
            return Err(OpsError::Invalid("flight_number is required".to_string()));
        }
        if new.requested_volume <= Decimal::ZERO {
            return Err(OpsError::Invalid(
                "requested_volume must be positive".to_string(),
            ));
        }

        let requirement = FlightFuelRequirement {
            id: Uuid::new_v4(),
            flight_number,
            fuel_type_id: new.fuel_type_id.trim().to_string(),
            requested_volume: new.requested_volume,
            currency: new.currency.map(|c| c.trim().to_ascii_uppercase()),
            status: RequirementStatus::Open,
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        tx.insert_requirement(&requirement).await?;
        tx.commit().await?;

        info!(
            requirement_id = %requirement.id,
            flight = %requirement.flight_number,
            "requirement opened"
        );
        Ok(requirement)
    }

    pub async fn confirm_requirement(&self, id: Uuid) -> OpsResult<FlightFuelRequirement> {
        self.set_requirement_status(id, RequirementStatus::Confirmed)
            .await
    }

    pub async fn cancel_requirement(&self, id: Uuid) -> OpsResult<FlightFuelRequirement> {
        self.set_requirement_status(id, RequirementStatus::Cancelled)
            .await
    }

    async fn set_requirement_status(
        &self,
        id: Uuid,
        status: RequirementStatus,
    ) -> OpsResult<FlightFuelRequirement> {
        let mut tx = self.store.begin().await?;
        let mut requirement = tx
            .requirement_for_update(id)
            .await?
            .ok_or_else(|| OpsError::not_found("Flight requirement", id))?;

        if requirement.status != status {
            let previous = requirement.status;
            requirement.status = status;
            tx.update_requirement(&requirement).await?;
            tx.commit().await?;
            info!(
                requirement_id = %id,
                from = %previous,
                to = %status,
                "requirement status changed"
            );
        }

        Ok(requirement)
    }
}
