use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use fuelsphere_core::{
    FlightFuelRequirement, FuelDelivery, FuelEvent, FuelOrder, FuelingOperation,
    InventoryTransaction, OperationsStore, OpsError, StorageFacility,
};
use fuelsphere_finance::{FuelCostBreakdown, SupplierQuote};
use fuelsphere_ops::{
    DeliveryReading, LedgerReport, NewFacility, NewOperation, NewOrder, NewRequirement,
    OperationsService, OrderCancellation,
};
use fuelsphere_platform::{
    AvailableFuelQuery, AvailableFuelResponse, CompleteFuelingRequest, CreateOperationRequest,
    CreateRequirementRequest, OptimalSupplierQuery, PlaceOrderRequest, RecordDeliveryRequest,
    RedisBus, RegisterFacilityRequest,
};
use tracing::error;
use uuid::Uuid;

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub struct AppState<S> {
    pub ops: OperationsService<S>,
    pub events: Option<RedisBus>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ops: self.ops.clone(),
            events: self.events.clone(),
        }
    }
}

pub fn router<S: OperationsStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/requirements", post(create_requirement::<S>))
        .route("/requirements/{id}/confirm", post(confirm_requirement::<S>))
        .route("/requirements/{id}/cancel", post(cancel_requirement::<S>))
        .route("/requirements/{id}/cost", get(flight_fuel_cost::<S>))
        .route("/orders", post(place_order::<S>))
        .route("/orders/{id}/confirm", post(confirm_order::<S>))
        .route("/orders/{id}/cancel", post(cancel_order::<S>))
        .route(
            "/orders/{id}/deliveries",
            post(record_delivery::<S>).get(order_deliveries::<S>),
        )
        .route("/deliveries/{id}/verify", post(verify_delivery::<S>))
        .route("/deliveries/{id}/dispute", post(dispute_delivery::<S>))
        .route("/operations", post(create_operation::<S>))
        .route("/operations/{id}/start", post(start_fueling::<S>))
        .route("/operations/{id}/complete", post(complete_fueling::<S>))
        .route("/facilities", post(register_facility::<S>))
        .route(
            "/facilities/{id}/transactions",
            get(facility_transactions::<S>),
        )
        .route(
            "/facilities/{id}/ledger/verify",
            get(verify_facility_ledger::<S>),
        )
        .route("/fuel/available", get(available_fuel::<S>))
        .route("/fuel/optimal-supplier", get(optimal_supplier::<S>))
        .with_state(state)
}

fn ops_error(err: OpsError) -> (StatusCode, String) {
    let status = match &err {
        OpsError::NotFound { .. } => StatusCode::NOT_FOUND,
        OpsError::Conflict(_) | OpsError::Invalid(_) => StatusCode::BAD_REQUEST,
        OpsError::Store(_) => {
            error!("store failure: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Committed work is never rolled back because a notification failed.
async fn publish<S>(state: &AppState<S>, event: FuelEvent) {
    let Some(bus) = &state.events else {
        return;
    };
    if let Err(err) = bus.publish_event(&event).await {
        error!(
            channel = event.kind.channel(),
            document = %event.document_number,
            "failed to publish event: {err}"
        );
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn create_requirement<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<CreateRequirementRequest>,
) -> ApiResult<(StatusCode, Json<FlightFuelRequirement>)> {
    let requirement = state
        .ops
        .create_requirement(NewRequirement {
            flight_number: payload.flight_number,
            fuel_type_id: payload.fuel_type_id,
            requested_volume: payload.requested_volume,
            currency: payload.currency,
        })
        .await
        .map_err(ops_error)?;
    Ok((StatusCode::CREATED, Json(requirement)))
}

async fn confirm_requirement<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FlightFuelRequirement>> {
    let requirement = state.ops.confirm_requirement(id).await.map_err(ops_error)?;
    Ok(Json(requirement))
}

async fn cancel_requirement<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FlightFuelRequirement>> {
    let requirement = state.ops.cancel_requirement(id).await.map_err(ops_error)?;
    Ok(Json(requirement))
}

async fn flight_fuel_cost<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelCostBreakdown>> {
    let cost = state.ops.flight_fuel_cost(id).await.map_err(ops_error)?;
    Ok(Json(cost))
}

async fn place_order<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> ApiResult<(StatusCode, Json<FuelOrder>)> {
    let order = state
        .ops
        .place_order(NewOrder {
            requirement_id: payload.requirement_id,
            supplier_id: payload.supplier_id,
            contract_id: payload.contract_id,
            fuel_type_id: payload.fuel_type_id,
            ordered_volume: payload.ordered_volume,
            unit_price: payload.unit_price,
            total_amount: payload.total_amount,
            currency: payload.currency,
            priority: payload.priority,
            submit: payload.submit,
        })
        .await
        .map_err(ops_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn confirm_order<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelOrder>> {
    let order = state.ops.confirm_order(id).await.map_err(ops_error)?;
    Ok(Json(order))
}

async fn cancel_order<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelOrder>> {
    let cancellation = state.ops.cancel_order(id).await.map_err(ops_error)?;
    if let Some(event) = cancellation_event(&cancellation) {
        publish(&state, event).await;
    }
    Ok(Json(cancellation.order))
}

/// Repeating a cancel is a no-op and must not announce the order again.
fn cancellation_event(cancellation: &OrderCancellation) -> Option<FuelEvent> {
    cancellation
        .cancelled_now
        .then(|| FuelEvent::order_cancelled(&cancellation.order))
}

async fn record_delivery<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordDeliveryRequest>,
) -> ApiResult<(StatusCode, Json<FuelDelivery>)> {
    let delivery = state
        .ops
        .record_delivery(
            id,
            DeliveryReading {
                volume: payload.volume,
                temperature: payload.temperature,
                density: payload.density,
            },
        )
        .await
        .map_err(ops_error)?;
    publish(&state, FuelEvent::delivery_recorded(&delivery)).await;
    Ok((StatusCode::CREATED, Json(delivery)))
}

async fn order_deliveries<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<FuelDelivery>>> {
    let deliveries = state.ops.deliveries_for_order(id).await.map_err(ops_error)?;
    Ok(Json(deliveries))
}

async fn verify_delivery<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelDelivery>> {
    let delivery = state.ops.verify_delivery(id).await.map_err(ops_error)?;
    Ok(Json(delivery))
}

async fn dispute_delivery<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelDelivery>> {
    let delivery = state.ops.dispute_delivery(id).await.map_err(ops_error)?;
    Ok(Json(delivery))
}

async fn create_operation<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<CreateOperationRequest>,
) -> ApiResult<(StatusCode, Json<FuelingOperation>)> {
    let operation = state
        .ops
        .create_operation(NewOperation {
            storage_facility_id: payload.storage_facility_id,
            aircraft_registration: payload.aircraft_registration,
        })
        .await
        .map_err(ops_error)?;
    Ok((StatusCode::CREATED, Json(operation)))
}

async fn start_fueling<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FuelingOperation>> {
    let operation = state.ops.start_fueling(id).await.map_err(ops_error)?;
    Ok(Json(operation))
}

async fn complete_fueling<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteFuelingRequest>,
) -> ApiResult<Json<FuelingOperation>> {
    let outcome = state
        .ops
        .complete_fueling(id, payload.volume_dispensed)
        .await
        .map_err(ops_error)?;

    publish(&state, FuelEvent::fueling_completed(&outcome.operation)).await;
    if let Some(entry) = &outcome.ledger_entry {
        publish(&state, FuelEvent::inventory_posted(entry)).await;
    }
    Ok(Json(outcome.operation))
}

async fn register_facility<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Json(payload): Json<RegisterFacilityRequest>,
) -> ApiResult<(StatusCode, Json<StorageFacility>)> {
    let facility = state
        .ops
        .register_facility(NewFacility {
            name: payload.name,
            airport_id: payload.airport_id,
            fuel_type_id: payload.fuel_type_id,
            capacity: payload.capacity,
            initial_level: payload.initial_level,
            is_operational: payload.is_operational,
        })
        .await
        .map_err(ops_error)?;
    Ok((StatusCode::CREATED, Json(facility)))
}

async fn facility_transactions<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<InventoryTransaction>>> {
    let entries = state.ops.facility_transactions(id).await.map_err(ops_error)?;
    Ok(Json(entries))
}

async fn verify_facility_ledger<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LedgerReport>> {
    let report = state.ops.verify_facility_ledger(id).await.map_err(ops_error)?;
    Ok(Json(report))
}

async fn available_fuel<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<AvailableFuelQuery>,
) -> ApiResult<Json<AvailableFuelResponse>> {
    let volume = state
        .ops
        .available_fuel(&query.airport_id, &query.fuel_type_id)
        .await
        .map_err(ops_error)?;
    Ok(Json(AvailableFuelResponse {
        airport_id: query.airport_id,
        fuel_type_id: query.fuel_type_id,
        volume,
    }))
}

async fn optimal_supplier<S: OperationsStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<OptimalSupplierQuery>,
) -> ApiResult<Json<Option<SupplierQuote>>> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let quote = state
        .ops
        .optimal_supplier(&query.airport_id, &query.fuel_type_id, query.volume, as_of)
        .await
        .map_err(ops_error)?;
    Ok(Json(quote))
}
