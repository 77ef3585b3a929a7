use chrono::{NaiveDate, Utc};
use fuelsphere_core::{
    ContractStatus, DeliveryStatus, InventoryTransactionType, OperationStatus, OperationsStore,
    OpsError, OrderPriority, OrderStatus, RequirementStatus, StoreTx, Supplier, SupplierContract,
};
use fuelsphere_ops::{
    DeliveryReading, NewFacility, NewOperation, NewOrder, NewRequirement, OperationsService,
};
use fuelsphere_store::InMemoryStore;
use rust_decimal::Decimal;
use uuid::Uuid;

fn liters(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

async fn service_with_supplier() -> (OperationsService<InMemoryStore>, Supplier) {
    let supplier = Supplier {
        id: Uuid::new_v4(),
        name: "Air BP".to_string(),
    };
    let store = InMemoryStore::new();
    let mut tx = store.begin().await.unwrap();
    tx.insert_supplier(&supplier).await.unwrap();
    tx.commit().await.unwrap();
    (OperationsService::new(store), supplier)
}

fn order_for(supplier_id: Uuid, requirement_id: Option<Uuid>, total: Option<i64>) -> NewOrder {
    NewOrder {
        requirement_id,
        supplier_id,
        contract_id: None,
        fuel_type_id: "JET-A1".to_string(),
        ordered_volume: liters(1_000),
        unit_price: Decimal::new(90, 2),
        total_amount: total.map(liters),
        currency: None,
        priority: OrderPriority::Normal,
        submit: false,
    }
}

fn requirement() -> NewRequirement {
    NewRequirement {
        flight_number: "lh400".to_string(),
        fuel_type_id: "JET-A1".to_string(),
        requested_volume: liters(25_000),
        currency: None,
    }
}

fn tank(level: i64) -> NewFacility {
    NewFacility {
        name: "Hydrant tank 3".to_string(),
        airport_id: "fra".to_string(),
        fuel_type_id: "JET-A1".to_string(),
        capacity: Some(liters(100_000)),
        initial_level: liters(level),
        is_operational: true,
    }
}

fn reading(volume: i64) -> DeliveryReading {
    DeliveryReading {
        volume: liters(volume),
        temperature: liters(15),
        density: Decimal::new(8, 1),
    }
}

#[tokio::test]
async fn requirement_confirm_and_cancel() {
    let (ops, _) = service_with_supplier().await;
    let created = ops.create_requirement(requirement()).await.unwrap();
    assert_eq!(created.status, RequirementStatus::Open);
    assert_eq!(created.flight_number, "LH400");

    let confirmed = ops.confirm_requirement(created.id).await.unwrap();
    assert_eq!(confirmed.status, RequirementStatus::Confirmed);

    let cancelled = ops.cancel_requirement(created.id).await.unwrap();
    assert_eq!(cancelled.status, RequirementStatus::Cancelled);
}

#[tokio::test]
async fn missing_documents_are_not_found() {
    let (ops, _) = service_with_supplier().await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        ops.confirm_requirement(missing).await,
        Err(OpsError::NotFound { entity: "Flight requirement", .. })
    ));
    assert!(matches!(
        ops.cancel_order(missing).await,
        Err(OpsError::NotFound { entity: "Order", .. })
    ));
    assert!(matches!(
        ops.record_delivery(missing, reading(500)).await,
        Err(OpsError::NotFound { entity: "Order", .. })
    ));
    assert!(matches!(
        ops.start_fueling(missing).await,
        Err(OpsError::NotFound { entity: "Operation", .. })
    ));
    assert!(matches!(
        ops.complete_fueling(missing, liters(10)).await,
        Err(OpsError::NotFound { entity: "Operation", .. })
    ));
    assert!(matches!(
        ops.flight_fuel_cost(missing).await,
        Err(OpsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn placed_orders_get_numbers_and_totals() {
    let (ops, supplier) = service_with_supplier().await;
    let first = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();
    let second = ops
        .place_order(NewOrder {
            submit: true,
            currency: Some("eur".to_string()),
            ..order_for(supplier.id, None, Some(1_234))
        })
        .await
        .unwrap();

    let today = Utc::now().format("%Y%m%d").to_string();
    assert_eq!(first.order_number, format!("FO-{today}-0001"));
    assert_eq!(second.order_number, format!("FO-{today}-0002"));
    assert_eq!(first.status, OrderStatus::Draft);
    assert_eq!(first.total_amount, Some(liters(900)));
    assert_eq!(first.currency, "USD");
    assert_eq!(second.status, OrderStatus::Submitted);
    assert_eq!(second.total_amount, Some(liters(1_234)));
    assert_eq!(second.currency, "EUR");
}

#[tokio::test]
async fn placing_an_order_checks_references_and_values() {
    let (ops, supplier) = service_with_supplier().await;

    let unknown_supplier = ops.place_order(order_for(Uuid::new_v4(), None, None)).await;
    assert!(matches!(unknown_supplier, Err(OpsError::NotFound { entity: "Supplier", .. })));

    let unknown_requirement = ops
        .place_order(order_for(supplier.id, Some(Uuid::new_v4()), None))
        .await;
    assert!(matches!(
        unknown_requirement,
        Err(OpsError::NotFound { entity: "Flight requirement", .. })
    ));

    let empty = ops
        .place_order(NewOrder {
            ordered_volume: Decimal::ZERO,
            ..order_for(supplier.id, None, None)
        })
        .await;
    assert!(matches!(empty, Err(OpsError::Invalid(_))));

    let unpriceable = ops
        .place_order(NewOrder {
            ordered_volume: Decimal::MAX,
            unit_price: liters(2),
            ..order_for(supplier.id, None, None)
        })
        .await;
    assert!(matches!(unpriceable, Err(OpsError::Invalid(_))));
}

#[tokio::test]
async fn confirm_order_twice_is_idempotent() {
    let (ops, supplier) = service_with_supplier().await;
    let order = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();

    let once = ops.confirm_order(order.id).await.unwrap();
    let twice = ops.confirm_order(order.id).await.unwrap();

    assert_eq!(once.status, OrderStatus::Confirmed);
    assert_eq!(twice, once);
    assert!(ops.deliveries_for_order(order.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn record_delivery_fills_the_order() {
    let (ops, supplier) = service_with_supplier().await;
    let order = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Draft);

    let delivery = ops.record_delivery(order.id, reading(500)).await.unwrap();

    assert_eq!(delivery.order_id, order.id);
    assert_eq!(delivery.delivered_volume, liters(500));
    assert_eq!(delivery.temperature, liters(15));
    assert_eq!(delivery.density, Decimal::new(8, 1));
    assert_eq!(delivery.status, DeliveryStatus::Completed);
    assert!(delivery.delivery_number.starts_with("DL-"));

    let deliveries = ops.deliveries_for_order(order.id).await.unwrap();
    assert_eq!(deliveries, vec![delivery]);

    let mut tx = ops.store().begin().await.unwrap();
    let stored = tx.order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
    assert_eq!(stored.delivered_volume, Some(liters(500)));
    assert!(stored.actual_delivery_date.is_some());
}

#[tokio::test]
async fn delivered_orders_cannot_be_cancelled() {
    let (ops, supplier) = service_with_supplier().await;
    let order = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();
    ops.record_delivery(order.id, reading(1_000)).await.unwrap();

    let err = ops.cancel_order(order.id).await.unwrap_err();
    assert!(matches!(
        err,
        OpsError::Conflict(ref message) if message == "Cannot cancel a delivered order"
    ));

    let mut tx = ops.store().begin().await.unwrap();
    let stored = tx.order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn undelivered_orders_can_be_cancelled() {
    let (ops, supplier) = service_with_supplier().await;
    let order = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();
    ops.confirm_order(order.id).await.unwrap();

    let cancelled = ops.cancel_order(order.id).await.unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_now);

    let again = ops.cancel_order(order.id).await.unwrap();
    assert_eq!(again.order.status, OrderStatus::Cancelled);
    assert!(!again.cancelled_now);
}

#[tokio::test]
async fn delivery_status_can_be_corrected() {
    let (ops, supplier) = service_with_supplier().await;
    let order = ops.place_order(order_for(supplier.id, None, None)).await.unwrap();
    let delivery = ops.record_delivery(order.id, reading(750)).await.unwrap();

    let disputed = ops.dispute_delivery(delivery.id).await.unwrap();
    assert_eq!(disputed.status, DeliveryStatus::Disputed);
    let verified = ops.verify_delivery(delivery.id).await.unwrap();
    assert_eq!(verified.status, DeliveryStatus::Verified);
    assert_eq!(verified.delivered_volume, liters(750));

    assert!(matches!(
        ops.verify_delivery(Uuid::new_v4()).await,
        Err(OpsError::NotFound { entity: "Delivery", .. })
    ));
}

#[tokio::test]
async fn fueling_dispenses_from_the_facility_ledger() {
    let (ops, _) = service_with_supplier().await;
    let facility = ops.register_facility(tank(20_000)).await.unwrap();
    assert_eq!(facility.airport_id, "FRA");

    let operation = ops
        .create_operation(NewOperation {
            storage_facility_id: Some(facility.id),
            aircraft_registration: Some("d-aiml".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(operation.status, OperationStatus::Pending);
    assert!(operation.operation_number.starts_with("OP-"));

    let started = ops.start_fueling(operation.id).await.unwrap();
    assert_eq!(started.status, OperationStatus::InProgress);
    assert!(started.start_time.is_some());

    let outcome = ops.complete_fueling(operation.id, liters(6_500)).await.unwrap();
    assert_eq!(outcome.operation.status, OperationStatus::Completed);
    assert_eq!(outcome.operation.volume_dispensed, Some(liters(6_500)));
    assert!(outcome.operation.end_time.is_some());

    let entry = outcome.ledger_entry.expect("dispense posted");
    assert_eq!(entry.transaction_type, InventoryTransactionType::Dispense);
    assert_eq!(entry.volume, liters(-6_500));
    assert_eq!(entry.balance_before, liters(20_000));
    assert_eq!(entry.balance_after, liters(13_500));
    assert_eq!(entry.reference_doc, operation.operation_number);

    let ledger = ops.facility_transactions(facility.id).await.unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].transaction_type, InventoryTransactionType::Adjustment);
    assert_eq!(ledger[0].reference_doc, "OPENING-BALANCE");
    assert_eq!(ledger[1], entry);
    assert_eq!(fuelsphere_inventory::verify_chain(&ledger), Ok(Some(liters(13_500))));

    assert_eq!(ops.available_fuel("FRA", "JET-A1").await.unwrap(), liters(13_500));
}

#[tokio::test]
async fn fueling_without_facility_posts_nothing() {
    let (ops, _) = service_with_supplier().await;
    let facility = ops.register_facility(tank(5_000)).await.unwrap();
    let operation = ops.create_operation(NewOperation::default()).await.unwrap();

    let outcome = ops.complete_fueling(operation.id, liters(1_200)).await.unwrap();

    assert_eq!(outcome.operation.status, OperationStatus::Completed);
    assert!(outcome.ledger_entry.is_none());
    assert_eq!(ops.facility_transactions(facility.id).await.unwrap().len(), 1);
    assert_eq!(ops.available_fuel("FRA", "JET-A1").await.unwrap(), liters(5_000));
}

#[tokio::test]
async fn fueling_can_complete_without_being_started() {
    let (ops, _) = service_with_supplier().await;
    let operation = ops.create_operation(NewOperation::default()).await.unwrap();

    let outcome = ops.complete_fueling(operation.id, liters(300)).await.unwrap();
    assert_eq!(outcome.operation.status, OperationStatus::Completed);
    assert!(outcome.operation.start_time.is_none());
}

#[tokio::test]
async fn fueling_from_unknown_facility_is_rejected_at_creation() {
    let (ops, _) = service_with_supplier().await;
    let result = ops
        .create_operation(NewOperation {
            storage_facility_id: Some(Uuid::new_v4()),
            aircraft_registration: None,
        })
        .await;
    assert!(matches!(result, Err(OpsError::NotFound { entity: "Storage facility", .. })));
}

#[tokio::test]
async fn flight_cost_sums_linked_orders() {
    let (ops, supplier) = service_with_supplier().await;
    let req = ops.create_requirement(requirement()).await.unwrap();
    ops.place_order(order_for(supplier.id, Some(req.id), Some(1_000)))
        .await
        .unwrap();
    ops.place_order(order_for(supplier.id, Some(req.id), Some(2_000)))
        .await
        .unwrap();
    ops.place_order(order_for(supplier.id, None, Some(5_000)))
        .await
        .unwrap();

    let cost = ops.flight_fuel_cost(req.id).await.unwrap();
    assert_eq!(cost.fuel_cost, liters(3_000));
    assert_eq!(cost.taxes, liters(150));
    assert_eq!(cost.fees, liters(60));
    assert_eq!(cost.total_cost, liters(3_210));
    assert_eq!(cost.currency, "USD");
}

#[tokio::test]
async fn optimal_supplier_prefers_the_cheaper_contract() {
    let (ops, supplier) = service_with_supplier().await;
    let contract = |cents| SupplierContract {
        id: Uuid::new_v4(),
        supplier_id: supplier.id,
        fuel_type_id: "JET-A1".to_string(),
        valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        valid_to: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        min_volume: liters(100),
        max_volume: liters(10_000),
        price_per_liter: Decimal::new(cents, 2),
        currency: Some("USD".to_string()),
        status: ContractStatus::Active,
    };
    let expensive = contract(90);
    let cheap = contract(85);
    let mut tx = ops.store().begin().await.unwrap();
    tx.insert_contract(&expensive).await.unwrap();
    tx.insert_contract(&cheap).await.unwrap();
    tx.commit().await.unwrap();

    let as_of = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let quote = ops
        .optimal_supplier("FRA", "JET-A1", liters(1_000), as_of)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quote.contract_id, cheap.id);
    assert_eq!(quote.supplier_name, "Air BP");
    assert_eq!(quote.estimated_total, liters(850));

    let none = ops
        .optimal_supplier("FRA", "JET-A1", liters(50_000), as_of)
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn facility_registration_validates_levels() {
    let (ops, _) = service_with_supplier().await;

    let overfull = ops
        .register_facility(NewFacility {
            initial_level: liters(200_000),
            ..tank(0)
        })
        .await;
    assert!(matches!(overfull, Err(OpsError::Invalid(_))));

    let empty = ops.register_facility(tank(0)).await.unwrap();
    assert_eq!(empty.current_level, Some(Decimal::ZERO));
    assert!(ops.facility_transactions(empty.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fueling_keeps_the_ledger_linear() {
    let (ops, _) = service_with_supplier().await;
    let facility = ops.register_facility(tank(90_000)).await.unwrap();

    let mut operations = Vec::new();
    for _ in 0..16 {
        operations.push(
            ops.create_operation(NewOperation {
                storage_facility_id: Some(facility.id),
                aircraft_registration: None,
            })
            .await
            .unwrap(),
        );
    }

    let mut handles = Vec::new();
    for (i, operation) in operations.into_iter().enumerate() {
        let ops = ops.clone();
        handles.push(tokio::spawn(async move {
            ops.complete_fueling(operation.id, liters(100 * (i as i64 + 1)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let ledger = ops.facility_transactions(facility.id).await.unwrap();
    let dispensed: i64 = (1..=16).map(|i| 100 * i).sum();
    assert_eq!(ledger.len(), 17);
    assert_eq!(
        fuelsphere_inventory::verify_chain(&ledger),
        Ok(Some(liters(90_000 - dispensed)))
    );
    assert_eq!(
        ops.available_fuel("FRA", "JET-A1").await.unwrap(),
        liters(90_000 - dispensed)
    );
}

#[tokio::test]
async fn ledger_audit_flags_levels_written_outside_the_ledger() {
    let (ops, _) = service_with_supplier().await;
    let facility = ops.register_facility(tank(5_000)).await.unwrap();
    let operation = ops
        .create_operation(NewOperation {
            storage_facility_id: Some(facility.id),
            aircraft_registration: Some("D-AIMA".to_string()),
        })
        .await
        .unwrap();
    ops.complete_fueling(operation.id, liters(1_200)).await.unwrap();

    let report = ops.verify_facility_ledger(facility.id).await.unwrap();
    assert!(report.consistent);
    assert_eq!(report.entries, 2);
    assert_eq!(report.closing_balance, Some(liters(3_800)));

    let mut tx = ops.store().begin().await.unwrap();
    tx.set_facility_level(facility.id, liters(4_000)).await.unwrap();
    tx.commit().await.unwrap();

    let report = ops.verify_facility_ledger(facility.id).await.unwrap();
    assert!(!report.consistent);
    assert_eq!(report.current_level, liters(4_000));
    assert!(report.problem.is_some());

    assert!(matches!(
        ops.verify_facility_ledger(Uuid::new_v4()).await,
        Err(OpsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn dispensing_past_the_decimal_range_is_rejected() {
    let (ops, _) = service_with_supplier().await;
    let facility = ops.register_facility(tank(0)).await.unwrap();
    let from_tank = || NewOperation {
        storage_facility_id: Some(facility.id),
        aircraft_registration: None,
    };

    let first = ops.create_operation(from_tank()).await.unwrap();
    let outcome = ops.complete_fueling(first.id, Decimal::MAX).await.unwrap();
    assert_eq!(outcome.ledger_entry.unwrap().balance_after, -Decimal::MAX);

    let second = ops.create_operation(from_tank()).await.unwrap();
    let err = ops.complete_fueling(second.id, Decimal::MAX).await.unwrap_err();
    assert!(matches!(err, OpsError::Invalid(_)));

    let mut tx = ops.store().begin().await.unwrap();
    assert_eq!(tx.inventory_transactions(facility.id).await.unwrap().len(), 1);
    let untouched = tx.operation_for_update(second.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, OperationStatus::Pending);
}
