//! Postgres backend validation.
//!
//! These tests need a reachable database and are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/fuelsphere cargo test -p fuelsphere-platform -- --ignored
//! ```
//!
//! The schema is applied on every run. Rows are created under fresh ids, so the
//! database does not have to be empty.

use std::env;

use fuelsphere_core::{OperationsStore, StoreError, StoreTx};
use fuelsphere_ops::{NewFacility, NewOperation, OperationsService};
use fuelsphere_platform::{PgStore, connect_database, ensure_schema};
use fuelsphere_store::conformance::run_conformance_suite;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the database cannot be reached.
async fn pool() -> PgPool {
    let url = env::var("DATABASE_URL")
        .expect("DATABASE_URL not set - Postgres tests need a running database");
    let pool = connect_database(&url, 16)
        .await
        .expect("failed to connect to Postgres");
    ensure_schema(&pool).await.expect("failed to apply schema");
    pool
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn postgres_store_conforms() {
    let pool = pool().await;
    let report = run_conformance_suite(|| {
        let pool = pool.clone();
        async move { PgStore::new(pool) }
    })
    .await;
    assert_eq!(report.failed, 0, "{report}");
}

#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn schema_can_be_applied_twice() {
    let pool = pool().await;
    ensure_schema(&pool).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn concurrent_fueling_keeps_the_ledger_linear() {
    let ops = OperationsService::new(PgStore::new(pool().await));
    let airport = format!("P{}", &Uuid::new_v4().simple().to_string()[..3]);
    let facility = ops
        .register_facility(NewFacility {
            name: "Hydrant North".to_string(),
            airport_id: airport.clone(),
            fuel_type_id: "JET-A1".to_string(),
            capacity: None,
            initial_level: Decimal::new(50_000, 0),
            is_operational: true,
        })
        .await
        .unwrap();

    let mut operations = Vec::new();
    for _ in 0..12 {
        operations.push(
            ops.create_operation(NewOperation {
                storage_facility_id: Some(facility.id),
                aircraft_registration: Some("D-AIMA".to_string()),
            })
            .await
            .unwrap(),
        );
    }

    let mut handles = Vec::new();
    for (i, operation) in operations.into_iter().enumerate() {
        let ops = ops.clone();
        handles.push(tokio::spawn(async move {
            ops.complete_fueling(operation.id, Decimal::from(250 * (i as i64 + 1)))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let dispensed: i64 = (1..=12).map(|i| 250 * i).sum();
    let expected = Decimal::from(50_000 - dispensed);
    let ledger = ops.facility_transactions(facility.id).await.unwrap();
    assert_eq!(ledger.len(), 13);
    assert_eq!(fuelsphere_inventory::verify_chain(&ledger), Ok(Some(expected)));

    let report = ops.verify_facility_ledger(facility.id).await.unwrap();
    assert!(report.consistent, "{report:?}");
    assert_eq!(report.current_level, expected);
    assert_eq!(ops.available_fuel(&airport, "JET-A1").await.unwrap(), expected);
}

#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn failed_fueling_rolls_back_the_operation() {
    let ops = OperationsService::new(PgStore::new(pool().await));
    let facility = ops
        .register_facility(NewFacility {
            name: "Hydrant South".to_string(),
            airport_id: format!("P{}", &Uuid::new_v4().simple().to_string()[..3]),
            fuel_type_id: "JET-A1".to_string(),
            capacity: None,
            initial_level: Decimal::ZERO,
            is_operational: true,
        })
        .await
        .unwrap();
    let operation = ops
        .create_operation(NewOperation {
            storage_facility_id: Some(facility.id),
            aircraft_registration: None,
        })
        .await
        .unwrap();
    ops.complete_fueling(operation.id, Decimal::MAX).await.unwrap();

    let second = ops
        .create_operation(NewOperation {
            storage_facility_id: Some(facility.id),
            aircraft_registration: None,
        })
        .await
        .unwrap();
    assert!(ops.complete_fueling(second.id, Decimal::MAX).await.is_err());

    let mut tx = ops.store().begin().await.unwrap();
    let stored = tx.operation_for_update(second.id).await.unwrap().unwrap();
    assert_eq!(stored.status, second.status);
    assert_eq!(stored.volume_dispensed, None);
    assert_eq!(tx.inventory_transactions(facility.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn unknown_rows_are_reported_missing() {
    let store = PgStore::new(pool().await);
    let mut tx = store.begin().await.unwrap();
    assert!(tx.order(Uuid::new_v4()).await.unwrap().is_none());
    let err = tx
        .set_facility_level(Uuid::new_v4(), Decimal::ONE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Missing {
            table: "storage_facilities",
            ..
        }
    ));
}
