//! Backend-agnostic checks for [`OperationsStore`] implementations.
//!
//! Every backend runs the same suite through [`run_conformance_suite`], handing
//! in a factory that opens a store. Cases create their own rows under fresh ids
//! and sequence scopes, so a factory may hand out a shared database.
//!
//! ```ignore
//! let report = run_conformance_suite(|| async { PgStore::new(pool.clone()) }).await;
//! assert_eq!(report.failed, 0, "{report}");
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use fuelsphere_core::{
    FlightFuelRequirement, InventoryTransaction, InventoryTransactionType, OperationsStore,
    RequirementStatus, StorageFacility, StoreError, StoreTx,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Writers racing on one row or one sequence scope.
const WRITERS: usize = 8;

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub name: &'static str,
    pub message: Option<String>,
}

impl CaseResult {
    fn new(name: &'static str, result: Result<(), String>) -> Self {
        Self {
            name,
            message: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.message.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<CaseResult>,
    pub failed: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "store conformance: {}/{} passed",
            self.results.len() - self.failed,
            self.results.len()
        )?;
        for result in &self.results {
            if let Some(message) = &result.message {
                writeln!(f, "  FAIL {}: {message}", result.name)?;
            }
        }
        Ok(())
    }
}

/// Runs every case against a store produced by `factory`.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: OperationsStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let results = vec![
        CaseResult::new(
            "committed_writes_are_visible",
            committed_writes_are_visible(factory().await).await,
        ),
        CaseResult::new(
            "dropped_transaction_leaves_nothing_behind",
            dropped_transaction_leaves_nothing_behind(factory().await).await,
        ),
        CaseResult::new(
            "sequence_starts_at_floor_and_never_goes_back",
            sequence_starts_at_floor_and_never_goes_back(factory().await).await,
        ),
        CaseResult::new(
            "concurrent_sequences_never_repeat",
            concurrent_sequences_never_repeat(factory().await).await,
        ),
        CaseResult::new(
            "updates_of_unknown_rows_report_missing",
            updates_of_unknown_rows_report_missing(factory().await).await,
        ),
        CaseResult::new(
            "locked_facility_updates_serialize",
            locked_facility_updates_serialize(factory().await).await,
        ),
    ];
    let failed = results.iter().filter(|r| !r.passed()).count();
    ConformanceReport { results, failed }
}

fn store_err(step: &str) -> impl Fn(StoreError) -> String + '_ {
    move |err| format!("{step}: {err}")
}

fn requirement() -> FlightFuelRequirement {
    FlightFuelRequirement {
        id: Uuid::new_v4(),
        flight_number: "LH400".to_string(),
        fuel_type_id: "JET-A1".to_string(),
        requested_volume: Decimal::new(12_000, 0),
        currency: None,
        status: RequirementStatus::Open,
        created_at: Utc::now().trunc_subsecs(6),
    }
}

fn facility() -> StorageFacility {
    StorageFacility {
        id: Uuid::new_v4(),
        name: "Tank Farm North".to_string(),
        airport_id: format!("T{}", &Uuid::new_v4().simple().to_string()[..3]),
        fuel_type_id: "JET-A1".to_string(),
        capacity: None,
        current_level: Some(Decimal::ZERO),
        is_operational: true,
    }
}

fn scope(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn committed_writes_are_visible<S: OperationsStore>(store: S) -> Result<(), String> {
    let requirement = requirement();

    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    tx.insert_requirement(&requirement)
        .await
        .map_err(store_err("insert"))?;
    tx.commit().await.map_err(store_err("commit"))?;

    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    let found = tx
        .requirement(requirement.id)
        .await
        .map_err(store_err("read back"))?;
    if found.as_ref() != Some(&requirement) {
        return Err(format!("expected {requirement:?}, read {found:?}"));
    }
    Ok(())
}

async fn dropped_transaction_leaves_nothing_behind<S: OperationsStore>(
    store: S,
) -> Result<(), String> {
    let requirement = requirement();
    let facility = facility();
    let scope = scope("ROLLBACK");

    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    tx.insert_requirement(&requirement)
        .await
        .map_err(store_err("insert requirement"))?;
    tx.insert_facility(&facility)
        .await
        .map_err(store_err("insert facility"))?;
    tx.next_sequence(&scope, 1)
        .await
        .map_err(store_err("sequence"))?;
    drop(tx);

    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    if tx
        .requirement(requirement.id)
        .await
        .map_err(store_err("read requirement"))?
        .is_some()
    {
        return Err("requirement survived the rollback".to_string());
    }
    if tx
        .facility(facility.id)
        .await
        .map_err(store_err("read facility"))?
        .is_some()
    {
        return Err("facility survived the rollback".to_string());
    }
    let next = tx
        .next_sequence(&scope, 1)
        .await
        .map_err(store_err("sequence"))?;
    if next != 1 {
        return Err(format!("sequence advanced by a rolled back transaction: {next}"));
    }
    Ok(())
}

async fn sequence_starts_at_floor_and_never_goes_back<S: OperationsStore>(
    store: S,
) -> Result<(), String> {
    let scope = scope("FLOOR");
    let mut tx = store.begin().await.map_err(store_err("begin"))?;

    let mut seen = Vec::new();
    for floor in [1_000, 1_000, 1, 5_000, 1] {
        seen.push(
            tx.next_sequence(&scope, floor)
                .await
                .map_err(store_err("sequence"))?,
        );
    }
    tx.commit().await.map_err(store_err("commit"))?;

    if seen != [1_000, 1_001, 1_002, 5_000, 5_001] {
        return Err(format!("unexpected sequence values {seen:?}"));
    }
    Ok(())
}

async fn concurrent_sequences_never_repeat<S: OperationsStore>(store: S) -> Result<(), String> {
    let store = Arc::new(store);
    let scope = scope("RACE");

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let store = store.clone();
        let scope = scope.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await?;
            let value = tx.next_sequence(&scope, 1).await?;
            tx.commit().await?;
            Ok::<i64, StoreError>(value)
        }));
    }

    let mut values = BTreeSet::new();
    for handle in handles {
        let value = handle
            .await
            .map_err(|err| format!("writer panicked: {err}"))?
            .map_err(store_err("writer"))?;
        if !values.insert(value) {
            return Err(format!("sequence value {value} handed out twice"));
        }
    }

    let expected: BTreeSet<i64> = (1..=WRITERS as i64).collect();
    if values != expected {
        return Err(format!("expected {expected:?}, got {values:?}"));
    }
    Ok(())
}

async fn updates_of_unknown_rows_report_missing<S: OperationsStore>(
    store: S,
) -> Result<(), String> {
    let mut tx = store.begin().await.map_err(store_err("begin"))?;

    match tx.update_requirement(&requirement()).await {
        Err(StoreError::Missing { .. }) => {}
        other => return Err(format!("update_requirement on unknown id returned {other:?}")),
    }
    match tx.set_facility_level(Uuid::new_v4(), Decimal::ONE).await {
        Err(StoreError::Missing { .. }) => {}
        other => return Err(format!("set_facility_level on unknown id returned {other:?}")),
    }
    Ok(())
}

/// Each writer locks the facility, books one receipt and moves the level. The
/// row lock must serialize them so the ledger reads back as one chain.
async fn locked_facility_updates_serialize<S: OperationsStore>(store: S) -> Result<(), String> {
    let store = Arc::new(store);
    let facility = facility();
    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    tx.insert_facility(&facility)
        .await
        .map_err(store_err("insert facility"))?;
    tx.commit().await.map_err(store_err("commit"))?;

    let mut handles = Vec::new();
    for i in 0..WRITERS {
        let store = store.clone();
        let facility_id = facility.id;
        handles.push(tokio::spawn(async move {
            let mut tx = store.begin().await?;
            let locked = tx.facility_for_update(facility_id).await?.ok_or(
                StoreError::Missing {
                    table: "storage_facilities",
                    id: facility_id,
                },
            )?;
            let volume = Decimal::from(100 * (i as i64 + 1));
            let entry = InventoryTransaction {
                id: Uuid::new_v4(),
                transaction_number: format!("IT-{}", Uuid::new_v4().simple()),
                storage_facility_id: facility_id,
                transaction_type: InventoryTransactionType::Receipt,
                volume,
                balance_before: locked.level(),
                balance_after: locked.level() + volume,
                reference_doc: format!("RECEIPT-{i}"),
                transaction_date: Utc::now(),
            };
            tx.insert_inventory_transaction(&entry).await?;
            tx.set_facility_level(facility_id, entry.balance_after)
                .await?;
            tx.commit().await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|err| format!("writer panicked: {err}"))?
            .map_err(store_err("writer"))?;
    }

    let mut tx = store.begin().await.map_err(store_err("begin"))?;
    let ledger = tx
        .inventory_transactions(facility.id)
        .await
        .map_err(store_err("read ledger"))?;
    let level = tx
        .facility(facility.id)
        .await
        .map_err(store_err("read facility"))?
        .map(|f| f.level());

    if ledger.len() != WRITERS {
        return Err(format!("expected {WRITERS} entries, read {}", ledger.len()));
    }
    let mut running = Decimal::ZERO;
    for entry in &ledger {
        if entry.balance_before != running {
            return Err(format!(
                "{} opens at {} after a balance of {running}",
                entry.transaction_number, entry.balance_before
            ));
        }
        running = entry.balance_after;
    }
    let expected = Decimal::from((1..=WRITERS as i64).map(|i| 100 * i).sum::<i64>());
    if running != expected || level != Some(expected) {
        return Err(format!(
            "ledger closes at {running}, level is {level:?}, expected {expected}"
        ));
    }
    Ok(())
}
