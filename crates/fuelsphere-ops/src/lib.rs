//! Document state machines for flight fuel requirements, fuel orders,
//! deliveries and fueling operations, plus the read-side queries that sit next
//! to them.
//!
//! Every public operation opens one store transaction and commits it only
//! after all of its writes succeeded, so a failed call never leaves a partial
//! change behind.

mod facilities;
mod fueling;
mod orders;
mod queries;
mod requirements;

use std::sync::Arc;

use fuelsphere_core::OperationsStore;

pub use facilities::{LedgerReport, NewFacility};
pub use fueling::{FuelingOutcome, NewOperation};
pub use orders::{DeliveryReading, NewOrder, OrderCancellation};
pub use requirements::NewRequirement;

pub struct OperationsService<S> {
    store: Arc<S>,
}

impl<S> Clone for OperationsService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: OperationsStore> OperationsService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
