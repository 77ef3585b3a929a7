pub mod error;
pub mod events;
pub mod models;
pub mod numbering;
pub mod storage;

pub use error::{OpsError, OpsResult, StoreError};
pub use events::{FuelEvent, FuelEventKind};
pub use models::{
    ContractQuery, ContractStatus, DEFAULT_CURRENCY, DeliveryStatus, FlightFuelRequirement,
    FuelDelivery, FuelOrder, FuelingOperation, InventoryTransaction, InventoryTransactionType,
    OperationStatus, OrderPriority, OrderStatus, RequirementStatus, StorageFacility, Supplier,
    SupplierContract,
};
pub use numbering::{DocumentKind, format_document_number, next_document_number};
pub use storage::{OperationsStore, StoreTx};
