pub mod config;
pub mod contracts;
pub mod db;
pub mod pg_store;
pub mod redis_bus;

pub use config::ServiceConfig;
pub use contracts::{
    AvailableFuelQuery, AvailableFuelResponse, CompleteFuelingRequest, CreateOperationRequest,
    CreateRequirementRequest, OptimalSupplierQuery, PlaceOrderRequest, RecordDeliveryRequest,
    RegisterFacilityRequest,
};
pub use db::{connect_database, ensure_schema};
pub use pg_store::PgStore;
pub use redis_bus::RedisBus;
