// Library root for the availability API

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod router;

// Re-export commonly used types
pub use db::{AvailabilityStore, MemoryStore, PgStore, SharedStore};
pub use error::{ApiError, StoreError};
pub use models::{AvailabilityRecord, AvailabilityUpdate, UpdateAvailabilityRequest, UpdateAvailabilityResponse};
pub use router::create_router;
