//! Storage boundary for availability records.
//!
//! Handlers never hold a connection between requests. Each request calls
//! [`AvailabilityStore::open`], runs exactly one statement on the returned
//! session, then hands the session back through [`AvailabilitySession::close`]
//! whether or not the statement succeeded.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{AvailabilityRecord, AvailabilityUpdate};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store handle shared by all request handlers.
pub type SharedStore = Arc<dyn AvailabilityStore>;

/// Opens one storage session per request.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn open(&self) -> Result<Box<dyn AvailabilitySession>, StoreError>;
}

/// A single live connection to the availability table.
#[async_trait]
pub trait AvailabilitySession: Send + Sync {
    /// Every stored record, in storage order.
    async fn fetch_all(&self) -> Result<Vec<AvailabilityRecord>, StoreError>;

    /// Insert the record, or overwrite the flag and refresh `updated_at` when the
    /// date key already exists. Returns the persisted row.
    async fn upsert(&self, update: &AvailabilityUpdate) -> Result<AvailabilityRecord, StoreError>;

    /// Release the connection. Never fails; problems are only logged.
    async fn close(self: Box<Self>);
}
