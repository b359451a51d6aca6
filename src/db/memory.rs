use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{AvailabilitySession, AvailabilityStore};
use crate::error::StoreError;
use crate::models::{AvailabilityRecord, AvailabilityUpdate};

/// In-process availability table keyed by date.
///
/// Counts opened and closed sessions, and can be told to fail connects or
/// statements, so the connection lifecycle is observable without a database.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Mutex<BTreeMap<String, AvailabilityRecord>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    connect_failure: Mutex<Option<String>>,
    query_failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `open` fail with the given detail.
    pub fn fail_connect(&self, detail: impl Into<String>) {
        *lock(&self.inner.connect_failure) = Some(detail.into());
    }

    /// Make every subsequent statement fail with the given detail.
    pub fn fail_queries(&self, detail: impl Into<String>) {
        *lock(&self.inner.query_failure) = Some(detail.into());
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored rows, ordered by date key.
    pub fn records(&self) -> Vec<AvailabilityRecord> {
        lock(&self.inner.rows).values().cloned().collect()
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn open(&self) -> Result<Box<dyn AvailabilitySession>, StoreError> {
        if let Some(detail) = lock(&self.inner.connect_failure).clone() {
            return Err(StoreError::Connect(detail));
        }

        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemorySession {
    inner: Arc<Inner>,
}

impl MemorySession {
    fn check_query(&self) -> Result<(), StoreError> {
        match lock(&self.inner.query_failure).clone() {
            Some(detail) => Err(StoreError::Query(detail)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AvailabilitySession for MemorySession {
    async fn fetch_all(&self) -> Result<Vec<AvailabilityRecord>, StoreError> {
        self.check_query()?;
        Ok(lock(&self.inner.rows).values().cloned().collect())
    }

    async fn upsert(&self, update: &AvailabilityUpdate) -> Result<AvailabilityRecord, StoreError> {
        self.check_query()?;

        let record = AvailabilityRecord {
            date_key: update.date_key.clone(),
            is_available: update.is_available,
            updated_at: Some(Utc::now()),
        };
        lock(&self.inner.rows).insert(record.date_key.clone(), record.clone());

        Ok(record)
    }

    async fn close(self: Box<Self>) {
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// A poisoned lock only means another test thread panicked mid-update; the map
// itself is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
