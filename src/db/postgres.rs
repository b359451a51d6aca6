use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Row};
use tracing::{debug, error, info, warn};

use super::{AvailabilitySession, AvailabilityStore};
use crate::error::StoreError;
use crate::models::{AvailabilityRecord, AvailabilityUpdate};

const CREATE_AVAILABILITY_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS availability (
        id SERIAL PRIMARY KEY,
        date_key TEXT NOT NULL UNIQUE,
        is_available BOOLEAN NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

// updated_at is cast so tables declared with plain TIMESTAMP decode the same way.
const SELECT_ALL: &str = "SELECT date_key, is_available, updated_at::timestamptz FROM availability";

const UPSERT: &str = r#"
    INSERT INTO availability (date_key, is_available, updated_at)
    VALUES ($1, $2, CURRENT_TIMESTAMP)
    ON CONFLICT (date_key)
    DO UPDATE SET
        is_available = EXCLUDED.is_available,
        updated_at = CURRENT_TIMESTAMP
    RETURNING date_key, is_available, updated_at::timestamptz
"#;

/// Connection factory for PostgreSQL.
/// Holds only the parsed connection settings; no connection outlives a request.
#[derive(Clone)]
pub struct PgStore {
    config: tokio_postgres::Config,
    tls: MakeTlsConnector,
}

impl PgStore {
    /// `sslmode` from the connection string decides whether TLS is negotiated;
    /// the connector is always available for hosts such as Neon that require it.
    pub fn new(config: tokio_postgres::Config) -> Result<Self, StoreError> {
        let tls_connector = TlsConnector::builder().build().map_err(|e| {
            error!("Failed to create TLS connector: {}", e);
            StoreError::Connect(format!("TLS connector creation failed: {}", e))
        })?;

        Ok(PgStore {
            config,
            tls: MakeTlsConnector::new(tls_connector),
        })
    }

    /// Open a dedicated connection. The connection driver runs on its own task
    /// until the returned session is closed or dropped.
    pub async fn connect(&self) -> Result<PgSession, StoreError> {
        let (client, connection) = self
            .config
            .connect(self.tls.clone())
            .await
            .map_err(StoreError::connect)?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        debug!("Opened PostgreSQL session");
        Ok(PgSession { client, driver })
    }

    /// Create the availability table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations");

        let session = self.connect().await?;
        let result = session
            .client
            .batch_execute(CREATE_AVAILABILITY_TABLE)
            .await
            .map_err(StoreError::query);
        session.shutdown().await;

        result?;
        info!("Database migrations completed successfully");
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn open(&self) -> Result<Box<dyn AvailabilitySession>, StoreError> {
        Ok(Box::new(self.connect().await?))
    }
}

/// One live PostgreSQL connection.
/// Dropping it also closes the connection, since the driver task ends once the
/// client is gone.
pub struct PgSession {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgSession {
    async fn shutdown(self) {
        let PgSession { client, driver } = self;
        drop(client);

        if let Err(e) = driver.await {
            warn!("PostgreSQL connection task did not finish cleanly: {}", e);
        }
        debug!("Closed PostgreSQL session");
    }
}

#[async_trait]
impl AvailabilitySession for PgSession {
    async fn fetch_all(&self) -> Result<Vec<AvailabilityRecord>, StoreError> {
        let rows = self.client.query(SELECT_ALL, &[]).await.map_err(StoreError::query)?;

        rows.iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::query)
    }

    async fn upsert(&self, update: &AvailabilityUpdate) -> Result<AvailabilityRecord, StoreError> {
        let row = self
            .client
            .query_one(UPSERT, &[&update.date_key, &update.is_available])
            .await
            .map_err(StoreError::query)?;

        record_from_row(&row).map_err(StoreError::query)
    }

    async fn close(self: Box<Self>) {
        (*self).shutdown().await;
    }
}

fn record_from_row(row: &Row) -> Result<AvailabilityRecord, tokio_postgres::Error> {
    Ok(AvailabilityRecord {
        date_key: row.try_get(0)?,
        is_available: row.try_get(1)?,
        updated_at: row.try_get(2)?,
    })
}
