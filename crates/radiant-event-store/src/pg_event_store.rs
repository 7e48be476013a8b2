//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use radiant_core::error::DomainError;
use radiant_core::store::{EventStore, PendingEvent, StoredEvent};

use crate::schema::CREATE_EVENTS_TABLE;

// Transaction-scoped advisory lock taken by every append. Appends commit one
// at a time, so global positions become visible in ascending order and a
// watermark reader never skips a late-committing lower position.
const APPEND_LOCK_KEY: i64 = 0x5241_4449_414E_5400;

const EVENT_ID_CONSTRAINT: &str = "domain_events_event_id_key";

const SELECT_COLUMNS: &str = "SELECT global_position, event_id, aggregate_id, event_type, \
     sequence_number, schema_version, payload, metadata, occurred_at FROM domain_events";

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    global_position: i64,
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    sequence_number: i64,
    schema_version: i32,
    payload: Vec<u8>,
    metadata: Vec<u8>,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            sequence_number: row.sequence_number,
            global_position: row.global_position,
            schema_version: row.schema_version,
            payload: row.payload,
            metadata: row.metadata,
            occurred_at: row.occurred_at,
        }
    }
}

fn infrastructure(e: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(e.to_string())
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and wraps it.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the database is unreachable.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the events table and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(CREATE_EVENTS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, events), fields(aggregate_id = %aggregate_id, count = events.len()))]
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(|e| infrastructure(&e))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPEND_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| infrastructure(&e))?;

        let actual: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM domain_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| infrastructure(&e))?;

        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let mut appended = Vec::with_capacity(events.len());
        let mut sequence_number = expected_version;
        for pending in events {
            sequence_number += 1;
            let inserted: Result<i64, sqlx::Error> = sqlx::query_scalar(
                "INSERT INTO domain_events \
                 (event_id, aggregate_id, event_type, sequence_number, schema_version, payload, metadata, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING global_position",
            )
            .bind(pending.event_id)
            .bind(aggregate_id)
            .bind(&pending.event_type)
            .bind(sequence_number)
            .bind(pending.schema_version)
            .bind(&pending.payload)
            .bind(&pending.metadata)
            .bind(pending.occurred_at)
            .fetch_one(&mut *tx)
            .await;

            let global_position = match inserted {
                Ok(position) => position,
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    drop(tx);
                    if db.constraint() == Some(EVENT_ID_CONSTRAINT) {
                        return Err(DomainError::Infrastructure(format!(
                            "duplicate event id: {}",
                            pending.event_id
                        )));
                    }
                    // Another writer committed between our version read and insert.
                    let actual = self.current_version(aggregate_id).await?;
                    warn!(expected_version, actual, "lost append race");
                    return Err(DomainError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual,
                    });
                }
                Err(e) => return Err(infrastructure(&e)),
            };

            appended.push(StoredEvent::from_pending(
                pending,
                aggregate_id,
                sequence_number,
                global_position,
            ));
        }

        tx.commit().await.map_err(|e| infrastructure(&e))?;
        debug!(
            from = expected_version + 1,
            to = sequence_number,
            "appended events"
        );
        Ok(appended)
    }

    async fn load(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let events = self.load_from(aggregate_id, 0).await?;
        if events.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }
        Ok(events)
    }

    async fn load_from(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE aggregate_id = $1 AND sequence_number > $2 ORDER BY sequence_number"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(aggregate_id)
            .bind(from_version)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    async fn load_all(&self) -> Result<Vec<StoredEvent>, DomainError> {
        self.load_all_from(0).await
    }

    async fn load_all_from(&self, watermark: i64) -> Result<Vec<StoredEvent>, DomainError> {
        let sql = format!("{SELECT_COLUMNS} WHERE global_position > $1 ORDER BY global_position");
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(watermark)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| infrastructure(&e))?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}
