//! Event store database schema.

/// SQL to create the events table and its indexes.
///
/// `global_position` orders the whole log across aggregates. The unique
/// `(aggregate_id, sequence_number)` constraint rejects a writer that raced
/// past the version check.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS domain_events (
    global_position BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    event_id        UUID NOT NULL UNIQUE,
    aggregate_id    UUID NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    sequence_number BIGINT NOT NULL CHECK (sequence_number > 0),
    schema_version  INTEGER NOT NULL DEFAULT 1,
    payload         BYTEA NOT NULL,
    metadata        BYTEA NOT NULL,
    occurred_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (aggregate_id, sequence_number)
);

CREATE INDEX IF NOT EXISTS idx_domain_events_event_type
    ON domain_events (event_type);

CREATE INDEX IF NOT EXISTS idx_domain_events_occurred_at
    ON domain_events (occurred_at);
";
