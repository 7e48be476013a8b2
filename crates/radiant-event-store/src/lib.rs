//! Radiant Event Store — concrete implementations of the kernel's
//! `EventStore` trait.
//!
//! `InMemoryEventStore` backs tests and database-less runs;
//! `PgEventStore` persists to the `domain_events` table.

pub mod memory;
pub mod pg_event_store;
pub mod schema;

pub use memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
