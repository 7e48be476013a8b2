//! Shared test mocks and utilities for the Radiant platform.

mod clock;
mod store;

pub use clock::{AdjustableClock, FixedClock};
pub use store::{EmptyEventStore, FailingEventStore, RecordingEventStore, history_of};
