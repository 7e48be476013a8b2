//! Radiant Eventing — everything that happens after an append commits.
//!
//! - [`bus`]: in-process fan-out of committed events to independent
//!   subscriber tasks.
//! - [`projection`]: full rebuild and watermark catch-up of read models
//!   from the global log.
//! - [`worker_pool`]: bounded pool with a saturation policy for long-running
//!   work such as external calls.

pub mod bus;
pub mod projection;
pub mod subscriber;
pub mod worker_pool;

pub use bus::{BusPublisher, DeliveryHandle, EventBus};
pub use projection::{CatchUpReport, Projection, ProjectionEngine, ProjectionSubscriber};
pub use subscriber::{EventFilter, EventSubscriber};
pub use worker_pool::{
    PoolError, SaturationPolicy, ShutdownReport, Submission, WorkerPool, WorkerPoolConfig,
};
