//! Radiant — kernel composition root.
//!
//! Builds the event store, command dispatcher, after-commit delivery,
//! projections, translation workflow and trending query from a
//! [`KernelConfig`], and runs them as one [`Kernel`].

pub mod config;
pub mod error;
pub mod kernel;
pub mod subscribers;

pub use config::KernelConfig;
pub use error::AppError;
pub use kernel::Kernel;
