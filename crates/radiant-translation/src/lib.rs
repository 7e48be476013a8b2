//! Radiant — Translation bounded context.
//!
//! Translation sessions move from `IN_PROGRESS` to exactly one of
//! `COMPLETED` or `FAILED`. Requests return as soon as the session is
//! opened; the provider call runs on a bounded worker pool after the
//! request commits, and its outcome is recorded as a terminal event.

pub mod application;
pub mod domain;
pub mod error;
pub mod provider;
