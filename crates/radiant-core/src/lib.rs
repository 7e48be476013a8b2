//! Radiant Core — event-sourcing kernel abstractions.
//!
//! This crate defines the envelope, codec, aggregate, event-store and
//! command-dispatch contracts that every context builds on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod codec;
pub mod command;
pub mod cursor;
pub mod error;
pub mod event;
pub mod publisher;
pub mod repository;
pub mod store;
