//! Domain layer for the Translation context.

pub mod aggregates;
pub mod commands;
pub mod events;
pub mod language;
pub mod model;
