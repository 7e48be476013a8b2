//! Domain layer for the Post context.

pub mod aggregates;
pub mod commands;
pub mod events;
