//! Application layer for the Translation context.

pub mod command_handlers;
pub mod query_handlers;
pub mod session_projection;
pub mod workflow;
