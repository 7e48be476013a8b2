//! Application layer for the Post context.

pub mod command_handlers;
pub mod query_handlers;
pub mod summary_projection;
