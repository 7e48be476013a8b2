//! Radiant — Post bounded context.
//!
//! Event-sourced blog posts: creation (including publication of finished
//! translations), edits, likes, views and soft deletion, plus the post
//! summary read model.

pub mod application;
pub mod domain;
