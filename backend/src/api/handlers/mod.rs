//! Request handlers.

pub mod auth;
pub mod cleanup;
pub mod health;
pub mod merges;
