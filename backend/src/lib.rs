//! Evidence Binder - Backend Library
//!
//! Normalizes uploaded evidence (PDF, images, csv, docx) to PDF, merges each
//! batch into one document per team and day, and records who created and
//! downloaded every merged file.

#[macro_use]
mod macros;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
