//! Database models (SQLx) and transient pipeline types.

pub mod merged_file;
pub mod upload;
