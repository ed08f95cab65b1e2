//! Business logic services.

pub mod artifact_service;
pub mod assembly_service;
pub mod auth_service;
pub mod conversion_service;
pub mod ledger_service;
pub mod merge_service;
pub mod retention_service;
pub mod scheduler_service;

#[cfg(test)]
pub(crate) mod test_support;
