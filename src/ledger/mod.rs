//! Calorie ledger: persistence and the arithmetic built on top of it.

pub mod repo;
pub mod repo_types;
pub mod services;
