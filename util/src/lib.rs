//! Shared request-level configuration: analysis options and language tags.

pub mod execution_config;
pub mod languages;
