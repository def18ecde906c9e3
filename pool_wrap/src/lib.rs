//! Ingestion, validation and export around the pooling engine.

pub mod export;
pub mod table;
pub mod validate;
