//! Shared data model for the library pooling workspace.
//!
//! Everything in here is a plain value type: input records as they
//! arrive from a validated table, the derived records produced by the
//! computation crate, and the parameter/configuration structs that
//! control a pooling run.

pub mod config;
pub mod entity;
pub mod error;
pub mod flags;
pub mod params;
pub mod plan;

pub use config::PoolingConfig;
pub use entity::{
    ComputedLibrary, GroupSummary, LibraryRecord, NormalizedLibrary, PoolEntity, Poolable,
    SubPoolRecord,
};
pub use error::PoolError;
pub use flags::Flag;
pub use params::{GroupingKey, HierarchyParams, PoolingParams};
pub use plan::{HierarchicalPlan, PoolingStage, StageEntry, StageLabel};
