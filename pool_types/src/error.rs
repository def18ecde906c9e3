//! Structural errors that abort a pooling computation.
//!
//! Per-entity numeric problems never surface here; those become flags
//! on the affected row so one bad library cannot sink the rest of the
//! dataset. These variants are the dataset-wide conditions the caller
//! has to resolve before any plan can exist.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PoolError {
    #[error("no entities to pool")]
    EmptyEntitySet,

    /// An entity with zero molarity reached the allocator. Normalization
    /// filters these out, so hitting this means the caller bypassed it.
    #[error("entity '{name}' has non-positive effective molarity ({nm} nM)")]
    InvalidConcentration { name: String, nm: f64 },

    #[error("grouping by '{key}' produced no groups; assign sub-pools manually or pick another key")]
    NoViableGrouping { key: String },

    #[error("pre-pool '{prepool}' references unknown library '{library}'")]
    UnknownLibrary { prepool: String, library: String },

    #[error("library '{library}' appears in more than one pre-pool")]
    DuplicatePrepoolMember { library: String },

    #[error("pre-pool '{prepool}' has no member libraries")]
    EmptyPrepool { prepool: String },

    #[error("duplicate pre-pool id '{prepool}'")]
    DuplicatePrepoolId { prepool: String },
}
