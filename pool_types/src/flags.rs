//! Constraint flags attached to pooled entities.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// A non-blocking condition noticed while computing a pooling plan.
///
/// Flags are additive and purely informational: an entity can carry
/// several, and no flag ever aborts the computation. They are surfaced
/// on the result rows for review and export.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Flag {
    /// Effective molarity was non-positive or non-finite; the entity is
    /// excluded from allocation.
    InvalidMolarity,
    /// The volume to draw exceeds the volume on hand.
    InsufficientSampleVolume,
    /// The post-dilution volume is still below the minimum pipettable
    /// volume.
    BelowMinimumPipetteVolume,
    /// The volume to draw exceeds the configured per-step maximum.
    ExceedsMaximumVolume,
    /// A sub-pool with a single member; pooling it is a pass-through.
    TrivialSubpool,
}
