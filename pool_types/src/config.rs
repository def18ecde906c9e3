//! Scientific constants and run-level configuration.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Average molecular weight of one double-stranded DNA base pair (g/mol).
pub const MW_PER_BP: f64 = 660.0;

/// Stock volumes below this take a 10x pre-dilution (µl).
pub const PRE_DILUTE_THRESHOLD_10X: f64 = 0.2;

/// Stock volumes below this (but at or above the 10x threshold) take a
/// 5x pre-dilution (µl).
pub const PRE_DILUTE_THRESHOLD_5X: f64 = 0.795;

// Field-level validation thresholds used by the table validator.
pub const MIN_CONCENTRATION_NG_UL: f64 = 0.01;
pub const WARN_LOW_CONCENTRATION_NG_UL: f64 = 0.1;
pub const WARN_HIGH_CONCENTRATION_NG_UL: f64 = 1000.0;
pub const MIN_FRAGMENT_SIZE_BP: f64 = 50.0;
pub const WARN_LOW_FRAGMENT_SIZE_BP: f64 = 100.0;
pub const WARN_HIGH_FRAGMENT_SIZE_BP: f64 = 10_000.0;
pub const MIN_TOTAL_VOLUME_UL: f64 = 0.1;
pub const WARN_LOW_TOTAL_VOLUME_UL: f64 = 5.0;
pub const WARN_LOW_MOLARITY_NM: f64 = 0.1;

/// One pre-dilution tier: stock volumes strictly below `upper_bound_ul`
/// (and not claimed by an earlier tier) are diluted by `factor`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct PreDiluteTier {
    pub upper_bound_ul: f64,
    pub factor: f64,
}

/// Immutable configuration for one pooling computation.
///
/// Passed by reference into the computation entry points so alternate
/// chemistries or instrument-specific dilution tiers can be swapped per
/// invocation without touching any global state.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct PoolingConfig {
    /// Molecular weight per base pair used for the ng/µl → nM conversion.
    pub mw_per_bp: f64,
    /// Pre-dilution tiers, ordered by ascending upper bound. Evaluated
    /// low-to-high; the first tier whose bound exceeds the stock volume
    /// wins, and a stock volume with no tier is pipetted neat (1x).
    pub predilute_tiers: Vec<PreDiluteTier>,
}

impl Default for PoolingConfig {
    fn default() -> Self {
        PoolingConfig {
            mw_per_bp: MW_PER_BP,
            predilute_tiers: vec![
                PreDiluteTier {
                    upper_bound_ul: PRE_DILUTE_THRESHOLD_10X,
                    factor: 10.0,
                },
                PreDiluteTier {
                    upper_bound_ul: PRE_DILUTE_THRESHOLD_5X,
                    factor: 5.0,
                },
            ],
        }
    }
}

impl PoolingConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.mw_per_bp > 0.0,
            "molecular weight per bp must be > 0, got {}",
            self.mw_per_bp
        );
        for tier in &self.predilute_tiers {
            ensure!(
                tier.upper_bound_ul > 0.0 && tier.factor >= 1.0,
                "invalid pre-dilution tier: bound {} µl, factor {}x",
                tier.upper_bound_ul,
                tier.factor
            );
        }
        ensure!(
            self.predilute_tiers
                .windows(2)
                .all(|w| w[0].upper_bound_ul < w[1].upper_bound_ul),
            "pre-dilution tiers must be ordered by ascending upper bound"
        );
        Ok(())
    }

    /// Pre-dilution factor for a stock volume. The lower bound of each
    /// tier is exclusive: a stock volume exactly at a tier's upper bound
    /// takes the next (weaker) tier.
    pub fn predilute_factor(&self, stock_volume_ul: f64) -> f64 {
        for tier in &self.predilute_tiers {
            if stock_volume_ul < tier.upper_bound_ul {
                return tier.factor;
            }
        }
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_are_exclusive_lower() {
        let config = PoolingConfig::default();
        assert_eq!(config.predilute_factor(0.1999), 10.0);
        assert_eq!(config.predilute_factor(0.2), 5.0);
        assert_eq!(config.predilute_factor(0.7949), 5.0);
        assert_eq!(config.predilute_factor(0.795), 1.0);
        assert_eq!(config.predilute_factor(12.94), 1.0);
    }

    #[test]
    fn test_misordered_tiers_rejected() {
        let mut config = PoolingConfig::default();
        config.predilute_tiers.reverse();
        assert!(config.validate().is_err());
    }
}
