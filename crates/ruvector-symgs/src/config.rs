//! Smoother configuration.
//!
//! [`SmootherConfig`] is plain data: it serializes with serde so it can live
//! in a larger solver configuration file, and missing fields take their
//! defaults.

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchStrategy;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// SmootherConfig
// ---------------------------------------------------------------------------

/// Tuning knobs of [`LevelSymgs`](crate::smoother::LevelSymgs).
///
/// None of the fields change the mathematical result; they only change how
/// work is spread across threads (and, for the hierarchical strategy, the
/// floating-point summation order).
///
/// # Example
///
/// ```rust
/// use ruvector_symgs::config::SmootherConfig;
/// use ruvector_symgs::dispatch::DispatchStrategy;
///
/// let config = SmootherConfig {
///     dispatch: DispatchStrategy::Hierarchical,
///     rows_per_team: 128,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmootherConfig {
    /// How rows of a level are mapped onto workers.
    ///
    /// Default: [`DispatchStrategy::default`].
    pub dispatch: DispatchStrategy,

    /// Rows handed to one team by the hierarchical strategy.
    ///
    /// Must be at least 1. Ignored by the flat strategy.
    ///
    /// Default: `256`.
    pub rows_per_team: usize,

    /// Levels (and the diagonal scaling pass) with fewer rows than this run
    /// inline on the calling thread instead of the rayon pool.
    ///
    /// Default: `64`.
    pub parallel_threshold: usize,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchStrategy::default(),
            rows_per_team: 256,
            parallel_threshold: 64,
        }
    }
}

impl SmootherConfig {
    /// Check that every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] if `rows_per_team`
    /// is zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rows_per_team == 0 {
            return Err(ValidationError::ParameterOutOfRange {
                name: "rows_per_team".into(),
                value: self.rows_per_team.to_string(),
                expected: ">= 1".into(),
            });
        }
        Ok(())
    }
}
