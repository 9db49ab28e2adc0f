//! A matrix view paired with a level partition that has been checked
//! against it.
//!
//! Rows of one level are updated concurrently through shared vectors, which
//! is only sound if no row of a level reads another row of the same level.
//! [`SymgsPlan::new`] proves that once, so every later smoother call can
//! skip the check.

use crate::error::ValidationError;
use crate::levels::LevelPartition;
use crate::types::CsrView;

/// Validated input of [`LevelSymgs::apply`](crate::smoother::LevelSymgs::apply).
///
/// Cheap to copy. Build it once per sparsity pattern and reuse it for every
/// smoothing step.
#[derive(Debug, Clone, Copy)]
pub struct SymgsPlan<'a> {
    matrix: CsrView<'a>,
    levels: &'a LevelPartition,
}

impl<'a> SymgsPlan<'a> {
    /// Pair `matrix` with `levels`, checking the dependency invariant of
    /// both sweep directions.
    ///
    /// Cost is one pass over the nonzeros.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DimensionMismatch`] if the partition covers a
    ///   different number of rows than `matrix`.
    /// - [`ValidationError::DependencyViolation`] if some row would read a
    ///   value that its level has not finalized.
    pub fn new(matrix: CsrView<'a>, levels: &'a LevelPartition) -> Result<Self, ValidationError> {
        levels.validate_dependencies(&matrix)?;
        Ok(Self { matrix, levels })
    }

    /// Pair `matrix` with `levels` without the dependency check.
    ///
    /// # Safety
    ///
    /// `levels` must satisfy the invariant that
    /// [`LevelPartition::validate_dependencies`] checks for `matrix`.
    /// Otherwise rows of one level race on the shared vectors.
    ///
    /// # Panics
    ///
    /// If the partition and the matrix have different row counts.
    pub unsafe fn new_unchecked(matrix: CsrView<'a>, levels: &'a LevelPartition) -> Self {
        assert_eq!(
            levels.num_rows(),
            matrix.rows(),
            "SymgsPlan: level partition covers {} rows but matrix has {}",
            levels.num_rows(),
            matrix.rows(),
        );
        Self { matrix, levels }
    }

    /// The matrix view.
    #[inline]
    pub fn matrix(&self) -> &CsrView<'a> {
        &self.matrix
    }

    /// The level partition.
    #[inline]
    pub fn levels(&self) -> &'a LevelPartition {
        self.levels
    }

    /// Number of local rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }
}
