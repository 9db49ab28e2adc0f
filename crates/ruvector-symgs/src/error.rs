//! Error types for the smoother crate.
//!
//! Everything that can go wrong before a sweep starts (malformed CSR arrays,
//! a bad level partition, out-of-range configuration) is reported as a
//! [`ValidationError`]. The sweep itself has no recoverable failure modes:
//! length mismatches at call time are programmer errors and panic.

use crate::levels::Direction;

/// Validation errors for smoother inputs.
///
/// These are raised eagerly when a view, level schedule or plan is built so
/// that callers get clear diagnostics rather than silently wrong numbers.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Array lengths or dimensions are inconsistent.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A column index is out of bounds for the declared number of columns.
    #[error("column index {index} out of bounds for {cols} columns (row {row})")]
    IndexOutOfBounds {
        /// Offending column index.
        index: usize,
        /// Row containing the offending entry.
        row: usize,
        /// Declared column count.
        cols: usize,
    },

    /// The `row_ptr` array is not monotonically non-decreasing.
    #[error("row_ptr is not monotonically non-decreasing at position {position}")]
    NonMonotonicRowPtrs {
        /// Position in `row_ptr` where the violation was detected.
        position: usize,
    },

    /// A row has no stored diagonal entry.
    #[error("row {row} has no diagonal entry")]
    MissingDiagonal {
        /// Row without a diagonal.
        row: usize,
    },

    /// A diagonal position lies outside its row or does not hold column `row`.
    #[error("diagonal position {position} is not the diagonal entry of row {row}")]
    InvalidDiagonalPosition {
        /// Row whose diagonal position is wrong.
        row: usize,
        /// The offending position into `col_indices` / `values`.
        position: usize,
    },

    /// Level boundaries are not monotonically non-decreasing.
    #[error("{direction} level boundaries decrease at position {position}")]
    NonMonotonicLevels {
        /// Sweep direction of the schedule.
        direction: Direction,
        /// Position in the boundary array where the violation was detected.
        position: usize,
    },

    /// The level order is not a permutation of `0..rows`.
    #[error("{direction} level order is not a permutation: row {row} at position {position}")]
    InvalidPermutation {
        /// Sweep direction of the schedule.
        direction: Direction,
        /// Position in the order array.
        position: usize,
        /// Row index found there (out of range or repeated).
        row: usize,
    },

    /// A row reads a value that is not finalized by an earlier level.
    #[error(
        "{direction} row {row} (level {level}) depends on row {dependency} (level {dependency_level})"
    )]
    DependencyViolation {
        /// Sweep direction of the schedule.
        direction: Direction,
        /// Row whose dependency is violated.
        row: usize,
        /// Level the row is scheduled in.
        level: usize,
        /// Row it reads from.
        dependency: usize,
        /// Level the dependency is scheduled in (not strictly earlier).
        dependency_level: usize,
    },

    /// A parameter is outside its valid range.
    #[error("parameter out of range: {name} = {value} (expected {expected})")]
    ParameterOutOfRange {
        /// Name of the parameter.
        name: String,
        /// The invalid value (as a string for flexibility).
        value: String,
        /// Human-readable description of the valid range.
        expected: String,
    },
}
