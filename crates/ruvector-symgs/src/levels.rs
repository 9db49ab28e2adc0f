//! Dependency levels for the forward and backward sweeps.
//!
//! A [`LevelSchedule`] is a flat permutation of row indices (`order`) cut into
//! contiguous levels by an offset array (`level_ptr`): level `k` is
//! `order[level_ptr[k]..level_ptr[k + 1]]`. Rows inside one level never read
//! each other, so they can be updated concurrently; levels run in order.
//!
//! Building the levels (the graph analysis) is the caller's job. This module
//! only stores, validates and inspects them.
//!
//! ```text
//! forward:  row i in level k  =>  every lower entry (i, j) has level(j) < k
//! backward: row i in level k  =>  every upper entry (i, j) has level(j) < k
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::CsrView;

/// Sweep direction a schedule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Lower-triangular sweep, producing the scratch vector `z`.
    Forward,
    /// Upper-triangular sweep, producing the output `x`.
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

// ---------------------------------------------------------------------------
// LevelSchedule
// ---------------------------------------------------------------------------

/// Rows of one sweep direction grouped into dependency levels.
#[derive(Debug, Clone)]
pub struct LevelSchedule {
    direction: Direction,
    order: Vec<usize>,
    level_ptr: Vec<usize>,
}

impl LevelSchedule {
    /// Wrap a precomputed row order and its level boundaries.
    ///
    /// Empty levels (`level_ptr[k] == level_ptr[k + 1]`) are allowed.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DimensionMismatch`] if `level_ptr` is empty, does
    ///   not start at 0, or does not end at `order.len()`.
    /// - [`ValidationError::NonMonotonicLevels`] if a boundary decreases.
    /// - [`ValidationError::InvalidPermutation`] if `order` is not a
    ///   permutation of `0..order.len()`.
    pub fn new(
        direction: Direction,
        order: Vec<usize>,
        level_ptr: Vec<usize>,
    ) -> Result<Self, ValidationError> {
        let (first, last) = match (level_ptr.first(), level_ptr.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(ValidationError::DimensionMismatch(format!(
                    "{direction} level_ptr must hold at least one offset",
                )))
            }
        };
        if first != 0 {
            return Err(ValidationError::DimensionMismatch(format!(
                "{direction} level_ptr[0] = {first} (expected 0)",
            )));
        }
        for i in 1..level_ptr.len() {
            if level_ptr[i] < level_ptr[i - 1] {
                return Err(ValidationError::NonMonotonicLevels {
                    direction,
                    position: i,
                });
            }
        }
        if last != order.len() {
            return Err(ValidationError::DimensionMismatch(format!(
                "{direction} level_ptr ends at {last} but order holds {} rows",
                order.len(),
            )));
        }

        let n = order.len();
        let mut seen = vec![false; n];
        for (position, &row) in order.iter().enumerate() {
            if row >= n || seen[row] {
                return Err(ValidationError::InvalidPermutation {
                    direction,
                    position,
                    row,
                });
            }
            seen[row] = true;
        }

        Ok(Self {
            direction,
            order,
            level_ptr,
        })
    }

    /// Group rows by a per-row level assignment.
    ///
    /// `row_levels[i]` is the level of row `i`. Rows keep ascending order
    /// inside each level. Levels that no row maps to stay empty.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] if a label is not
    /// below `row_levels.len()`. A schedule over `n` rows never needs more
    /// than `n` levels.
    pub fn from_row_levels(
        direction: Direction,
        row_levels: &[usize],
    ) -> Result<Self, ValidationError> {
        let n = row_levels.len();
        if let Some((row, &level)) = row_levels.iter().enumerate().find(|&(_, &l)| l >= n) {
            return Err(ValidationError::ParameterOutOfRange {
                name: format!("{direction} level of row {row}"),
                value: level.to_string(),
                expected: format!("< {n}"),
            });
        }
        let num_levels = row_levels.iter().max().map_or(0, |&l| l + 1);

        let mut level_ptr = vec![0usize; num_levels + 1];
        for &level in row_levels {
            level_ptr[level + 1] += 1;
        }
        for k in 1..=num_levels {
            level_ptr[k] += level_ptr[k - 1];
        }

        let mut cursor = level_ptr.clone();
        let mut order = vec![0usize; row_levels.len()];
        for (row, &level) in row_levels.iter().enumerate() {
            order[cursor[level]] = row;
            cursor[level] += 1;
        }

        Ok(Self {
            direction,
            order,
            level_ptr,
        })
    }

    /// Direction this schedule drives.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of levels, including empty ones.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.level_ptr.len() - 1
    }

    /// Number of scheduled rows.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.order.len()
    }

    /// Row indices in level order.
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Level boundaries into [`order`](Self::order).
    #[inline]
    pub fn level_ptr(&self) -> &[usize] {
        &self.level_ptr
    }

    /// Rows of level `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= num_levels()`.
    #[inline]
    pub fn level(&self, k: usize) -> &[usize] {
        &self.order[self.level_ptr[k]..self.level_ptr[k + 1]]
    }

    /// Iterate over the levels in execution order.
    pub fn levels(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        self.level_ptr
            .windows(2)
            .map(move |w| &self.order[w[0]..w[1]])
    }

    /// Inverse map: the level each row is scheduled in.
    pub fn level_of_row(&self) -> Vec<usize> {
        let mut level_of_row = vec![0usize; self.order.len()];
        for (k, rows) in self.levels().enumerate() {
            for &row in rows {
                level_of_row[row] = k;
            }
        }
        level_of_row
    }

    /// Size of the widest level.
    pub fn max_level_size(&self) -> usize {
        self.levels().map(<[usize]>::len).max().unwrap_or(0)
    }

    /// Check that no row reads a value that its level has not yet finalized.
    ///
    /// Only local columns (`< rows`) are recurrence dependencies. Halo
    /// columns are filled before the sweep, and a row reading its own column
    /// stays inside one task.
    fn validate_against(&self, matrix: &CsrView<'_>) -> Result<(), ValidationError> {
        let rows = matrix.rows();
        let level_of_row = self.level_of_row();

        for (level, level_rows) in self.levels().enumerate() {
            for &row in level_rows {
                let (cols, _) = match self.direction {
                    Direction::Forward => matrix.lower(row),
                    Direction::Backward => matrix.upper(row),
                };
                for &col in cols {
                    if col >= rows || col == row {
                        continue;
                    }
                    let dependency_level = level_of_row[col];
                    if dependency_level >= level {
                        return Err(ValidationError::DependencyViolation {
                            direction: self.direction,
                            row,
                            level,
                            dependency: col,
                            dependency_level,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LevelPartition
// ---------------------------------------------------------------------------

/// Forward and backward level schedules for one sparsity pattern.
///
/// Built once by the leveling analysis and reused by every smoother call
/// while the pattern is unchanged.
#[derive(Debug, Clone)]
pub struct LevelPartition {
    forward: LevelSchedule,
    backward: LevelSchedule,
}

impl LevelPartition {
    /// Pair a forward and a backward schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] if a schedule has the
    /// wrong direction or the two schedules cover different row counts.
    pub fn new(forward: LevelSchedule, backward: LevelSchedule) -> Result<Self, ValidationError> {
        if forward.direction() != Direction::Forward || backward.direction() != Direction::Backward
        {
            return Err(ValidationError::DimensionMismatch(format!(
                "expected (forward, backward) schedules, got ({}, {})",
                forward.direction(),
                backward.direction(),
            )));
        }
        if forward.num_rows() != backward.num_rows() {
            return Err(ValidationError::DimensionMismatch(format!(
                "forward schedule covers {} rows, backward covers {}",
                forward.num_rows(),
                backward.num_rows(),
            )));
        }
        Ok(Self { forward, backward })
    }

    /// Forward (lower-triangular) schedule.
    #[inline]
    pub fn forward(&self) -> &LevelSchedule {
        &self.forward
    }

    /// Backward (upper-triangular) schedule.
    #[inline]
    pub fn backward(&self) -> &LevelSchedule {
        &self.backward
    }

    /// Schedule for `direction`.
    #[inline]
    pub fn schedule(&self, direction: Direction) -> &LevelSchedule {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    /// Number of rows covered by both schedules.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.forward.num_rows()
    }

    /// Check the dependency invariant of both schedules against `matrix`.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DimensionMismatch`] if the partition and the
    ///   matrix disagree on the row count.
    /// - [`ValidationError::DependencyViolation`] for the first row that
    ///   reads a value not finalized by a strictly earlier level.
    pub fn validate_dependencies(&self, matrix: &CsrView<'_>) -> Result<(), ValidationError> {
        if self.num_rows() != matrix.rows() {
            return Err(ValidationError::DimensionMismatch(format!(
                "level partition covers {} rows but matrix has {}",
                self.num_rows(),
                matrix.rows(),
            )));
        }
        self.forward.validate_against(matrix)?;
        self.backward.validate_against(matrix)
    }

    /// Summary of the available parallelism.
    pub fn stats(&self) -> LevelStats {
        let mean = |s: &LevelSchedule| {
            if s.num_levels() == 0 {
                0.0
            } else {
                s.num_rows() as f64 / s.num_levels() as f64
            }
        };
        LevelStats {
            rows: self.num_rows(),
            forward_levels: self.forward.num_levels(),
            backward_levels: self.backward.num_levels(),
            forward_max_level: self.forward.max_level_size(),
            backward_max_level: self.backward.max_level_size(),
            forward_mean_level: mean(&self.forward),
            backward_mean_level: mean(&self.backward),
        }
    }
}

/// Shape of a [`LevelPartition`], as reported by [`LevelPartition::stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Rows covered by the partition.
    pub rows: usize,
    /// Number of forward levels.
    pub forward_levels: usize,
    /// Number of backward levels.
    pub backward_levels: usize,
    /// Rows in the widest forward level.
    pub forward_max_level: usize,
    /// Rows in the widest backward level.
    pub backward_max_level: usize,
    /// Mean rows per forward level.
    pub forward_mean_level: f64,
    /// Mean rows per backward level.
    pub backward_mean_level: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CsrMatrix;

    // 1-D Laplacian on 4 points: a chain in both directions.
    fn tridiag(n: usize) -> CsrMatrix<f64> {
        let mut entries = Vec::new();
        for i in 0..n {
            entries.push((i, i, 2.0));
            if i > 0 {
                entries.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                entries.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_coo(n, n, entries)
    }

    fn chain_partition(n: usize) -> LevelPartition {
        let fwd: Vec<usize> = (0..n).collect();
        let bwd: Vec<usize> = (0..n).rev().collect();
        LevelPartition::new(
            LevelSchedule::from_row_levels(Direction::Forward, &fwd).unwrap(),
            LevelSchedule::from_row_levels(Direction::Backward, &bwd).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn from_row_levels_groups_rows() {
        let s = LevelSchedule::from_row_levels(Direction::Forward, &[0, 1, 0, 2, 1]).unwrap();
        assert_eq!(s.num_levels(), 3);
        assert_eq!(s.level(0), &[0, 2]);
        assert_eq!(s.level(1), &[1, 4]);
        assert_eq!(s.level(2), &[3]);
        assert_eq!(s.level_of_row(), vec![0, 1, 0, 2, 1]);
        assert_eq!(s.max_level_size(), 2);
    }

    #[test]
    fn from_row_levels_keeps_empty_levels() {
        let s = LevelSchedule::from_row_levels(Direction::Forward, &[0, 2, 2]).unwrap();
        assert_eq!(s.num_levels(), 3);
        assert!(s.level(1).is_empty());
        assert_eq!(s.level(2), &[1, 2]);
        assert_eq!(s.levels().count(), 3);
    }

    #[test]
    fn from_row_levels_rejects_sparse_labels() {
        for labels in [&[0, 1 << 40][..], &[usize::MAX][..], &[0, 2][..]] {
            let err = LevelSchedule::from_row_levels(Direction::Backward, labels).unwrap_err();
            assert!(
                matches!(err, ValidationError::ParameterOutOfRange { ref expected, .. }
                    if *expected == format!("< {}", labels.len())),
                "unexpected error: {err}"
            );
            assert!(err.to_string().contains("backward"));
        }
    }

    #[test]
    fn empty_schedule() {
        let s = LevelSchedule::from_row_levels(Direction::Backward, &[]).unwrap();
        assert_eq!(s.num_levels(), 0);
        assert_eq!(s.num_rows(), 0);
        assert_eq!(s.levels().count(), 0);
        assert_eq!(s.max_level_size(), 0);
    }

    #[test]
    fn new_accepts_valid_schedule() {
        let s = LevelSchedule::new(Direction::Forward, vec![2, 0, 1], vec![0, 2, 2, 3]).unwrap();
        assert_eq!(s.level(0), &[2, 0]);
        assert!(s.level(1).is_empty());
        assert_eq!(s.level(2), &[1]);
    }

    #[test]
    fn new_rejects_bad_boundaries() {
        assert!(matches!(
            LevelSchedule::new(Direction::Forward, vec![0], vec![]),
            Err(ValidationError::DimensionMismatch(_))
        ));
        assert!(matches!(
            LevelSchedule::new(Direction::Forward, vec![0], vec![1, 1]),
            Err(ValidationError::DimensionMismatch(_))
        ));
        assert!(matches!(
            LevelSchedule::new(Direction::Forward, vec![0, 1], vec![0, 1]),
            Err(ValidationError::DimensionMismatch(_))
        ));
        assert!(matches!(
            LevelSchedule::new(Direction::Backward, vec![0, 1], vec![0, 2, 1, 2]),
            Err(ValidationError::NonMonotonicLevels {
                direction: Direction::Backward,
                position: 2,
            })
        ));
    }

    #[test]
    fn new_rejects_non_permutation() {
        assert!(matches!(
            LevelSchedule::new(Direction::Forward, vec![0, 0, 2], vec![0, 3]),
            Err(ValidationError::InvalidPermutation { position: 1, row: 0, .. })
        ));
        assert!(matches!(
            LevelSchedule::new(Direction::Forward, vec![0, 5], vec![0, 2]),
            Err(ValidationError::InvalidPermutation { position: 1, row: 5, .. })
        ));
    }

    #[test]
    fn partition_rejects_swapped_or_mismatched_schedules() {
        let f = LevelSchedule::from_row_levels(Direction::Forward, &[0, 1]).unwrap();
        let b = LevelSchedule::from_row_levels(Direction::Backward, &[1, 0]).unwrap();
        assert!(LevelPartition::new(b.clone(), f.clone()).is_err());

        let short = LevelSchedule::from_row_levels(Direction::Backward, &[0]).unwrap();
        assert!(LevelPartition::new(f, short).is_err());
    }

    #[test]
    fn chain_partition_respects_dependencies() {
        let m = tridiag(4);
        let diag = m.diagonal_positions().unwrap();
        let view = m.view(&diag).unwrap();
        assert!(chain_partition(4).validate_dependencies(&view).is_ok());
    }

    #[test]
    fn detects_forward_violation() {
        let m = tridiag(4);
        let diag = m.diagonal_positions().unwrap();
        let view = m.view(&diag).unwrap();

        // Rows 0 and 1 share a level although row 1 reads row 0.
        let partition = LevelPartition::new(
            LevelSchedule::from_row_levels(Direction::Forward, &[0, 0, 1, 2]).unwrap(),
            LevelSchedule::from_row_levels(Direction::Backward, &[3, 2, 1, 0]).unwrap(),
        )
        .unwrap();

        match partition.validate_dependencies(&view) {
            Err(ValidationError::DependencyViolation {
                direction,
                row,
                dependency,
                ..
            }) => {
                assert_eq!(direction, Direction::Forward);
                assert_eq!(row, 1);
                assert_eq!(dependency, 0);
            }
            other => panic!("expected DependencyViolation, got {other:?}"),
        }
    }

    #[test]
    fn detects_backward_violation() {
        let m = tridiag(3);
        let diag = m.diagonal_positions().unwrap();
        let view = m.view(&diag).unwrap();

        // Natural order is wrong for the backward sweep.
        let partition = LevelPartition::new(
            LevelSchedule::from_row_levels(Direction::Forward, &[0, 1, 2]).unwrap(),
            LevelSchedule::from_row_levels(Direction::Backward, &[0, 1, 2]).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            partition.validate_dependencies(&view),
            Err(ValidationError::DependencyViolation {
                direction: Direction::Backward,
                row: 0,
                dependency: 1,
                ..
            })
        ));
    }

    #[test]
    fn halo_columns_are_not_dependencies() {
        // Row 0 couples to halo column 2 in both triangles' positions.
        let m = CsrMatrix::from_coo(
            2,
            3,
            vec![(0, 0, 2.0), (0, 2, -1.0), (1, 1, 2.0), (1, 2, -1.0)],
        );
        let diag = m.diagonal_positions().unwrap();
        let view = m.view(&diag).unwrap();
        let partition = LevelPartition::new(
            LevelSchedule::from_row_levels(Direction::Forward, &[0, 0]).unwrap(),
            LevelSchedule::from_row_levels(Direction::Backward, &[0, 0]).unwrap(),
        )
        .unwrap();
        assert!(partition.validate_dependencies(&view).is_ok());
    }

    #[test]
    fn row_count_mismatch_is_reported() {
        let m = tridiag(3);
        let diag = m.diagonal_positions().unwrap();
        let view = m.view(&diag).unwrap();
        assert!(matches!(
            chain_partition(4).validate_dependencies(&view),
            Err(ValidationError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn stats_summarise_levels() {
        let partition = LevelPartition::new(
            LevelSchedule::from_row_levels(Direction::Forward, &[0, 0, 1, 1]).unwrap(),
            LevelSchedule::from_row_levels(Direction::Backward, &[3, 2, 1, 0]).unwrap(),
        )
        .unwrap();
        let stats = partition.stats();
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.forward_levels, 2);
        assert_eq!(stats.backward_levels, 4);
        assert_eq!(stats.forward_max_level, 2);
        assert_eq!(stats.backward_max_level, 1);
        assert_eq!(stats.forward_mean_level, 2.0);
        assert_eq!(stats.backward_mean_level, 1.0);
    }
}
