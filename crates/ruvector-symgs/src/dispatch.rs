//! Mapping of one level onto the worker pool.
//!
//! Both strategies run the same row kernels from [`crate::kernels`]; they
//! differ only in how a level's rows are spread across workers.
//!
//! | Strategy | Work unit | Row reduction |
//! |----------|-----------|---------------|
//! | [`DispatchStrategy::Flat`] | one row | serial, left to right |
//! | [`DispatchStrategy::Hierarchical`] | a block of `rows_per_team` rows, split across a team | [`LANES`](crate::kernels::LANES)-wide lane reduction |
//!
//! Flat results are bit-for-bit reproducible. Hierarchical results match them
//! up to floating-point reduction order.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::kernels::{self, Lanes, Serial, SharedSlice};
use crate::types::CsrView;

/// Upper bound on the workers that share one team block.
#[cfg_attr(not(feature = "parallel"), allow(dead_code))]
const TEAM_SIZE: usize = 32;

/// How rows of a level are mapped onto workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStrategy {
    /// One independent task per row, serial accumulation inside the row.
    Flat,
    /// Blocks of rows per team, lane-parallel reduction inside each row.
    Hierarchical,
}

impl Default for DispatchStrategy {
    /// `Hierarchical` when built with the `team-dispatch` feature, `Flat`
    /// otherwise.
    fn default() -> Self {
        if cfg!(feature = "team-dispatch") {
            DispatchStrategy::Hierarchical
        } else {
            DispatchStrategy::Flat
        }
    }
}

impl std::fmt::Display for DispatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchStrategy::Flat => write!(f, "flat"),
            DispatchStrategy::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

// ---------------------------------------------------------------------------
// LevelDispatch
// ---------------------------------------------------------------------------

/// Apply one sweep direction's row kernel to every row of a level.
///
/// Implementations return only after every row of the level is written,
/// which is the barrier between consecutive levels.
pub(crate) trait LevelDispatch: Send + Sync {
    /// Forward-sweep every row in `rows`, writing `z`.
    ///
    /// # Safety
    ///
    /// `rows` is one level of a forward schedule validated against `matrix`
    /// and all earlier forward levels have completed.
    unsafe fn forward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        r: &[f64],
        z: SharedSlice<'_>,
    );

    /// Backward-sweep every row in `rows`, writing `x`.
    ///
    /// # Safety
    ///
    /// `rows` is one level of a backward schedule validated against `matrix`
    /// and all earlier backward levels have completed.
    unsafe fn backward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        z: &[f64],
        x: SharedSlice<'_>,
    );
}

// ---------------------------------------------------------------------------
// FlatDispatch
// ---------------------------------------------------------------------------

/// One task per row.
#[derive(Debug, Clone)]
pub(crate) struct FlatDispatch {
    /// Levels with fewer rows run inline on the calling thread.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub(crate) parallel_threshold: usize,
}

impl LevelDispatch for FlatDispatch {
    unsafe fn forward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        r: &[f64],
        z: SharedSlice<'_>,
    ) {
        // SAFETY: forwarded from the caller; each row of the level is visited
        // once, so every task writes a distinct element of `z`.
        let update = |&row: &usize| unsafe { kernels::forward_row::<Serial>(matrix, row, r, z) };

        #[cfg(feature = "parallel")]
        {
            if rows.len() >= self.parallel_threshold {
                rows.par_iter().for_each(update);
                return;
            }
        }
        rows.iter().for_each(update);
    }

    unsafe fn backward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        z: &[f64],
        x: SharedSlice<'_>,
    ) {
        // SAFETY: as in `forward_level`.
        let update = |&row: &usize| unsafe { kernels::backward_row::<Serial>(matrix, row, z, x) };

        #[cfg(feature = "parallel")]
        {
            if rows.len() >= self.parallel_threshold {
                rows.par_iter().for_each(update);
                return;
            }
        }
        rows.iter().for_each(update);
    }
}

// ---------------------------------------------------------------------------
// TeamDispatch
// ---------------------------------------------------------------------------

/// Blocks of `rows_per_team` rows; each block is shared by up to
/// [`TEAM_SIZE`] workers and every row reduces over [`LANES`] lanes.
///
/// [`LANES`]: crate::kernels::LANES
#[derive(Debug, Clone)]
pub(crate) struct TeamDispatch {
    /// Rows handed to one team. Always at least 1.
    pub(crate) rows_per_team: usize,
    /// Levels with fewer rows run inline on the calling thread.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub(crate) parallel_threshold: usize,
}

impl TeamDispatch {
    /// Smallest run of rows one team worker takes.
    #[cfg(feature = "parallel")]
    fn rows_per_worker(&self) -> usize {
        self.rows_per_team.div_ceil(TEAM_SIZE).max(1)
    }
}

impl LevelDispatch for TeamDispatch {
    unsafe fn forward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        r: &[f64],
        z: SharedSlice<'_>,
    ) {
        // SAFETY: forwarded from the caller; blocks partition the level, so
        // every row is written by exactly one team worker.
        let update = |&row: &usize| unsafe { kernels::forward_row::<Lanes>(matrix, row, r, z) };

        #[cfg(feature = "parallel")]
        {
            if rows.len() >= self.parallel_threshold {
                let min_len = self.rows_per_worker();
                rows.par_chunks(self.rows_per_team).for_each(|block| {
                    block.par_iter().with_min_len(min_len).for_each(update);
                });
                return;
            }
        }
        rows.chunks(self.rows_per_team)
            .for_each(|block| block.iter().for_each(update));
    }

    unsafe fn backward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        z: &[f64],
        x: SharedSlice<'_>,
    ) {
        // SAFETY: as in `forward_level`.
        let update = |&row: &usize| unsafe { kernels::backward_row::<Lanes>(matrix, row, z, x) };

        #[cfg(feature = "parallel")]
        {
            if rows.len() >= self.parallel_threshold {
                let min_len = self.rows_per_worker();
                rows.par_chunks(self.rows_per_team).for_each(|block| {
                    block.par_iter().with_min_len(min_len).for_each(update);
                });
                return;
            }
        }
        rows.chunks(self.rows_per_team)
            .for_each(|block| block.iter().for_each(update));
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// The strategy selected by a [`SmootherConfig`](crate::config::SmootherConfig).
#[derive(Debug, Clone)]
pub(crate) enum Dispatcher {
    Flat(FlatDispatch),
    Team(TeamDispatch),
}

impl Dispatcher {
    /// `rows_per_team` must already be at least 1; `LevelSymgs::new` clamps it.
    pub(crate) fn new(
        strategy: DispatchStrategy,
        rows_per_team: usize,
        parallel_threshold: usize,
    ) -> Self {
        debug_assert!(rows_per_team >= 1, "rows_per_team must be at least 1");
        match strategy {
            DispatchStrategy::Flat => Dispatcher::Flat(FlatDispatch { parallel_threshold }),
            DispatchStrategy::Hierarchical => Dispatcher::Team(TeamDispatch {
                rows_per_team,
                parallel_threshold,
            }),
        }
    }
}

impl LevelDispatch for Dispatcher {
    #[inline]
    unsafe fn forward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        r: &[f64],
        z: SharedSlice<'_>,
    ) {
        match self {
            Dispatcher::Flat(d) => d.forward_level(matrix, rows, r, z),
            Dispatcher::Team(d) => d.forward_level(matrix, rows, r, z),
        }
    }

    #[inline]
    unsafe fn backward_level(
        &self,
        matrix: &CsrView<'_>,
        rows: &[usize],
        z: &[f64],
        x: SharedSlice<'_>,
    ) {
        match self {
            Dispatcher::Flat(d) => d.backward_level(matrix, rows, z, x),
            Dispatcher::Team(d) => d.backward_level(matrix, rows, z, x),
        }
    }
}
