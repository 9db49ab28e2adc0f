//! Level-scheduled symmetric Gauss-Seidel smoother.
//!
//! One call of [`LevelSymgs::apply`] runs four phases:
//!
//! ```text
//! 1. halo.exchange(x)
//! 2. for k in 0..F:  forward level k     z[i] = (r[i] - L(i) . z) / a_ii
//! 3. for every row:  z[i] *= a_ii
//! 4. for k in 0..B:  backward level k    x[i] = (z[i] - U(i) . x) / a_ii
//! ```
//!
//! Rows inside a level run concurrently; each phase and each level completes
//! before the next one starts. The input value of `x` is only read at halo
//! positions, so the result is `x = (D + U)^-1 D (D + L)^-1 r` regardless of
//! the starting guess.

use std::time::Instant;

use tracing::{debug, instrument, trace, warn};

use crate::config::SmootherConfig;
use crate::dispatch::{DispatchStrategy, Dispatcher, LevelDispatch};
use crate::error::ValidationError;
use crate::halo::HaloExchange;
use crate::kernels::{self, SharedSlice};
use crate::plan::SymgsPlan;

// ---------------------------------------------------------------------------
// LevelSymgs
// ---------------------------------------------------------------------------

/// Symmetric Gauss-Seidel smoother driven by a precomputed level partition.
///
/// Holds only configuration; every call allocates its own scratch vector, so
/// one smoother can serve many plans, including concurrently.
///
/// # Example
///
/// ```rust
/// use ruvector_symgs::halo::NoHalo;
/// use ruvector_symgs::levels::{Direction, LevelPartition, LevelSchedule};
/// use ruvector_symgs::plan::SymgsPlan;
/// use ruvector_symgs::smoother::LevelSymgs;
/// use ruvector_symgs::types::CsrMatrix;
///
/// // 1-D Laplacian on 3 points.
/// let a = CsrMatrix::from_coo(3, 3, vec![
///     (0, 0, 2.0), (0, 1, -1.0),
///     (1, 0, -1.0), (1, 1, 2.0), (1, 2, -1.0),
///     (2, 1, -1.0), (2, 2, 2.0),
/// ]);
/// let diag = a.diagonal_positions().unwrap();
/// let levels = LevelPartition::new(
///     LevelSchedule::from_row_levels(Direction::Forward, &[0, 1, 2]).unwrap(),
///     LevelSchedule::from_row_levels(Direction::Backward, &[2, 1, 0]).unwrap(),
/// ).unwrap();
/// let plan = SymgsPlan::new(a.view(&diag).unwrap(), &levels).unwrap();
///
/// let smoother = LevelSymgs::default();
/// let r = vec![1.0, 0.0, 1.0];
/// let mut x = vec![0.0; 3];
/// smoother.apply(&plan, &mut NoHalo, &r, &mut x);
/// assert!(x.iter().all(|v| v.is_finite() && *v > 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct LevelSymgs {
    config: SmootherConfig,
    dispatcher: Dispatcher,
}

impl LevelSymgs {
    /// Create a smoother from `config`.
    ///
    /// A config that fails [`SmootherConfig::validate`] (a `rows_per_team`
    /// of zero) is clamped to `rows_per_team = 1` with a warning.
    pub fn new(mut config: SmootherConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!(%err, "clamping rows_per_team to 1");
            config.rows_per_team = 1;
        }
        let dispatcher = Dispatcher::new(
            config.dispatch,
            config.rows_per_team,
            config.parallel_threshold,
        );
        Self { config, dispatcher }
    }

    /// The effective configuration (after clamping).
    #[inline]
    pub fn config(&self) -> &SmootherConfig {
        &self.config
    }

    /// The active dispatch strategy.
    #[inline]
    pub fn strategy(&self) -> DispatchStrategy {
        self.config.dispatch
    }

    /// Run one symmetric Gauss-Seidel step, writing the result into `x`.
    ///
    /// `x` must span every column of the matrix, local rows first and halo
    /// positions after them. Its local entries are overwritten; its halo
    /// entries are refreshed by `halo` and then only read.
    ///
    /// # Panics
    ///
    /// - If `x.len() != plan.matrix().cols()`.
    /// - If `r.len() < plan.rows()`.
    ///
    /// Use [`try_apply`](Self::try_apply) to get an error instead.
    #[instrument(
        skip_all,
        fields(
            rows = plan.rows(),
            nnz = plan.matrix().nnz(),
            forward_levels = plan.levels().forward().num_levels(),
            backward_levels = plan.levels().backward().num_levels(),
        )
    )]
    pub fn apply<H: HaloExchange + ?Sized>(
        &self,
        plan: &SymgsPlan<'_>,
        halo: &mut H,
        r: &[f64],
        x: &mut [f64],
    ) {
        assert_eq!(
            x.len(),
            plan.matrix().cols(),
            "LevelSymgs::apply: x length {} does not match matrix columns {}",
            x.len(),
            plan.matrix().cols(),
        );
        assert!(
            r.len() >= plan.rows(),
            "LevelSymgs::apply: r length {} is shorter than matrix rows {}",
            r.len(),
            plan.rows(),
        );
        self.sweep(plan, halo, r, x);
    }

    /// Like [`apply`](Self::apply), but reports length mismatches as errors.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] if `x` does not span
    /// the matrix columns or `r` is shorter than the row count. `x` is left
    /// untouched in that case.
    pub fn try_apply<H: HaloExchange + ?Sized>(
        &self,
        plan: &SymgsPlan<'_>,
        halo: &mut H,
        r: &[f64],
        x: &mut [f64],
    ) -> Result<(), ValidationError> {
        let cols = plan.matrix().cols();
        if x.len() != cols {
            return Err(ValidationError::DimensionMismatch(format!(
                "x length {} does not match matrix columns {}",
                x.len(),
                cols,
            )));
        }
        if r.len() < plan.rows() {
            return Err(ValidationError::DimensionMismatch(format!(
                "r length {} is shorter than matrix rows {}",
                r.len(),
                plan.rows(),
            )));
        }
        self.apply(plan, halo, r, x);
        Ok(())
    }

    fn sweep<H: HaloExchange + ?Sized>(
        &self,
        plan: &SymgsPlan<'_>,
        halo: &mut H,
        r: &[f64],
        x: &mut [f64],
    ) {
        let matrix = plan.matrix();
        let forward = plan.levels().forward();
        let backward = plan.levels().backward();

        halo.exchange(x);

        let start = Instant::now();
        let mut z = vec![0.0f64; x.len()];
        {
            let z_shared = SharedSlice::new(&mut z);
            for (k, rows) in forward.levels().enumerate() {
                trace!(level = k, rows = rows.len(), "forward level");
                // SAFETY: the plan validated the forward schedule against
                // this matrix, and levels run in order.
                unsafe { self.dispatcher.forward_level(matrix, rows, r, z_shared) };
            }
        }
        debug!(
            levels = forward.num_levels(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "forward sweep done"
        );

        let start = Instant::now();
        kernels::scale_by_diagonal(matrix, &mut z, self.config.parallel_threshold);
        debug!(
            elapsed_us = start.elapsed().as_micros() as u64,
            "diagonal scaling done"
        );

        let start = Instant::now();
        let x_shared = SharedSlice::new(x);
        for (k, rows) in backward.levels().enumerate() {
            trace!(level = k, rows = rows.len(), "backward level");
            // SAFETY: as above, for the backward schedule.
            unsafe { self.dispatcher.backward_level(matrix, rows, &z, x_shared) };
        }
        debug!(
            levels = backward.num_levels(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "backward sweep done"
        );
    }
}

impl Default for LevelSymgs {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}
