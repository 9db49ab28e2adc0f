//! Level-scheduled symmetric Gauss-Seidel smoothing for the ruvector
//! ecosystem.
//!
//! A symmetric Gauss-Seidel (SYMGS) step applies
//!
//! ```text
//! x = (D + U)^-1 D (D + L)^-1 r
//! ```
//!
//! to a residual `r`, where `L`, `D` and `U` are the strictly lower, diagonal
//! and strictly upper parts of a sparse matrix in CSR form. Both triangular
//! solves are sequential recurrences. This crate runs them in parallel by
//! following a precomputed partition of the rows into dependency levels:
//! rows of one level never read each other and are updated together, levels
//! run one after another.
//!
//! # Building blocks
//!
//! | Type | Module | Role |
//! |------|--------|------|
//! | [`CsrView`](types::CsrView) | [`types`] | validated CSR arrays plus diagonal positions |
//! | [`LevelPartition`](levels::LevelPartition) | [`levels`] | forward and backward level schedules |
//! | [`SymgsPlan`](plan::SymgsPlan) | [`plan`] | a view and a partition checked against each other |
//! | [`LevelSymgs`](smoother::LevelSymgs) | [`smoother`] | runs the sweeps |
//! | [`HaloExchange`](halo::HaloExchange) | [`halo`] | fills off-partition entries of `x` |
//!
//! # Feature flags
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `parallel` | yes | dispatch levels onto the rayon pool |
//! | `team-dispatch` | no | make [`DispatchStrategy::Hierarchical`](dispatch::DispatchStrategy::Hierarchical) the default |
//!
//! # Example
//!
//! ```rust
//! use ruvector_symgs::halo::NoHalo;
//! use ruvector_symgs::levels::{Direction, LevelPartition, LevelSchedule};
//! use ruvector_symgs::plan::SymgsPlan;
//! use ruvector_symgs::smoother::LevelSymgs;
//! use ruvector_symgs::types::CsrMatrix;
//!
//! // [ 2  0 ]
//! // [ 1  3 ]
//! let a = CsrMatrix::from_coo(2, 2, vec![(0, 0, 2.0), (1, 0, 1.0), (1, 1, 3.0)]);
//! let diag = a.diagonal_positions().unwrap();
//!
//! // Row 1 reads row 0 in the forward sweep; nothing is read backwards.
//! let levels = LevelPartition::new(
//!     LevelSchedule::from_row_levels(Direction::Forward, &[0, 1]).unwrap(),
//!     LevelSchedule::from_row_levels(Direction::Backward, &[0, 0]).unwrap(),
//! ).unwrap();
//! let plan = SymgsPlan::new(a.view(&diag).unwrap(), &levels).unwrap();
//!
//! let mut x = vec![0.0; 2];
//! LevelSymgs::default().apply(&plan, &mut NoHalo, &[4.0, 5.0], &mut x);
//! assert_eq!(x, vec![2.0, 1.0]);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod halo;
pub(crate) mod kernels;
pub mod levels;
pub mod plan;
pub mod smoother;
pub mod types;

pub use config::SmootherConfig;
pub use dispatch::DispatchStrategy;
pub use error::ValidationError;
pub use plan::SymgsPlan;
pub use smoother::LevelSymgs;
