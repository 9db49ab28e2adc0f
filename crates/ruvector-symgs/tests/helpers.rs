//! Shared test helpers for the ruvector-symgs integration test suite.
//!
//! Provides deterministic matrix generators, a reference leveling routine, a
//! sequential SYMGS reference and dense reference solvers.

#![allow(dead_code)]

use ruvector_symgs::levels::{Direction, LevelPartition, LevelSchedule};
use ruvector_symgs::types::CsrMatrix;

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [lo, hi).
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

// ---------------------------------------------------------------------------
// Matrix generators
// ---------------------------------------------------------------------------

/// 5-point Laplacian on an `nx` x `ny` grid, natural (row-major) ordering.
pub fn poisson_2d(nx: usize, ny: usize) -> CsrMatrix<f64> {
    let n = nx * ny;
    let mut entries = Vec::with_capacity(5 * n);
    for j in 0..ny {
        for i in 0..nx {
            let row = j * nx + i;
            entries.push((row, row, 4.0));
            if i > 0 {
                entries.push((row, row - 1, -1.0));
            }
            if i + 1 < nx {
                entries.push((row, row + 1, -1.0));
            }
            if j > 0 {
                entries.push((row, row - nx, -1.0));
            }
            if j + 1 < ny {
                entries.push((row, row + nx, -1.0));
            }
        }
    }
    CsrMatrix::from_coo(n, n, entries)
}

/// 27-point stencil on an `nx` x `ny` x `nz` grid: 26 on the diagonal, -1 for
/// every neighbour.
pub fn stencil_27pt(nx: usize, ny: usize, nz: usize) -> CsrMatrix<f64> {
    let n = nx * ny * nz;
    let mut entries = Vec::with_capacity(27 * n);
    for iz in 0..nz {
        for iy in 0..ny {
            for ix in 0..nx {
                let row = (iz * ny + iy) * nx + ix;
                for dz in -1i64..=1 {
                    for dy in -1i64..=1 {
                        for dx in -1i64..=1 {
                            let (x, y, z) = (ix as i64 + dx, iy as i64 + dy, iz as i64 + dz);
                            if x < 0
                                || y < 0
                                || z < 0
                                || x >= nx as i64
                                || y >= ny as i64
                                || z >= nz as i64
                            {
                                continue;
                            }
                            let col = ((z as usize * ny) + y as usize) * nx + x as usize;
                            let value = if col == row { 26.0 } else { -1.0 };
                            entries.push((row, col, value));
                        }
                    }
                }
            }
        }
    }
    CsrMatrix::from_coo(n, n, entries)
}

/// Random strictly diagonally dominant matrix with a non-symmetric pattern.
pub fn random_diag_dominant_csr(n: usize, density: f64, seed: u64) -> CsrMatrix<f64> {
    let mut rng = Lcg::new(seed);
    let mut entries: Vec<(usize, usize, f64)> = Vec::new();

    for i in 0..n {
        let mut off_diag_sum = 0.0f64;
        for j in 0..n {
            if i == j {
                continue;
            }
            if rng.next_f64() < density {
                let val = rng.next_f64_range(-1.0, 1.0);
                entries.push((i, j, val));
                off_diag_sum += val.abs();
            }
        }
        let diag_val = off_diag_sum + 1.0 + rng.next_f64();
        entries.push((i, i, diag_val));
    }

    CsrMatrix::from_coo(n, n, entries)
}

/// Random lower-triangular matrix with a strictly dominant diagonal.
pub fn lower_triangular_csr(n: usize, density: f64, seed: u64) -> CsrMatrix<f64> {
    let mut rng = Lcg::new(seed);
    let mut entries: Vec<(usize, usize, f64)> = Vec::new();
    for i in 0..n {
        let mut off_diag_sum = 0.0f64;
        for j in 0..i {
            if rng.next_f64() < density {
                let val = rng.next_f64_range(-1.0, 1.0);
                entries.push((i, j, val));
                off_diag_sum += val.abs();
            }
        }
        entries.push((i, i, off_diag_sum + 1.0 + rng.next_f64()));
    }
    CsrMatrix::from_coo(n, n, entries)
}

/// Deterministic random vector of length `n`.
pub fn random_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| rng.next_f64_range(-1.0, 1.0)).collect()
}

// ---------------------------------------------------------------------------
// Reference leveling
// ---------------------------------------------------------------------------

/// Longest-path level of every local row for one sweep direction.
///
/// Assumes columns are sorted within each row, so the lower part holds
/// columns below the row and the upper part columns above it.
pub fn compute_levels(matrix: &CsrMatrix<f64>, diag: &[usize], direction: Direction) -> Vec<usize> {
    let n = matrix.rows;
    let mut level = vec![0usize; n];
    let rows: Box<dyn Iterator<Item = usize>> = match direction {
        Direction::Forward => Box::new(0..n),
        Direction::Backward => Box::new((0..n).rev()),
    };
    for row in rows {
        let range = match direction {
            Direction::Forward => matrix.row_ptr[row]..diag[row],
            Direction::Backward => diag[row] + 1..matrix.row_ptr[row + 1],
        };
        let row_level = matrix.col_indices[range]
            .iter()
            .filter(|&&col| col < n && col != row)
            .map(|&col| level[col] + 1)
            .max()
            .unwrap_or(0);
        level[row] = row_level;
    }
    level
}

/// Diagonal positions and a dependency-respecting level partition.
pub fn build_partition(matrix: &CsrMatrix<f64>) -> (Vec<usize>, LevelPartition) {
    let diag = matrix.diagonal_positions().unwrap();
    let forward = compute_levels(matrix, &diag, Direction::Forward);
    let backward = compute_levels(matrix, &diag, Direction::Backward);
    let partition = LevelPartition::new(
        LevelSchedule::from_row_levels(Direction::Forward, &forward).unwrap(),
        LevelSchedule::from_row_levels(Direction::Backward, &backward).unwrap(),
    )
    .unwrap();
    (diag, partition)
}

// ---------------------------------------------------------------------------
// Reference smoothers
// ---------------------------------------------------------------------------

/// Sequential symmetric Gauss-Seidel in natural row order.
///
/// `x` must already hold the halo values; its local entries are overwritten.
pub fn sequential_symgs(matrix: &CsrMatrix<f64>, diag: &[usize], r: &[f64], x: &mut [f64]) {
    let n = matrix.rows;
    let mut z = vec![0.0f64; x.len()];

    for i in 0..n {
        let mut dot = 0.0f64;
        for k in matrix.row_ptr[i]..diag[i] {
            dot += matrix.values[k] * z[matrix.col_indices[k]];
        }
        z[i] = (r[i] - dot) / matrix.values[diag[i]];
    }
    for i in 0..n {
        z[i] *= matrix.values[diag[i]];
    }
    for i in (0..n).rev() {
        let mut dot = 0.0f64;
        for k in diag[i] + 1..matrix.row_ptr[i + 1] {
            dot += matrix.values[k] * x[matrix.col_indices[k]];
        }
        x[i] = (z[i] - dot) / matrix.values[diag[i]];
    }
}

/// Dense `M = (D + L) D^-1 (D + U)` of a square matrix.
pub fn symgs_operator(matrix: &CsrMatrix<f64>, diag: &[usize]) -> CsrMatrix<f64> {
    let n = matrix.rows;
    let mut lower = vec![vec![0.0f64; n]; n];
    let mut upper = vec![vec![0.0f64; n]; n];
    let mut d = vec![0.0f64; n];
    for i in 0..n {
        d[i] = matrix.values[diag[i]];
        for k in matrix.row_ptr[i]..matrix.row_ptr[i + 1] {
            let j = matrix.col_indices[k];
            if k <= diag[i] {
                lower[i][j] += matrix.values[k];
            }
            if k >= diag[i] {
                upper[i][j] += matrix.values[k];
            }
        }
    }

    let mut entries = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let sum: f64 = (0..n).map(|k| lower[i][k] * upper[k][j] / d[k]).sum();
            if sum != 0.0 {
                entries.push((i, j, sum));
            }
        }
    }
    CsrMatrix::from_coo(n, n, entries)
}

/// Solve `Ax = b` with dense Gaussian elimination and partial pivoting.
pub fn dense_solve(matrix: &CsrMatrix<f64>, rhs: &[f64]) -> Vec<f64> {
    let n = matrix.rows;
    assert_eq!(n, matrix.cols, "dense_solve requires a square matrix");
    assert_eq!(rhs.len(), n, "rhs length must match matrix dimension");

    let mut aug = vec![vec![0.0f64; n + 1]; n];
    for i in 0..n {
        aug[i][n] = rhs[i];
        for idx in matrix.row_ptr[i]..matrix.row_ptr[i + 1] {
            aug[i][matrix.col_indices[idx]] += matrix.values[idx];
        }
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            if aug[row][col].abs() > max_val {
                max_val = aug[row][col].abs();
                max_row = row;
            }
        }
        assert!(max_val > 1e-15, "matrix is singular or near-singular");
        aug.swap(col, max_row);

        let pivot = aug[col][col];
        for row in (col + 1)..n {
            let factor = aug[row][col] / pivot;
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = aug[i][n];
        for j in (i + 1)..n {
            sum -= aug[i][j] * x[j];
        }
        x[i] = sum / aug[i][i];
    }
    x
}

// ---------------------------------------------------------------------------
// Floating-point comparison utilities
// ---------------------------------------------------------------------------

pub fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// `||approx - exact|| / ||exact||`, or the absolute error when `exact` is 0.
pub fn relative_error(approx: &[f64], exact: &[f64]) -> f64 {
    assert_eq!(approx.len(), exact.len(), "vectors must have same length");
    let error = approx
        .iter()
        .zip(exact)
        .map(|(&a, &e)| (a - e) * (a - e))
        .sum::<f64>()
        .sqrt();
    let exact_norm = l2_norm(exact);
    if exact_norm > 1e-15 {
        error / exact_norm
    } else {
        error
    }
}
