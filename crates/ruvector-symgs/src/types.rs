//! Sparse matrix storage and the borrowed view the sweep kernels read.
//!
//! [`CsrMatrix`] owns compressed sparse row arrays and is what tests and
//! integrators assemble into. [`CsrView`] borrows those arrays together with
//! a precomputed diagonal-position array and is validated once on
//! construction, so the kernels never re-check structure in the hot loop.

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// CsrMatrix<T>
// ---------------------------------------------------------------------------

/// Compressed Sparse Row (CSR) matrix.
///
/// # Layout
///
/// For a matrix with `m` rows and `nnz` non-zeros:
/// - `row_ptr` has length `m + 1`
/// - `col_indices` and `values` each have length `nnz`
/// - Row `i` spans indices `row_ptr[i]..row_ptr[i+1]`
///
/// `cols` may exceed `rows`: columns `rows..cols` are halo (ghost) columns
/// holding values owned by a neighbouring partition.
#[derive(Debug, Clone)]
pub struct CsrMatrix<T> {
    /// Row pointers: `row_ptr[i]` is the start index in `col_indices`/`values`
    /// for row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices for each non-zero entry.
    pub col_indices: Vec<usize>,
    /// Values for each non-zero entry.
    pub values: Vec<T>,
    /// Number of rows.
    pub rows: usize,
    /// Number of columns (local rows plus halo columns).
    pub cols: usize,
}

impl<T: Copy + Default + std::ops::Mul<Output = T> + std::ops::AddAssign> CsrMatrix<T> {
    /// Sparse matrix-vector multiply: `y = A * x`.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `x.len() >= self.cols` and `y.len() >= self.rows`.
    #[inline]
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        debug_assert!(
            x.len() >= self.cols,
            "spmv: x.len()={} < cols={}",
            x.len(),
            self.cols,
        );
        debug_assert!(
            y.len() >= self.rows,
            "spmv: y.len()={} < rows={}",
            y.len(),
            self.rows,
        );

        for i in 0..self.rows {
            let mut sum = T::default();
            for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[idx] * x[self.col_indices[idx]];
            }
            y[i] = sum;
        }
    }
}

impl<T> CsrMatrix<T> {
    /// Number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Position of each row's diagonal entry within `col_indices`/`values`.
    ///
    /// This is the `diag_ptr` array a [`CsrView`] needs. It is computed once
    /// per sparsity pattern and reused across every sweep.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingDiagonal`] for the first row that
    /// stores no entry in column `row`.
    pub fn diagonal_positions(&self) -> Result<Vec<usize>, ValidationError> {
        (0..self.rows)
            .map(|row| {
                let start = self.row_ptr[row];
                self.col_indices[start..self.row_ptr[row + 1]]
                    .iter()
                    .position(|&c| c == row)
                    .map(|offset| start + offset)
                    .ok_or(ValidationError::MissingDiagonal { row })
            })
            .collect()
    }
}

impl CsrMatrix<f64> {
    /// Build a CSR matrix from `(row, col, value)` triplets.
    ///
    /// Triplets may arrive in any order; columns come out sorted within each
    /// row, which puts the lower part before the diagonal and the upper part
    /// after it. Repeated positions are stored as separate entries.
    ///
    /// # Panics
    ///
    /// Panics if a triplet lies outside `rows` x `cols`.
    pub fn from_coo(
        rows: usize,
        cols: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut triplets: Vec<(usize, usize, f64)> = entries.into_iter().collect();
        if let Some(&(r, c, _)) = triplets.iter().find(|&&(r, c, _)| r >= rows || c >= cols) {
            panic!("CsrMatrix::from_coo: entry ({r}, {c}) outside a {rows}x{cols} matrix");
        }
        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = vec![0usize; rows + 1];
        for &(r, _, _) in &triplets {
            row_ptr[r + 1] += 1;
        }
        for i in 0..rows {
            row_ptr[i + 1] += row_ptr[i];
        }
        let (col_indices, values) = triplets.into_iter().map(|(_, c, v)| (c, v)).unzip();

        Self {
            row_ptr,
            col_indices,
            values,
            rows,
            cols,
        }
    }

    /// Build a square identity matrix of dimension `n` in CSR format.
    pub fn identity(n: usize) -> Self {
        Self {
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: vec![1.0f64; n],
            rows: n,
            cols: n,
        }
    }

    /// Borrow this matrix as a validated [`CsrView`].
    ///
    /// `diag_ptr` is usually the output of
    /// [`diagonal_positions`](Self::diagonal_positions).
    ///
    /// # Errors
    ///
    /// See [`CsrView::new`].
    pub fn view<'a>(&'a self, diag_ptr: &'a [usize]) -> Result<CsrView<'a>, ValidationError> {
        CsrView::new(
            &self.row_ptr,
            &self.col_indices,
            &self.values,
            diag_ptr,
            self.cols,
        )
    }
}

// ---------------------------------------------------------------------------
// CsrView
// ---------------------------------------------------------------------------

/// Read-only view over CSR storage plus per-row diagonal positions.
///
/// Within row `i`, entries at positions `row_ptr[i]..diag_ptr[i]` form the
/// strictly lower part read by the forward sweep and entries at
/// `diag_ptr[i] + 1..row_ptr[i + 1]` the strictly upper part read by the
/// backward sweep.
///
/// A `CsrView` can only be obtained through [`CsrView::new`], which checks
/// every structural invariant the kernels rely on.
#[derive(Debug, Clone, Copy)]
pub struct CsrView<'a> {
    row_ptr: &'a [usize],
    col_indices: &'a [usize],
    values: &'a [f64],
    diag_ptr: &'a [usize],
    cols: usize,
}

impl<'a> CsrView<'a> {
    /// Validate and wrap raw CSR arrays.
    ///
    /// Checks, in order:
    ///
    /// 1. `row_ptr` is non-empty and `rows <= cols`.
    /// 2. `row_ptr[0] == 0`, `row_ptr` is non-decreasing and ends at `nnz`.
    /// 3. `col_indices` and `values` have the same length.
    /// 4. Every column index is below `cols`.
    /// 5. `diag_ptr` has one entry per row, inside that row, pointing at
    ///    column `row`.
    ///
    /// Columns that are not sorted within a row only emit a
    /// [`tracing::warn`]: the sweeps split rows by diagonal position, not by
    /// column order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the first violation found.
    pub fn new(
        row_ptr: &'a [usize],
        col_indices: &'a [usize],
        values: &'a [f64],
        diag_ptr: &'a [usize],
        cols: usize,
    ) -> Result<Self, ValidationError> {
        if row_ptr.is_empty() {
            return Err(ValidationError::DimensionMismatch(
                "row_ptr must hold at least one offset".into(),
            ));
        }
        let rows = row_ptr.len() - 1;
        if rows > cols {
            return Err(ValidationError::DimensionMismatch(format!(
                "matrix has {} rows but only {} columns",
                rows, cols,
            )));
        }

        if row_ptr[0] != 0 {
            return Err(ValidationError::DimensionMismatch(format!(
                "row_ptr[0] = {} (expected 0)",
                row_ptr[0],
            )));
        }
        for i in 1..row_ptr.len() {
            if row_ptr[i] < row_ptr[i - 1] {
                return Err(ValidationError::NonMonotonicRowPtrs { position: i });
            }
        }
        let nnz = values.len();
        if row_ptr[rows] != nnz {
            return Err(ValidationError::DimensionMismatch(format!(
                "values length {} does not match row_ptr[rows] = {}",
                nnz, row_ptr[rows],
            )));
        }
        if col_indices.len() != nnz {
            return Err(ValidationError::DimensionMismatch(format!(
                "col_indices length {} does not match values length {}",
                col_indices.len(),
                nnz,
            )));
        }

        for row in 0..rows {
            let mut prev_col: Option<usize> = None;
            for &col in &col_indices[row_ptr[row]..row_ptr[row + 1]] {
                if col >= cols {
                    return Err(ValidationError::IndexOutOfBounds {
                        index: col,
                        row,
                        cols,
                    });
                }
                if let Some(pc) = prev_col {
                    if col < pc {
                        tracing::warn!(
                            row = row,
                            "column indices not sorted within row (col {} follows {})",
                            col,
                            pc,
                        );
                    }
                }
                prev_col = Some(col);
            }
        }

        if diag_ptr.len() != rows {
            return Err(ValidationError::DimensionMismatch(format!(
                "diag_ptr length {} does not match rows = {}",
                diag_ptr.len(),
                rows,
            )));
        }
        for (row, &position) in diag_ptr.iter().enumerate() {
            let in_row = position >= row_ptr[row] && position < row_ptr[row + 1];
            if !in_row || col_indices[position] != row {
                return Err(ValidationError::InvalidDiagonalPosition { row, position });
            }
        }

        Ok(Self {
            row_ptr,
            col_indices,
            values,
            diag_ptr,
            cols,
        })
    }

    /// Number of local rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Number of columns, local plus halo.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row offsets.
    #[inline]
    pub fn row_ptr(&self) -> &'a [usize] {
        self.row_ptr
    }

    /// Column index of each stored entry.
    #[inline]
    pub fn col_indices(&self) -> &'a [usize] {
        self.col_indices
    }

    /// Value of each stored entry.
    #[inline]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Position of each row's diagonal entry.
    #[inline]
    pub fn diag_ptr(&self) -> &'a [usize] {
        self.diag_ptr
    }

    /// Diagonal coefficient of `row`.
    #[inline]
    pub fn diagonal(&self, row: usize) -> f64 {
        self.values[self.diag_ptr[row]]
    }

    /// Column indices and values stored before the diagonal of `row`.
    #[inline]
    pub fn lower(&self, row: usize) -> (&'a [usize], &'a [f64]) {
        let range = self.row_ptr[row]..self.diag_ptr[row];
        (&self.col_indices[range.clone()], &self.values[range])
    }

    /// Column indices and values stored after the diagonal of `row`.
    #[inline]
    pub fn upper(&self, row: usize) -> (&'a [usize], &'a [f64]) {
        let range = self.diag_ptr[row] + 1..self.row_ptr[row + 1];
        (&self.col_indices[range.clone()], &self.values[range])
    }
}
