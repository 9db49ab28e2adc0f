//! Row kernels of the symmetric Gauss-Seidel sweep.
//!
//! Each sweep row solves one equation of a triangular system:
//!
//! ```text
//! forward:   z[i] = (r[i] - sum_{j in L(i)} a_ij * z[j]) / a_ii
//! scale:     z[i] = z[i] * a_ii
//! backward:  x[i] = (z[i] - sum_{j in U(i)} a_ij * x[j]) / a_ii
//! ```
//!
//! so a full call computes `x = (D + U)^-1 D (D + L)^-1 r`. The numerical
//! recurrence lives only here; the dispatch strategies differ solely in how
//! they spread rows across workers and which [`RowDot`] reduction they pick.

use std::marker::PhantomData;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::CsrView;

/// Accumulator width of the lane reduction used by the hierarchical strategy.
pub(crate) const LANES: usize = 8;

// ---------------------------------------------------------------------------
// SharedSlice
// ---------------------------------------------------------------------------

/// A mutable `f64` slice that several workers may read and write at once.
///
/// Workers of one level write disjoint elements and only read elements that
/// earlier levels finalized, so element accesses never race. That property
/// comes from a validated [`SymgsPlan`](crate::plan::SymgsPlan), which is why
/// every access is `unsafe`.
#[derive(Clone, Copy)]
pub(crate) struct SharedSlice<'a> {
    ptr: *mut f64,
    len: usize,
    _marker: PhantomData<&'a mut [f64]>,
}

// SAFETY: `SharedSlice` is only a pointer to `f64`s borrowed mutably for
// `'a`. Moving or sharing the handle across threads is sound because every
// element access is `unsafe` and callers guarantee that no element is written
// by one worker while another worker reads or writes it.
unsafe impl Send for SharedSlice<'_> {}
unsafe impl Sync for SharedSlice<'_> {}

impl<'a> SharedSlice<'a> {
    pub(crate) fn new(slice: &'a mut [f64]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    /// Read element `i`.
    ///
    /// # Safety
    ///
    /// `i < len`, and no other worker writes element `i` concurrently.
    #[inline]
    pub(crate) unsafe fn get(&self, i: usize) -> f64 {
        debug_assert!(i < self.len, "SharedSlice::get: {i} >= {}", self.len);
        *self.ptr.add(i)
    }

    /// Write element `i`.
    ///
    /// # Safety
    ///
    /// `i < len`, and no other worker reads or writes element `i`
    /// concurrently.
    #[inline]
    pub(crate) unsafe fn set(&self, i: usize, value: f64) {
        debug_assert!(i < self.len, "SharedSlice::set: {i} >= {}", self.len);
        *self.ptr.add(i) = value;
    }
}

// ---------------------------------------------------------------------------
// Row reductions
// ---------------------------------------------------------------------------

/// Off-diagonal dot product of one row against a shared vector.
pub(crate) trait RowDot {
    /// `sum_k vals[k] * v[cols[k]]`.
    ///
    /// # Safety
    ///
    /// Every `cols[k]` is in bounds for `v` and not written concurrently.
    unsafe fn dot(cols: &[usize], vals: &[f64], v: SharedSlice<'_>) -> f64;
}

/// Left-to-right accumulation; deterministic for a given row.
pub(crate) struct Serial;

impl RowDot for Serial {
    #[inline]
    unsafe fn dot(cols: &[usize], vals: &[f64], v: SharedSlice<'_>) -> f64 {
        let mut sum = 0.0f64;
        for (&c, &a) in cols.iter().zip(vals) {
            sum += a * v.get(c);
        }
        sum
    }
}

/// Entry `k` goes to lane `k % LANES`; the lanes are summed at the end.
///
/// The vector-range reduction of a team worker: a different summation order
/// from [`Serial`], equal up to rounding.
pub(crate) struct Lanes;

impl RowDot for Lanes {
    #[inline]
    unsafe fn dot(cols: &[usize], vals: &[f64], v: SharedSlice<'_>) -> f64 {
        let mut acc = [0.0f64; LANES];
        let mut col_chunks = cols.chunks_exact(LANES);
        let mut val_chunks = vals.chunks_exact(LANES);
        for (c, a) in (&mut col_chunks).zip(&mut val_chunks) {
            for lane in 0..LANES {
                acc[lane] += a[lane] * v.get(c[lane]);
            }
        }
        for (lane, (&c, &a)) in col_chunks
            .remainder()
            .iter()
            .zip(val_chunks.remainder())
            .enumerate()
        {
            acc[lane] += a * v.get(c);
        }
        acc.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Sweep kernels
// ---------------------------------------------------------------------------

/// Forward update of a single row: writes `z[row]`.
///
/// # Safety
///
/// `row` belongs to the level being processed, no other worker touches
/// `z[row]`, and every lower-triangular column of `row` was finalized by an
/// earlier level (or is a halo column).
#[inline]
pub(crate) unsafe fn forward_row<D: RowDot>(
    matrix: &CsrView<'_>,
    row: usize,
    r: &[f64],
    z: SharedSlice<'_>,
) {
    let (cols, vals) = matrix.lower(row);
    let sum = r[row] - D::dot(cols, vals, z);
    z.set(row, sum / matrix.diagonal(row));
}

/// Backward update of a single row: writes `x[row]`.
///
/// # Safety
///
/// `row` belongs to the level being processed, no other worker touches
/// `x[row]`, and every upper-triangular column of `row` was finalized by an
/// earlier level (or is a halo column).
#[inline]
pub(crate) unsafe fn backward_row<D: RowDot>(
    matrix: &CsrView<'_>,
    row: usize,
    z: &[f64],
    x: SharedSlice<'_>,
) {
    let (cols, vals) = matrix.upper(row);
    let sum = z[row] - D::dot(cols, vals, x);
    x.set(row, sum / matrix.diagonal(row));
}

/// Diagonal scaling `z[i] *= a_ii` over all local rows.
///
/// Halo entries of `z` (past `matrix.rows()`) have no diagonal and are left
/// untouched. Rows are independent, so this is a plain data-parallel map.
pub(crate) fn scale_by_diagonal(matrix: &CsrView<'_>, z: &mut [f64], parallel_threshold: usize) {
    let rows = matrix.rows();
    let scale = |(row, zi): (usize, &mut f64)| *zi *= matrix.diagonal(row);

    #[cfg(feature = "parallel")]
    {
        if rows >= parallel_threshold {
            z[..rows].par_iter_mut().enumerate().for_each(scale);
            return;
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel_threshold;

    z[..rows].iter_mut().enumerate().for_each(scale);
}
