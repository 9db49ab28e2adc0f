//! Halo exchange seam.
//!
//! When a matrix is one partition of a larger decomposition, some of its
//! columns (`>= rows`) refer to entries owned elsewhere. Before a sweep reads
//! them, the smoother hands `x` to a [`HaloExchange`] that fills those
//! positions. The transport belongs to the caller; this crate ships a no-op
//! and a shared-memory copy.

use tracing::trace;

use crate::error::ValidationError;

/// Fills the halo positions of `x` with current remote values.
///
/// Called once at the start of every smoother call, before any row is
/// updated. Must be finished when it returns.
pub trait HaloExchange {
    /// Update the halo entries of `x` in place.
    fn exchange(&mut self, x: &mut [f64]);
}

/// Single-partition exchange: there are no halo entries to fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHalo;

impl HaloExchange for NoHalo {
    #[inline]
    fn exchange(&mut self, _x: &mut [f64]) {}
}

/// Shared-memory exchange that copies halo values out of a neighbour's vector.
///
/// Each `(halo_slot, source_index)` pair copies `source[source_index]` into
/// `x[halo_slot]`. Source indices are checked when the exchange is built or
/// re-pointed, and the length of `x` once per call before any slot is
/// written, so a bad map never leaves `x` half refreshed.
///
/// ```rust
/// use ruvector_symgs::halo::{GhostCopy, HaloExchange};
///
/// let neighbour = [7.0, 8.0, 9.0];
/// let mut halo = GhostCopy::new(&neighbour, vec![(2, 0), (3, 2)]).unwrap();
/// let mut x = vec![1.0, 1.0, 0.0, 0.0];
/// halo.exchange(&mut x);
/// assert_eq!(x, vec![1.0, 1.0, 7.0, 9.0]);
/// ```
#[derive(Debug, Clone)]
pub struct GhostCopy<'a> {
    source: &'a [f64],
    slots: Vec<(usize, usize)>,
    /// Smallest `x` length that holds every halo slot.
    required_len: usize,
}

impl<'a> GhostCopy<'a> {
    /// Copy from `source` according to `slots`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] if a source index
    /// does not fit `source`.
    pub fn new(source: &'a [f64], slots: Vec<(usize, usize)>) -> Result<Self, ValidationError> {
        check_sources(&slots, source)?;
        let required_len = slots
            .iter()
            .map(|&(slot, _)| slot.saturating_add(1))
            .max()
            .unwrap_or(0);
        Ok(Self {
            source,
            slots,
            required_len,
        })
    }

    /// Point the exchange at a new source vector, keeping the slot map.
    ///
    /// On error the previous source stays in place.
    pub fn set_source(&mut self, source: &'a [f64]) -> Result<(), ValidationError> {
        check_sources(&self.slots, source)?;
        self.source = source;
        Ok(())
    }

    /// The `(halo_slot, source_index)` map.
    pub fn slots(&self) -> &[(usize, usize)] {
        &self.slots
    }
}

fn check_sources(slots: &[(usize, usize)], source: &[f64]) -> Result<(), ValidationError> {
    match slots.iter().find(|&&(_, src)| src >= source.len()) {
        Some(&(slot, src)) => Err(ValidationError::ParameterOutOfRange {
            name: format!("source index for halo slot {slot}"),
            value: src.to_string(),
            expected: format!("< {}", source.len()),
        }),
        None => Ok(()),
    }
}

impl HaloExchange for GhostCopy<'_> {
    fn exchange(&mut self, x: &mut [f64]) {
        assert!(
            x.len() >= self.required_len,
            "GhostCopy: halo slot {} out of bounds for x of length {}",
            self.required_len - 1,
            x.len(),
        );
        for &(slot, src) in &self.slots {
            x[slot] = self.source[src];
        }
        trace!(slots = self.slots.len(), "halo exchanged");
    }
}
