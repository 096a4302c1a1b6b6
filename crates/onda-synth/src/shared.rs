//! Lock-free publication of modulation values for display.
//!
//! The audio thread publishes the current pd-amount, filter-cutoff, and
//! amplitude modulation deltas once per sample; a UI refresh loop reads
//! them opportunistically to animate meters. Values are stored as f32 bits
//! in `AtomicU32` with relaxed ordering: there is a single writer, readers
//! tolerate staleness of up to one block, and no consistency is promised
//! *across* the three values — each is an independent scalar.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::mod_matrix::{DestinationValues, ModDestination};

/// Shared modulation-state snapshot (single writer, many readers).
///
/// # Example
///
/// ```rust
/// use onda_synth::SharedModState;
///
/// let shared = SharedModState::new();
/// // audio thread: shared.publish(&deltas) once per sample
/// // UI thread:
/// let cutoff_mod = shared.filter_cutoff();
/// assert_eq!(cutoff_mod, 0.0);
/// ```
#[derive(Debug, Default)]
pub struct SharedModState {
    pd_amount: AtomicU32,
    filter_cutoff: AtomicU32,
    amp: AtomicU32,
}

impl SharedModState {
    /// Create with all values at zero.
    pub fn new() -> Self {
        Self {
            pd_amount: AtomicU32::new(0.0f32.to_bits()),
            filter_cutoff: AtomicU32::new(0.0f32.to_bits()),
            amp: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Publish the current destination deltas. Audio thread only.
    #[inline]
    pub fn publish(&self, deltas: &DestinationValues) {
        self.pd_amount.store(
            deltas.get(ModDestination::PdAmount).to_bits(),
            Ordering::Relaxed,
        );
        self.filter_cutoff.store(
            deltas.get(ModDestination::FilterCutoff).to_bits(),
            Ordering::Relaxed,
        );
        self.amp
            .store(deltas.get(ModDestination::Amp).to_bits(), Ordering::Relaxed);
    }

    /// Last published pd-amount modulation.
    pub fn pd_amount(&self) -> f32 {
        f32::from_bits(self.pd_amount.load(Ordering::Relaxed))
    }

    /// Last published filter-cutoff modulation.
    pub fn filter_cutoff(&self) -> f32 {
        f32::from_bits(self.filter_cutoff.load(Ordering::Relaxed))
    }

    /// Last published amplitude modulation.
    pub fn amp(&self) -> f32 {
        f32::from_bits(self.amp.load(Ordering::Relaxed))
    }
}
