//! Multimode state-variable filter with keyboard tracking.
//!
//! # Topology
//!
//! Implements the Topology-Preserving Transform (TPT, "zero-delay
//! feedback") SVF after Zavalishin, "The Art of VA Filter Design" (2012).
//! The trapezoidal integrator discretization solves the instantaneous
//! feedback loop algebraically each sample, so the cutoff can be swept at
//! audio rate — which keyboard tracking does — without the artifacts of
//! Direct Form implementations.
//!
//! # Key tracking
//!
//! The effective cutoff follows the played note:
//!
//! ```text
//! tracked = cutoff * (key_frequency / reference)^tracking
//! ```
//!
//! At `tracking = 0` the cutoff is fixed; at `tracking = 1` it moves
//! proportionally with the note frequency. The tracked cutoff is capped at
//! `0.49 × sample_rate` to keep the prewarped coefficient finite near
//! Nyquist.
//!
//! # Numerical containment
//!
//! Both integrator states are passed through
//! [`flush_denormal`] every sample: subnormal tails are
//! flushed to exact zero, and a NaN or Inf that reaches the state is
//! ejected instead of recirculating forever.
//!
//! # Performance
//!
//! Coefficients are recomputed every sample (the tracked cutoff is a
//! per-sample input), so `g = tan(π·fc/fs)` uses the Padé
//! [`fast_tan`] below 10 kHz and falls back to
//! `libm::tanf` above, where the approximation loses accuracy.
//!
//! # Reference
//!
//! Zavalishin, "The Art of VA Filter Design", rev. 2.1.2 (2018), Chapter 3.

use core::f32::consts::PI;
use libm::{powf, tanf};

use crate::fast_math::fast_tan;
use crate::math::flush_denormal;

/// Filter output tap selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    /// Low-pass output — passes frequencies below the cutoff.
    #[default]
    Lowpass,
    /// Band-pass output — passes frequencies near the cutoff.
    Bandpass,
    /// High-pass output — passes frequencies above the cutoff.
    Highpass,
}

/// Two-pole multimode state-variable filter (12 dB/oct).
///
/// ## Parameters
///
/// - `cutoff_hz`: base cutoff frequency in Hz (≥ 20.0, default 1000.0)
/// - `resonance`: 0.0 to 0.99 (default 0.1). Maps to the damping term
///   `k = 2 − 1.99·resonance`, so `k` never reaches 0 and the pole pair
///   stays inside the unit circle even at full resonance.
/// - `key_tracking`: 0.0 (fixed cutoff) to 1.0 (full tracking)
/// - `key_tracking_reference_hz`: note frequency at which tracking is
///   neutral (default 440.0)
///
/// # Example
///
/// ```rust
/// use onda_core::{MultiModeFilter, FilterMode};
///
/// let mut filter = MultiModeFilter::new(48000.0);
/// filter.set_mode(FilterMode::Bandpass);
/// filter.set_cutoff_hz(800.0);
/// filter.set_resonance(0.6);
/// filter.set_key_tracking(0.5);
///
/// let out = filter.process_sample(0.25, 110.0);
/// assert!(out.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct MultiModeFilter {
    // Integrator states
    ic1eq: f32,
    ic2eq: f32,

    sample_rate: f32,
    mode: FilterMode,
    cutoff_hz: f32,
    resonance: f32,
    key_tracking: f32,
    key_tracking_reference_hz: f32,
}

const MIN_CUTOFF_HZ: f32 = 20.0;

impl Default for MultiModeFilter {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl MultiModeFilter {
    /// Create a new filter at the given sample rate.
    ///
    /// Initialises with lowpass output, cutoff = 1000 Hz, resonance = 0.1,
    /// no key tracking, reference = 440 Hz.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            sample_rate: sample_rate.max(1.0),
            mode: FilterMode::Lowpass,
            cutoff_hz: 1000.0,
            resonance: 0.1,
            key_tracking: 0.0,
            key_tracking_reference_hz: 440.0,
        }
    }

    /// Update the sample rate. Non-positive values are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    /// Select the output tap.
    pub fn set_mode(&mut self, mode: FilterMode) {
        self.mode = mode;
    }

    /// Current output tap.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Set the base cutoff frequency in Hz. Floored at 20 Hz.
    pub fn set_cutoff_hz(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz.max(MIN_CUTOFF_HZ);
    }

    /// Current base cutoff in Hz.
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Set resonance. Clamped to [0.0, 0.99].
    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 0.99);
    }

    /// Current resonance.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Set keyboard tracking amount. Clamped to [0.0, 1.0].
    pub fn set_key_tracking(&mut self, tracking: f32) {
        self.key_tracking = tracking.clamp(0.0, 1.0);
    }

    /// Current keyboard tracking amount.
    pub fn key_tracking(&self) -> f32 {
        self.key_tracking
    }

    /// Set the reference frequency at which tracking is neutral. Floored at 1 Hz.
    pub fn set_key_tracking_reference_hz(&mut self, reference_hz: f32) {
        self.key_tracking_reference_hz = reference_hz.max(1.0);
    }

    /// Zero both integrator states.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    /// Process one sample.
    ///
    /// `key_frequency_hz` is the current note frequency driving keyboard
    /// tracking; pass the reference frequency (or set tracking to 0) for an
    /// untracked filter.
    #[inline]
    pub fn process_sample(&mut self, input: f32, key_frequency_hz: f32) -> f32 {
        let key_ratio = key_frequency_hz.max(1.0) / self.key_tracking_reference_hz;
        let tracked_cutoff = self.cutoff_hz * powf(key_ratio, self.key_tracking);
        let limited_cutoff = tracked_cutoff.min(0.49 * self.sample_rate);

        let arg = PI * limited_cutoff / self.sample_rate;
        let g = if limited_cutoff < 10_000.0 {
            fast_tan(arg)
        } else {
            tanf(arg)
        };
        let k = 2.0 - 1.99 * self.resonance;

        let a1 = 1.0 / (1.0 + g * (g + k));
        let a2 = g * a1;
        let a3 = g * a2;

        let v3 = input - self.ic2eq;
        let v1 = a1 * self.ic1eq + a2 * v3;
        let v2 = self.ic2eq + a2 * self.ic1eq + a3 * v3;

        self.ic1eq = flush_denormal(2.0 * v1 - self.ic1eq);
        self.ic2eq = flush_denormal(2.0 * v2 - self.ic2eq);

        match self.mode {
            FilterMode::Lowpass => flush_denormal(v2),
            FilterMode::Bandpass => flush_denormal(v1),
            FilterMode::Highpass => flush_denormal(input - k * v1 - v2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;
    const KEY: f32 = 440.0;

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_cutoff_hz(1000.0);

        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.process_sample(1.0, KEY);
        }
        assert!((out - 1.0).abs() < 0.05, "DC should pass, got {out}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_cutoff_hz(1000.0);
        filter.set_mode(FilterMode::Highpass);

        let mut out = 0.0;
        for _ in 0..2000 {
            out = filter.process_sample(1.0, KEY);
        }
        assert!(out.abs() < 0.05, "DC should be blocked, got {out}");
    }

    #[test]
    fn bandpass_settles_on_dc() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_cutoff_hz(1000.0);
        filter.set_mode(FilterMode::Bandpass);

        let mut out = 1.0;
        for _ in 0..4000 {
            out = filter.process_sample(1.0, KEY);
        }
        assert!(out.abs() < 0.05, "bandpass should reject DC, got {out}");
    }

    #[test]
    fn reset_clears_state() {
        let mut filter = MultiModeFilter::new(SR);
        for _ in 0..100 {
            filter.process_sample(1.0, KEY);
        }
        filter.reset();
        assert_eq!(filter.ic1eq, 0.0);
        assert_eq!(filter.ic2eq, 0.0);
    }

    #[test]
    fn resonance_is_clamped() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_resonance(5.0);
        assert_eq!(filter.resonance(), 0.99);
        filter.set_resonance(-1.0);
        assert_eq!(filter.resonance(), 0.0);
    }

    #[test]
    fn cutoff_floor_applied() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_cutoff_hz(-300.0);
        assert_eq!(filter.cutoff_hz(), 20.0);
    }

    #[test]
    fn nan_input_does_not_poison_state() {
        let mut filter = MultiModeFilter::new(SR);
        filter.process_sample(f32::NAN, KEY);

        // After the fault the filter must recover to finite output
        let mut out = 0.0;
        for _ in 0..100 {
            out = filter.process_sample(0.5, KEY);
        }
        assert!(out.is_finite(), "filter stuck after NaN input");
    }

    #[test]
    fn impulse_response_finite_all_modes() {
        for mode in [FilterMode::Lowpass, FilterMode::Bandpass, FilterMode::Highpass] {
            let mut filter = MultiModeFilter::new(SR);
            filter.set_mode(mode);
            filter.set_resonance(0.95);
            filter.set_cutoff_hz(200.0);

            let out = filter.process_sample(1.0, KEY);
            assert!(out.is_finite());
            for _ in 0..10_000 {
                let out = filter.process_sample(0.0, KEY);
                assert!(out.is_finite(), "{mode:?} went non-finite");
            }
        }
    }

    #[test]
    fn tracked_cutoff_capped_below_nyquist() {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_cutoff_hz(20_000.0);
        filter.set_key_tracking(1.0);

        // Extreme key frequency pushes the tracked cutoff far past Nyquist;
        // the cap keeps the output finite.
        for _ in 0..1000 {
            let out = filter.process_sample(1.0, 20_000.0);
            assert!(out.is_finite());
        }
    }
}
