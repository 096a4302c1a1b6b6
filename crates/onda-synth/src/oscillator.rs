//! Phase-distortion oscillator.
//!
//! Instead of shaping amplitude, phase distortion warps the phase ramp
//! before the sine lookup: the waveform stays a single sine read, but the
//! nonuniform sweep speed concentrates the cycle's energy and brightens the
//! timbre. Two warps are blended:
//!
//! - a **piecewise-linear** warp whose breakpoint slides with `pd_amount`
//!   (the classic two-segment phase bend), and
//! - a **curved** warp using asymmetric power-law segments, with curvature
//!   from `pd_amount` and segment skew from `pd_shape`.
//!
//! `pd_shape` crossfades linear → curved, then `mix` crossfades the dry
//! sine against the warped sine. Warping the phase makes the effective
//! sweep rate exceed the nominal frequency near the breakpoint, so the
//! oscillator oversamples its inner loop (1×/2×/4× by quality) and averages,
//! which suppresses the aliasing the warp would otherwise fold into the band.

use core::f32::consts::TAU;
use libm::{floorf, powf, sinf};
use onda_core::lerp;

/// Oversampling quality for the oscillator's inner loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OscQuality {
    /// No oversampling (1×) — cheapest, audible aliasing at high pd amounts.
    #[default]
    Low,
    /// 2× oversampling.
    Medium,
    /// 4× oversampling.
    High,
}

impl OscQuality {
    /// Inner-loop steps per output sample.
    pub fn oversample_factor(self) -> u32 {
        match self {
            OscQuality::Low => 1,
            OscQuality::Medium => 2,
            OscQuality::High => 4,
        }
    }
}

/// Warped-phase sine oscillator with selectable oversampling.
///
/// ## Parameters
///
/// - `frequency`: base frequency in Hz (≥ 0, default 220.0)
/// - `tune`: coarse tune in semitones (−48 to +48)
/// - `fine`: fine tune in cents (−100 to +100)
/// - `pd_amount`: warp intensity (0 to 1)
/// - `pd_shape`: linear→curved warp blend and curve skew (0 to 1)
/// - `mix`: dry sine → warped sine blend (0 to 1, default 1.0)
///
/// All knobs clamp at the setter; the render path never sees out-of-range
/// values. The oscillator owns its phase exclusively — nothing outside
/// `advance`/`reset`/`set_phase` mutates it.
///
/// # Example
///
/// ```rust
/// use onda_synth::{PhaseDistortionOscillator, OscQuality};
///
/// let mut osc = PhaseDistortionOscillator::new(48000.0);
/// osc.set_frequency(220.0);
/// osc.set_pd_amount(0.7);
/// osc.set_quality(OscQuality::High);
///
/// let sample = osc.advance();
/// assert!((-1.0..=1.0).contains(&sample));
/// ```
#[derive(Debug, Clone)]
pub struct PhaseDistortionOscillator {
    sample_rate: f32,
    base_frequency_hz: f32,
    tune_semitones: f32,
    fine_cents: f32,
    pd_amount: f32,
    pd_shape: f32,
    mix: f32,
    /// Current phase position [0.0, 1.0)
    phase: f32,
    quality: OscQuality,
}

impl Default for PhaseDistortionOscillator {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl PhaseDistortionOscillator {
    /// Create a new oscillator at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            base_frequency_hz: 220.0,
            tune_semitones: 0.0,
            fine_cents: 0.0,
            pd_amount: 0.0,
            pd_shape: 0.0,
            mix: 1.0,
            phase: 0.0,
            quality: OscQuality::Low,
        }
    }

    /// Update the sample rate. Non-positive values are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    /// Reset phase to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Set phase directly; wrapped into [0, 1).
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap01(phase);
    }

    /// Set the base frequency in Hz. Negative values are floored to 0.
    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.base_frequency_hz = frequency_hz.max(0.0);
    }

    /// Set coarse tune in semitones. Clamped to [−48, +48].
    pub fn set_tune(&mut self, semitones: f32) {
        self.tune_semitones = semitones.clamp(-48.0, 48.0);
    }

    /// Set fine tune in cents. Clamped to [−100, +100].
    pub fn set_fine(&mut self, cents: f32) {
        self.fine_cents = cents.clamp(-100.0, 100.0);
    }

    /// Set warp intensity. Clamped to [0, 1].
    pub fn set_pd_amount(&mut self, amount: f32) {
        self.pd_amount = amount.clamp(0.0, 1.0);
    }

    /// Set warp shape (linear→curved blend and curve skew). Clamped to [0, 1].
    pub fn set_pd_shape(&mut self, shape: f32) {
        self.pd_shape = shape.clamp(0.0, 1.0);
    }

    /// Set dry/warped blend. Clamped to [0, 1].
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Set the oversampling quality.
    pub fn set_quality(&mut self, quality: OscQuality) {
        self.quality = quality;
    }

    /// The effective output frequency in Hz (base × tune × fine).
    pub fn frequency_hz(&self) -> f32 {
        let semitone_offset = self.tune_semitones + self.fine_cents * 0.01;
        self.base_frequency_hz * powf(2.0, semitone_offset / 12.0)
    }

    /// Render one output sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let oversample = self.quality.oversample_factor();
        let frequency = self.frequency_hz();
        let phase_step = frequency / (self.sample_rate * oversample as f32);

        let mut accumulated = 0.0;
        for _ in 0..oversample {
            let warped_linear = self.warp_piecewise_linear(self.phase);
            let warped_curved = self.warp_curved(self.phase);
            let warped = lerp(warped_linear, warped_curved, self.pd_shape);

            let dry = sinf(TAU * self.phase);
            let wet = sinf(TAU * warped);
            accumulated += lerp(dry, wet, self.mix);

            self.phase = wrap01(self.phase + phase_step);
        }

        accumulated / oversample as f32
    }

    /// Two-segment linear warp. The breakpoint slides from center toward
    /// either cycle edge with `pd_amount`, clamped to [0.05, 0.95] so both
    /// segments keep finite slope.
    fn warp_piecewise_linear(&self, phase: f32) -> f32 {
        let center = (0.5 + (self.pd_amount - 0.5) * 0.9).clamp(0.05, 0.95);

        if phase < center {
            0.5 * (phase / center)
        } else {
            0.5 + 0.5 * ((phase - center) / (1.0 - center))
        }
    }

    /// Power-law warp with asymmetric exponents. `pd_amount` sets the
    /// curvature range [0.2, 5.0]; `pd_shape` skews it between the two
    /// half-cycles through a raised-sine blend.
    fn warp_curved(&self, phase: f32) -> f32 {
        const MIN_CURVE: f32 = 0.2;
        const MAX_CURVE: f32 = 5.0;
        let curvature = MIN_CURVE + (MAX_CURVE - MIN_CURVE) * self.pd_amount;
        let skew = 0.5 + 0.5 * sinf((self.pd_shape * 2.0 - 1.0) * core::f32::consts::FRAC_PI_2);
        let exponent_a = 1.0 + (curvature - 1.0) * skew;
        let exponent_b = 1.0 + (curvature - 1.0) * (1.0 - skew);

        if phase < 0.5 {
            0.5 * powf(phase * 2.0, exponent_a)
        } else {
            1.0 - 0.5 * powf((1.0 - phase) * 2.0, exponent_b)
        }
    }
}

#[inline]
fn wrap01(value: f32) -> f32 {
    let wrapped = value - floorf(value);
    if wrapped >= 1.0 { wrapped - 1.0 } else { wrapped }
}
