//! Low-frequency oscillator for the modulation engine.
//!
//! A phase-accumulation LFO with sine and triangle shapes. The rate is
//! either a free-running frequency in Hz or derived from the host tempo
//! through a [`SyncDivision`] — the effective frequency is recomputed each
//! sample, so tempo changes take hold immediately without phase jumps.

use core::f32::consts::TAU;
use libm::{floorf, sinf};

use crate::tempo::SyncDivision;

/// LFO waveform shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sinusoidal modulation.
    #[default]
    Sine,
    /// Linear ramps: `4·|phase − 0.5| − 1`.
    Triangle,
}

/// How the LFO rate is determined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoRateMode {
    /// Free-running rate in Hz.
    #[default]
    Hertz,
    /// Rate derived from tempo and a musical division.
    TempoSync,
}

/// Bipolar low-frequency oscillator (output in [-1, 1]).
///
/// # Example
///
/// ```rust
/// use onda_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 5.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
///
/// let value = lfo.advance();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    sample_rate: f32,
    waveform: LfoWaveform,
    rate_mode: LfoRateMode,
    sync_division: SyncDivision,
    rate_hz: f32,
    tempo_bpm: f32,
    /// Current phase position [0.0, 1.0)
    phase: f32,
    current_value: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(44100.0, 2.0)
    }
}

impl Lfo {
    /// Create a new LFO with the given sample rate and free-running rate.
    pub fn new(sample_rate: f32, rate_hz: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            waveform: LfoWaveform::Sine,
            rate_mode: LfoRateMode::Hertz,
            sync_division: SyncDivision::Quarter,
            rate_hz: rate_hz.max(0.0),
            tempo_bpm: 120.0,
            phase: 0.0,
            current_value: 0.0,
        }
    }

    /// Update the sample rate. Non-positive values are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    /// Set the waveform shape.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform shape.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Set the free-running rate in Hz. Negative values are floored to 0.
    pub fn set_rate_hz(&mut self, rate_hz: f32) {
        self.rate_hz = rate_hz.max(0.0);
    }

    /// Select free-running or tempo-synced rate.
    pub fn set_rate_mode(&mut self, mode: LfoRateMode) {
        self.rate_mode = mode;
    }

    /// Set the host tempo in BPM. Floored at 1.
    pub fn set_tempo_bpm(&mut self, bpm: f32) {
        self.tempo_bpm = bpm.max(1.0);
    }

    /// Set the musical division used in tempo-sync mode.
    pub fn set_sync_division(&mut self, division: SyncDivision) {
        self.sync_division = division;
    }

    /// Reset phase and output to zero.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.current_value = 0.0;
    }

    /// The effective rate in Hz under the current mode.
    pub fn frequency_hz(&self) -> f32 {
        match self.rate_mode {
            LfoRateMode::Hertz => self.rate_hz,
            LfoRateMode::TempoSync => self.sync_division.to_hz(self.tempo_bpm),
        }
    }

    /// Last output value, without advancing.
    pub fn value(&self) -> f32 {
        self.current_value
    }

    /// Advance one sample and return the new output value in [-1, 1].
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let phase_inc = self.frequency_hz() / self.sample_rate;
        self.phase += phase_inc;
        self.phase -= floorf(self.phase);

        self.current_value = match self.waveform {
            LfoWaveform::Sine => sinf(TAU * self.phase),
            LfoWaveform::Triangle => 4.0 * (self.phase - 0.5).abs() - 1.0,
        };

        self.current_value
    }
}
