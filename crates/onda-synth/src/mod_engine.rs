//! The canonical modulation source generators.
//!
//! [`ModulationEngine`] owns the two envelopes and two LFOs whose outputs
//! feed the matrix as [`ModSource::AmpEnv`](crate::ModSource::AmpEnv),
//! [`ModSource::ModEnv`](crate::ModSource::ModEnv),
//! [`ModSource::Lfo1`](crate::ModSource::Lfo1) and
//! [`ModSource::Lfo2`](crate::ModSource::Lfo2). It deliberately contains no
//! routing or mixing logic — the integration layer advances the generators,
//! builds a [`SourceValues`](crate::SourceValues), and hands it to the
//! matrix. The engine's only jobs are sample-rate propagation and reset.

use crate::envelope::AdsrEnvelope;
use onda_core::Lfo;

/// Bundle of the four canonical modulation sources.
#[derive(Debug, Clone)]
pub struct ModulationEngine {
    /// Amplitude envelope.
    pub amp_env: AdsrEnvelope,
    /// General-purpose modulation envelope.
    pub mod_env: AdsrEnvelope,
    /// First LFO.
    pub lfo1: Lfo,
    /// Second LFO.
    pub lfo2: Lfo,
}

impl Default for ModulationEngine {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl ModulationEngine {
    /// Create the source bundle at the given sample rate.
    ///
    /// LFOs default to 2 Hz free-running.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            amp_env: AdsrEnvelope::new(sample_rate),
            mod_env: AdsrEnvelope::new(sample_rate),
            lfo1: Lfo::new(sample_rate, 2.0),
            lfo2: Lfo::new(sample_rate, 2.0),
        }
    }

    /// Propagate a sample-rate change to every generator.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.amp_env.set_sample_rate(sample_rate);
        self.mod_env.set_sample_rate(sample_rate);
        self.lfo1.set_sample_rate(sample_rate);
        self.lfo2.set_sample_rate(sample_rate);
    }

    /// Return every generator to its initial state.
    pub fn reset(&mut self) {
        self.amp_env.reset();
        self.mod_env.reset();
        self.lfo1.reset();
        self.lfo2.reset();
    }
}
