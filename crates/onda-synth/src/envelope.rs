//! ADSR envelope generator.
//!
//! A linear-in-stage envelope: each stage ramps over a whole number of
//! samples computed from its time parameter, which makes stage boundaries
//! sample-accurate and deterministic — the same settings always produce the
//! same sample count per stage. A zero-length stage still takes one sample,
//! so stage progress never divides by zero.

use libm::roundf;

/// Envelope stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Inactive — output is zero.
    #[default]
    Idle,
    /// Ramp 0 → 1 over the attack time.
    Attack,
    /// Ramp 1 → sustain level over the decay time.
    Decay,
    /// Hold at the sustain level while the gate is held.
    Sustain,
    /// Ramp from the captured level → 0 over the release time.
    Release,
}

/// Attack-decay-sustain-release envelope.
///
/// Output is unipolar [0, 1]. `gate_on` restarts the attack ramp from
/// zero; `gate_off` captures the current level and releases from there, so
/// releasing mid-attack never jumps.
///
/// # Example
///
/// ```rust
/// use onda_synth::{AdsrEnvelope, EnvelopeStage};
///
/// let mut env = AdsrEnvelope::new(48000.0);
/// env.set_attack_ms(5.0);
/// env.set_sustain(0.6);
///
/// env.gate_on();
/// let level = env.advance();
/// assert_eq!(env.stage(), EnvelopeStage::Attack);
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    sample_rate: f32,
    attack_ms: f32,
    decay_ms: f32,
    sustain: f32,
    release_ms: f32,

    stage: EnvelopeStage,
    level: f32,
    release_start_level: f32,
    stage_samples_done: u32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl AdsrEnvelope {
    /// Create a new envelope.
    ///
    /// Defaults: attack 10 ms, decay 100 ms, sustain 0.8, release 200 ms.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
            attack_ms: 10.0,
            decay_ms: 100.0,
            sustain: 0.8,
            release_ms: 200.0,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            release_start_level: 0.0,
            stage_samples_done: 0,
        }
    }

    /// Update the sample rate. Non-positive values are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    /// Set attack time in milliseconds. Negative values are treated as 0.
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms = ms.max(0.0);
    }

    /// Set decay time in milliseconds. Negative values are treated as 0.
    pub fn set_decay_ms(&mut self, ms: f32) {
        self.decay_ms = ms.max(0.0);
    }

    /// Set sustain level. Clamped to [0, 1].
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Set release time in milliseconds. Negative values are treated as 0.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.release_ms = ms.max(0.0);
    }

    /// Start the attack stage.
    pub fn gate_on(&mut self) {
        self.stage = EnvelopeStage::Attack;
        self.stage_samples_done = 0;
    }

    /// Capture the current level and start the release stage.
    pub fn gate_off(&mut self) {
        self.release_start_level = self.level;
        self.stage = EnvelopeStage::Release;
        self.stage_samples_done = 0;
    }

    /// Return fully to idle (level 0).
    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.release_start_level = 0.0;
        self.stage_samples_done = 0;
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Current output level, without advancing.
    pub fn value(&self) -> f32 {
        self.level
    }

    /// Whether the envelope is producing output (not idle).
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }

            EnvelopeStage::Attack => {
                let attack_samples = self.stage_samples(self.attack_ms);
                let progress = self.stage_samples_done as f32 / attack_samples as f32;
                self.level = progress.clamp(0.0, 1.0);

                self.stage_samples_done += 1;
                if self.stage_samples_done >= attack_samples {
                    self.stage = EnvelopeStage::Decay;
                    self.stage_samples_done = 0;
                    self.level = 1.0;
                }
            }

            EnvelopeStage::Decay => {
                let decay_samples = self.stage_samples(self.decay_ms);
                let progress = self.stage_samples_done as f32 / decay_samples as f32;
                self.level = 1.0 + (self.sustain - 1.0) * progress.clamp(0.0, 1.0);

                self.stage_samples_done += 1;
                if self.stage_samples_done >= decay_samples {
                    self.stage = EnvelopeStage::Sustain;
                    self.level = self.sustain;
                }
            }

            EnvelopeStage::Sustain => {
                self.level = self.sustain;
            }

            EnvelopeStage::Release => {
                let release_samples = self.stage_samples(self.release_ms);
                let progress = self.stage_samples_done as f32 / release_samples as f32;
                self.level = self.release_start_level * (1.0 - progress.clamp(0.0, 1.0));

                self.stage_samples_done += 1;
                if self.stage_samples_done >= release_samples {
                    self.stage = EnvelopeStage::Idle;
                    self.level = 0.0;
                }
            }
        }

        self.level
    }

    /// Stage length in samples: at least 1, so a zero-length stage still
    /// takes one sample and progress never divides by zero.
    fn stage_samples(&self, ms: f32) -> u32 {
        roundf(ms.max(0.0) * self.sample_rate / 1000.0).max(1.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    #[test]
    fn idle_outputs_zero() {
        let mut env = AdsrEnvelope::new(SR);
        for _ in 0..100 {
            assert_eq!(env.advance(), 0.0);
        }
        assert!(!env.is_active());
    }

    #[test]
    fn attack_reaches_one_in_expected_samples() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(10.0); // 480 samples at 48 kHz

        env.gate_on();
        for _ in 0..480 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Decay);
        assert_eq!(env.value(), 1.0);
    }

    #[test]
    fn attack_ramp_is_monotonic() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(5.0);
        env.gate_on();

        let mut prev = -1.0;
        for _ in 0..240 {
            let level = env.advance();
            assert!(level >= prev, "attack not monotonic: {level} < {prev}");
            prev = level;
        }
    }

    #[test]
    fn decay_settles_at_sustain() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(1.0);
        env.set_decay_ms(10.0);
        env.set_sustain(0.5);

        env.gate_on();
        for _ in 0..2000 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert_eq!(env.value(), 0.5);
    }

    #[test]
    fn release_captures_current_level() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(100.0);
        env.gate_on();

        // Stop partway through the attack
        for _ in 0..1000 {
            env.advance();
        }
        let mid_attack = env.value();
        assert!(mid_attack > 0.0 && mid_attack < 1.0);

        env.gate_off();
        let first_release = env.advance();
        assert!(
            first_release <= mid_attack,
            "release must start from the captured level"
        );
    }

    #[test]
    fn release_reaches_exact_zero_and_idles() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(1.0);
        env.set_decay_ms(1.0);
        env.set_sustain(0.7);
        env.set_release_ms(50.0);

        env.gate_on();
        for _ in 0..500 {
            env.advance();
        }
        env.gate_off();

        // 50 ms = 2400 samples
        for _ in 0..2400 {
            env.advance();
        }
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn zero_length_stages_take_one_sample() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(0.0);
        env.set_decay_ms(0.0);
        env.set_sustain(0.4);

        env.gate_on();
        env.advance(); // attack completes
        assert_eq!(env.stage(), EnvelopeStage::Decay);
        env.advance(); // decay completes
        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert_eq!(env.value(), 0.4);
    }

    #[test]
    fn retrigger_restarts_attack_ramp() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(10.0);
        env.gate_on();
        for _ in 0..400 {
            env.advance();
        }
        assert!(env.value() > 0.5);

        env.gate_on();
        let restarted = env.advance();
        assert!(restarted < 0.01, "retrigger should restart from zero");
    }

    #[test]
    fn full_cycle_stays_in_range() {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(5.0);
        env.set_decay_ms(20.0);
        env.set_sustain(0.6);
        env.set_release_ms(30.0);

        env.gate_on();
        for _ in 0..3000 {
            let level = env.advance();
            assert!((0.0..=1.0).contains(&level), "out of range: {level}");
        }
        env.gate_off();
        for _ in 0..3000 {
            let level = env.advance();
            assert!((0.0..=1.0).contains(&level), "out of range: {level}");
        }
    }
}
