//! Per-note voice state machine.
//!
//! A [`Voice`] tracks one note's lifecycle — idle → active → releasing →
//! idle — together with its pitch, glide, and release timing. It generates
//! no audio itself: the integration layer reads `current_pitch_hz` each
//! block and drives the oscillator/filter with it. Mutation happens only
//! through the [`VoiceManager`](crate::VoiceManager) and the voice's own
//! [`advance`](Voice::advance).

use libm::{powf, roundf};

/// Pitch floor used to guard glide ratio math against division by ~0.
const MIN_PITCH_HZ: f32 = 1.0e-6;

/// How a pitch glide interpolates between start and target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlideCurve {
    /// Interpolate Hz linearly.
    #[default]
    Linear,
    /// Interpolate the Hz ratio: equal musical intervals per unit time.
    Exponential,
}

/// Voice lifecycle states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Not sounding; available for allocation.
    #[default]
    Idle,
    /// Sounding with the key held (or legato-held).
    Active,
    /// Key released; counting down the release tail.
    Releasing,
}

/// Immutable payload attached to a voice at note-on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    /// MIDI note number; -1 marks "no note".
    pub midi_note: i32,
    /// Normalized velocity in [0, 1].
    pub velocity: f32,
    /// Monotonic allocation stamp — the sole age signal for stealing.
    pub event_index: u64,
    /// Position within a unison group (0 for non-unison notes).
    pub unison_index: i32,
    /// Per-voice unison detune in cents.
    pub detune_cents: f32,
    /// Per-voice unison pan position in [-1, 1].
    pub spread_pan: f32,
}

impl Default for NoteEvent {
    fn default() -> Self {
        Self {
            midi_note: -1,
            velocity: 0.0,
            event_index: 0,
            unison_index: 0,
            detune_cents: 0.0,
            spread_pan: 0.0,
        }
    }
}

/// One note's complete timing state.
///
/// # Example
///
/// ```rust
/// use onda_synth::{NoteEvent, Voice, VoiceState, GlideCurve};
///
/// let mut voice = Voice::default();
/// voice.prepare(48000.0, 128);
///
/// let event = NoteEvent { midi_note: 69, velocity: 0.8, event_index: 1, ..NoteEvent::default() };
/// voice.start_note(event, None, 0.0, GlideCurve::Linear);
/// assert_eq!(voice.state(), VoiceState::Active);
/// assert!((voice.current_pitch_hz() - 440.0).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct Voice {
    note: NoteEvent,
    state: VoiceState,
    key_held: bool,

    sample_rate: f32,
    block_size: usize,

    current_pitch_hz: f32,
    target_pitch_hz: f32,
    /// Glide completion in [0, 1]; 1 means pitch is at target.
    glide_progress: f32,
    glide_duration_samples: f32,
    glide_curve: GlideCurve,

    release_samples_remaining: i64,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            note: NoteEvent::default(),
            state: VoiceState::Idle,
            key_held: false,
            sample_rate: 44100.0,
            block_size: 0,
            current_pitch_hz: 0.0,
            target_pitch_hz: 0.0,
            glide_progress: 1.0,
            glide_duration_samples: 0.0,
            glide_curve: GlideCurve::Linear,
            release_samples_remaining: 0,
        }
    }
}

impl Voice {
    /// Clear all note state, returning to idle. Keeps the prepared
    /// sample rate and block size.
    pub fn reset(&mut self) {
        self.note = NoteEvent::default();
        self.state = VoiceState::Idle;
        self.key_held = false;
        self.current_pitch_hz = 0.0;
        self.target_pitch_hz = 0.0;
        self.glide_progress = 1.0;
        self.glide_duration_samples = 0.0;
        self.release_samples_remaining = 0;
    }

    /// Adopt the host's sample rate and block size. Non-positive values
    /// are ignored. Not real-time safe by contract (quiesce the callback).
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        if block_size > 0 {
            self.block_size = block_size;
        }
    }

    /// Begin (or retarget) a note.
    ///
    /// `start_pitch` selects glide behavior: `None` jumps straight to the
    /// target pitch; `Some(hz)` glides from there over `glide_time_ms`
    /// using `curve`. A glide shorter than one sample also jumps.
    pub fn start_note(
        &mut self,
        event: NoteEvent,
        start_pitch: Option<f32>,
        glide_time_ms: f32,
        curve: GlideCurve,
    ) {
        self.note = event;
        self.state = VoiceState::Active;
        self.key_held = true;
        self.target_pitch_hz =
            midi_to_freq(event.midi_note) * cents_to_ratio(event.detune_cents);

        let glide_samples = glide_time_ms.max(0.0) * 0.001 * self.sample_rate;
        self.glide_curve = curve;

        match start_pitch {
            Some(start) if glide_samples > 1.0 && start > f32::EPSILON => {
                self.current_pitch_hz = start;
                self.glide_progress = 0.0;
                self.glide_duration_samples = glide_samples;
            }
            _ => {
                self.current_pitch_hz = self.target_pitch_hz;
                self.glide_progress = 1.0;
                self.glide_duration_samples = 0.0;
            }
        }

        self.release_samples_remaining = 0;
    }

    /// Release the key and start the release countdown.
    ///
    /// A countdown of zero samples (or an idle voice) transitions straight
    /// to idle.
    pub fn start_release(&mut self, release_time_ms: f32) {
        self.key_held = false;

        if self.state == VoiceState::Idle {
            return;
        }

        let samples = roundf(release_time_ms.max(0.0) * 0.001 * self.sample_rate) as i64;
        if samples <= 0 {
            self.force_idle();
            return;
        }

        self.release_samples_remaining = samples;
        self.state = VoiceState::Releasing;
    }

    /// Immediately drop to idle, clearing all note state.
    pub fn force_idle(&mut self) {
        self.reset();
    }

    /// Advance the voice's timers by one block.
    pub fn advance(&mut self, num_samples: usize) {
        if self.state == VoiceState::Idle {
            return;
        }

        if self.glide_progress < 1.0 && self.glide_duration_samples > 0.0 {
            self.glide_progress = (self.glide_progress
                + num_samples as f32 / self.glide_duration_samples)
                .min(1.0);

            match self.glide_curve {
                GlideCurve::Linear => {
                    self.current_pitch_hz +=
                        (self.target_pitch_hz - self.current_pitch_hz) * self.glide_progress;
                }
                GlideCurve::Exponential => {
                    let ratio = (self.target_pitch_hz
                        / self.current_pitch_hz.max(MIN_PITCH_HZ))
                    .max(MIN_PITCH_HZ);
                    self.current_pitch_hz *= powf(ratio, self.glide_progress);
                }
            }

            if self.glide_progress >= 1.0 {
                self.current_pitch_hz = self.target_pitch_hz;
            }
        } else {
            self.current_pitch_hz = self.target_pitch_hz;
        }

        if self.state == VoiceState::Releasing {
            self.release_samples_remaining -= num_samples as i64;
            if self.release_samples_remaining <= 0 {
                self.force_idle();
            }
        }
    }

    /// MIDI note of the attached event (-1 when idle).
    pub fn midi_note(&self) -> i32 {
        self.note.midi_note
    }

    /// Velocity of the attached event.
    pub fn velocity(&self) -> f32 {
        self.note.velocity
    }

    /// Current lifecycle state.
    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Whether the key that started this voice is still held.
    pub fn is_key_held(&self) -> bool {
        self.key_held
    }

    /// Allocation stamp of the attached event.
    pub fn event_index(&self) -> u64 {
        self.note.event_index
    }

    /// The sounding pitch right now (mid-glide this lags the target).
    pub fn current_pitch_hz(&self) -> f32 {
        self.current_pitch_hz
    }

    /// The pitch the glide is heading toward.
    pub fn target_pitch_hz(&self) -> f32 {
        self.target_pitch_hz
    }

    /// Unison slot of the attached event.
    pub fn unison_index(&self) -> i32 {
        self.note.unison_index
    }

    /// Unison detune of the attached event, in cents.
    pub fn detune_cents(&self) -> f32 {
        self.note.detune_cents
    }

    /// Unison pan of the attached event.
    pub fn spread_pan(&self) -> f32 {
        self.note.spread_pan
    }
}

/// Convert a MIDI note number to frequency in Hz.
///
/// Equal temperament referenced to A4 = 440 Hz at note 69.
#[inline]
pub fn midi_to_freq(note: i32) -> f32 {
    440.0 * powf(2.0, (note as f32 - 69.0) / 12.0)
}

/// Convert cents to a frequency ratio (100 cents = 1 semitone).
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}
