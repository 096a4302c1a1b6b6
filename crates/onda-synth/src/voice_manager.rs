//! Voice allocation, stealing, and mono/poly/legato/unison policy.
//!
//! The manager owns a fixed pool of [`Voice`]s sized by the active mode —
//! one voice for mono/legato, `max_voices` otherwise — and routes note
//! events into it:
//!
//! - **Poly**: each note-on reuses a voice already sounding the same note,
//!   otherwise takes the best steal candidate.
//! - **Mono**: one voice, every note-on restarts it.
//! - **Legato**: one voice; a note-on while sounding retargets pitch
//!   without restarting, and a note-off falls back to the most recently
//!   held key from the held-note stack.
//! - **Unison**: each note-on fans out across `unison_voices` pool voices
//!   with symmetric detune and pan offsets.
//!
//! Stealing is deterministic: candidates are ranked by the lexicographic
//! tuple `(state_rank, event_index, midi_note)` where idle < releasing <
//! active, and the smallest tuple loses its voice. `event_index` is a
//! monotonic counter stamped at allocation, so "oldest note" has a single
//! unambiguous meaning and replays reproduce the same stealing order.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::voice::{GlideCurve, NoteEvent, Voice, VoiceState};

/// Voice allocation policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceMode {
    /// Single voice, retriggered on every note-on.
    Mono,
    /// One voice per note up to `max_voices`.
    #[default]
    Poly,
    /// Single voice with glide retargeting and held-note fallback.
    Legato,
    /// Each note fans out across detuned/panned pool voices.
    Unison,
}

/// Immutable configuration snapshot applied via
/// [`VoiceManager::set_config`].
#[derive(Clone, Copy, Debug)]
pub struct VoiceManagerConfig {
    /// Allocation policy.
    pub mode: VoiceMode,
    /// Pool size for poly/unison modes (floored at 1).
    pub max_voices: usize,
    /// Sub-voices per note in unison mode (floored at 1).
    pub unison_voices: usize,
    /// Detune step between adjacent unison voices, in cents.
    pub unison_detune_cents: f32,
    /// Pan spread scale for unison voices, 0 (mono) to 1 (full width).
    pub unison_spread: f32,
    /// Release tail length.
    pub release_time_ms: f32,
    /// Glide (portamento) time; 0 disables glide.
    pub glide_time_ms: f32,
    /// Glide interpolation curve.
    pub glide_curve: GlideCurve,
}

impl Default for VoiceManagerConfig {
    fn default() -> Self {
        Self {
            mode: VoiceMode::Poly,
            max_voices: 8,
            unison_voices: 2,
            unison_detune_cents: 8.0,
            unison_spread: 1.0,
            release_time_ms: 100.0,
            glide_time_ms: 0.0,
            glide_curve: GlideCurve::Linear,
        }
    }
}

/// Entry in the held-key stack (most recent last).
#[derive(Clone, Copy, Debug)]
struct HeldNote {
    midi_note: i32,
    velocity: f32,
}

/// Polyphonic voice pool with deterministic stealing.
///
/// Pool-resizing calls (`set_config`, the constructors) allocate and are
/// not real-time safe; everything on the note/advance path is.
///
/// # Example
///
/// ```rust
/// use onda_synth::{VoiceManager, VoiceManagerConfig, VoiceMode, VoiceState};
///
/// let mut manager = VoiceManager::with_config(VoiceManagerConfig {
///     mode: VoiceMode::Poly,
///     max_voices: 4,
///     ..VoiceManagerConfig::default()
/// });
/// manager.prepare(48000.0, 128);
///
/// manager.note_on(60, 0.8);
/// manager.note_on(64, 0.8);
/// let active = manager
///     .voices()
///     .iter()
///     .filter(|v| v.state() == VoiceState::Active)
///     .count();
/// assert_eq!(active, 2);
/// ```
#[derive(Debug, Clone)]
pub struct VoiceManager {
    config: VoiceManagerConfig,
    voices: Vec<Voice>,
    held_notes: Vec<HeldNote>,
    event_counter: u64,
    sample_rate: f32,
    block_size: usize,
}

impl Default for VoiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceManager {
    /// Create a manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(VoiceManagerConfig::default())
    }

    /// Create a manager with the given configuration.
    pub fn with_config(config: VoiceManagerConfig) -> Self {
        let mut manager = Self {
            config,
            voices: Vec::new(),
            held_notes: Vec::new(),
            event_counter: 1,
            sample_rate: 44100.0,
            block_size: 0,
        };
        manager.ensure_voice_count();
        manager
    }

    /// Apply a new configuration snapshot, resizing the pool to match.
    ///
    /// Not real-time safe: quiesce the audio callback first.
    pub fn set_config(&mut self, config: VoiceManagerConfig) {
        self.config = config;
        self.ensure_voice_count();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            mode = ?self.config.mode,
            pool = self.voices.len(),
            "voice manager reconfigured"
        );
    }

    /// The active configuration.
    pub fn config(&self) -> &VoiceManagerConfig {
        &self.config
    }

    /// Adopt the host's sample rate and block size. Not real-time safe.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        if block_size > 0 {
            self.block_size = block_size;
        }
        for voice in &mut self.voices {
            voice.prepare(self.sample_rate, self.block_size);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = self.sample_rate,
            block_size = self.block_size,
            "voice manager prepared"
        );
    }

    /// Hard stop: clear the held stack, idle every voice, restart the
    /// event counter.
    pub fn reset(&mut self) {
        self.held_notes.clear();
        self.event_counter = 1;
        for voice in &mut self.voices {
            voice.reset();
        }
    }

    /// Route a note-on into the pool.
    pub fn note_on(&mut self, midi_note: i32, velocity: f32) {
        self.push_held_note(midi_note, velocity);

        if self.is_monophonic_mode() {
            // Legato retargets the sounding pitch; plain mono restarts.
            let start_pitch = (self.config.mode == VoiceMode::Legato
                && self.voices[0].state() != VoiceState::Idle)
                .then(|| self.voices[0].current_pitch_hz());

            let event = NoteEvent {
                midi_note,
                velocity,
                event_index: self.next_event_index(),
                ..NoteEvent::default()
            };
            self.voices[0].start_note(
                event,
                start_pitch,
                self.config.glide_time_ms,
                self.config.glide_curve,
            );
            return;
        }

        let unison_count = self.required_unison_count();
        for unison_index in 0..unison_count {
            let target = self
                .find_voice_for_note(midi_note, Some(unison_index as i32))
                .or_else(|| self.find_steal_voice());
            let Some(target) = target else { continue };

            let center = (unison_count - 1) as f32 * 0.5;
            let offset = unison_index as f32 - center;
            let (detune_cents, spread_pan) = if unison_count > 1 {
                (
                    offset * self.config.unison_detune_cents,
                    (offset / center) * self.config.unison_spread,
                )
            } else {
                (0.0, 0.0)
            };

            let event = NoteEvent {
                midi_note,
                velocity,
                event_index: self.next_event_index(),
                unison_index: unison_index as i32,
                detune_cents,
                spread_pan,
            };

            // Reused or stolen voices glide from their sounding pitch;
            // fresh voices jump.
            let start_pitch = (self.config.glide_time_ms > 0.0
                && self.voices[target].state() != VoiceState::Idle)
                .then(|| self.voices[target].current_pitch_hz());

            self.voices[target].start_note(
                event,
                start_pitch,
                self.config.glide_time_ms,
                self.config.glide_curve,
            );
        }
    }

    /// Route a note-off into the pool. Unknown notes are no-ops.
    pub fn note_off(&mut self, midi_note: i32) {
        self.remove_held_note(midi_note);

        if self.is_monophonic_mode() {
            if self.voices[0].state() == VoiceState::Idle {
                return;
            }

            if self.config.mode == VoiceMode::Legato {
                // Fall back to the most recently held key, if any remains.
                if let Some(next) = self.held_notes.last().copied() {
                    let start_pitch = Some(self.voices[0].current_pitch_hz());
                    let event = NoteEvent {
                        midi_note: next.midi_note,
                        velocity: next.velocity,
                        event_index: self.next_event_index(),
                        ..NoteEvent::default()
                    };
                    self.voices[0].start_note(
                        event,
                        start_pitch,
                        self.config.glide_time_ms,
                        self.config.glide_curve,
                    );
                    return;
                }
            }

            let release = self.config.release_time_ms;
            self.voices[0].start_release(release);
            return;
        }

        // Only voices still holding this key release; a voice stolen and
        // reused for the same pitch keeps sounding its new note.
        let release = self.config.release_time_ms;
        for voice in &mut self.voices {
            if voice.midi_note() == midi_note && voice.is_key_held() {
                voice.start_release(release);
            }
        }
    }

    /// Release every voice through the configured release tail.
    pub fn all_notes_off(&mut self) {
        self.held_notes.clear();
        let release = self.config.release_time_ms;
        for voice in &mut self.voices {
            voice.start_release(release);
        }
    }

    /// Advance every voice's timers by one block.
    pub fn advance(&mut self, num_samples: usize) {
        for voice in &mut self.voices {
            voice.advance(num_samples);
        }
    }

    /// Read access to the pool.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Mutable access to the pool, for the integration layer.
    pub fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    /// Pool size required by the current mode.
    pub fn target_voice_count(&self) -> usize {
        if self.is_monophonic_mode() {
            1
        } else {
            self.config.max_voices.max(1)
        }
    }

    fn is_monophonic_mode(&self) -> bool {
        matches!(self.config.mode, VoiceMode::Mono | VoiceMode::Legato)
    }

    fn required_unison_count(&self) -> usize {
        if self.config.mode == VoiceMode::Unison {
            self.config.unison_voices.max(1)
        } else {
            1
        }
    }

    fn ensure_voice_count(&mut self) {
        let target = self.target_voice_count();
        self.voices.resize_with(target, Voice::default);
        for voice in &mut self.voices {
            voice.prepare(self.sample_rate, self.block_size);
        }
    }

    fn next_event_index(&mut self) -> u64 {
        let index = self.event_counter;
        self.event_counter += 1;
        index
    }

    /// Index of a non-idle voice already sounding `midi_note` (and the
    /// given unison slot, when specified).
    fn find_voice_for_note(&self, midi_note: i32, unison_index: Option<i32>) -> Option<usize> {
        self.voices.iter().position(|voice| {
            voice.state() != VoiceState::Idle
                && voice.midi_note() == midi_note
                && unison_index.is_none_or(|slot| voice.unison_index() == slot)
        })
    }

    /// Index of the deterministic steal candidate: smallest
    /// `(state_rank, event_index, midi_note)` tuple.
    fn find_steal_voice(&self) -> Option<usize> {
        fn score(voice: &Voice) -> (u8, u64, i32) {
            let state_rank = match voice.state() {
                VoiceState::Idle => 0,
                VoiceState::Releasing => 1,
                VoiceState::Active => 2,
            };
            (state_rank, voice.event_index(), voice.midi_note())
        }

        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| score(voice))
            .map(|(index, _)| index)
    }

    fn push_held_note(&mut self, midi_note: i32, velocity: f32) {
        self.remove_held_note(midi_note);
        self.held_notes.push(HeldNote {
            midi_note,
            velocity,
        });
    }

    fn remove_held_note(&mut self, midi_note: i32) {
        self.held_notes.retain(|note| note.midi_note != midi_note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(mode: VoiceMode, max_voices: usize) -> VoiceManager {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode,
            max_voices,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);
        manager
    }

    fn notes_sounding(manager: &VoiceManager) -> Vec<i32> {
        manager
            .voices()
            .iter()
            .filter(|v| v.state() != VoiceState::Idle)
            .map(|v| v.midi_note())
            .collect()
    }

    #[test]
    fn pool_size_follows_mode() {
        let mut manager = manager(VoiceMode::Poly, 8);
        assert_eq!(manager.voices().len(), 8);

        manager.set_config(VoiceManagerConfig {
            mode: VoiceMode::Mono,
            ..*manager.config()
        });
        assert_eq!(manager.voices().len(), 1);

        manager.set_config(VoiceManagerConfig {
            mode: VoiceMode::Poly,
            max_voices: 0,
            ..*manager.config()
        });
        assert_eq!(manager.voices().len(), 1, "pool never drops below 1");
    }

    #[test]
    fn poly_allocates_one_voice_per_note() {
        let mut manager = manager(VoiceMode::Poly, 4);
        manager.note_on(60, 0.7);
        manager.note_on(64, 0.8);

        let active = manager
            .voices()
            .iter()
            .filter(|v| v.state() == VoiceState::Active)
            .count();
        assert_eq!(active, 2);
    }

    #[test]
    fn event_indices_strictly_increase() {
        let mut manager = manager(VoiceMode::Poly, 4);
        manager.note_on(60, 1.0);
        manager.note_on(64, 1.0);
        manager.note_on(67, 1.0);

        let mut indices: Vec<u64> = manager
            .voices()
            .iter()
            .filter(|v| v.state() == VoiceState::Active)
            .map(|v| v.event_index())
            .collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn steal_prefers_oldest_active() {
        let mut manager = manager(VoiceMode::Poly, 2);
        manager.note_on(60, 1.0); // oldest
        manager.note_on(62, 1.0);
        manager.note_on(65, 1.0); // steals 60

        let mut sounding = notes_sounding(&manager);
        sounding.sort_unstable();
        assert_eq!(sounding, vec![62, 65]);

        manager.note_on(67, 1.0); // steals 62

        let mut sounding = notes_sounding(&manager);
        sounding.sort_unstable();
        assert_eq!(sounding, vec![65, 67]);
    }

    #[test]
    fn steal_prefers_releasing_over_active() {
        let mut manager = manager(VoiceMode::Poly, 2);
        manager.note_on(60, 1.0);
        manager.note_on(62, 1.0);
        manager.note_off(62); // newer voice, but releasing

        manager.note_on(65, 1.0);

        let mut sounding = notes_sounding(&manager);
        sounding.sort_unstable();
        assert_eq!(sounding, vec![60, 65], "releasing voice should be stolen first");
    }

    #[test]
    fn note_off_releases_only_held_voices() {
        let mut manager = manager(VoiceMode::Poly, 4);
        manager.note_on(60, 1.0);
        manager.note_on(64, 1.0);

        manager.note_off(60);

        let releasing: Vec<i32> = manager
            .voices()
            .iter()
            .filter(|v| v.state() == VoiceState::Releasing)
            .map(|v| v.midi_note())
            .collect();
        assert_eq!(releasing, vec![60]);
    }

    #[test]
    fn released_voice_returns_to_idle_after_tail() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Poly,
            max_voices: 4,
            release_time_ms: 10.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);

        manager.note_on(60, 1.0);
        manager.note_off(60);

        manager.advance(512);
        manager.advance(512);

        assert!(
            notes_sounding(&manager).is_empty(),
            "note should have fully released"
        );
        assert!(
            manager.voices().iter().all(|v| v.midi_note() != 60),
            "idle voice must not keep reporting the note"
        );
    }

    #[test]
    fn repeated_and_unknown_note_offs_are_noops() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Poly,
            max_voices: 3,
            release_time_ms: 0.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(44100.0, 128);

        manager.note_on(60, 1.0);
        manager.note_on(67, 1.0);
        manager.note_off(60);
        manager.note_off(60);
        manager.note_off(80);
        manager.note_off(67);
        manager.all_notes_off();
        manager.advance(64);

        assert!(
            manager
                .voices()
                .iter()
                .all(|v| v.state() == VoiceState::Idle),
            "no voice may stay stuck"
        );
    }

    #[test]
    fn mono_restarts_single_voice() {
        let mut manager = manager(VoiceMode::Mono, 8);
        manager.note_on(60, 1.0);
        manager.note_on(72, 1.0);

        assert_eq!(manager.voices().len(), 1);
        assert_eq!(manager.voices()[0].midi_note(), 72);
        // Plain mono jumps; no glide residue
        assert_eq!(
            manager.voices()[0].current_pitch_hz(),
            manager.voices()[0].target_pitch_hz()
        );
    }

    #[test]
    fn legato_returns_to_previous_held_key() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Legato,
            glide_time_ms: 50.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);

        manager.note_on(60, 1.0);
        manager.note_on(67, 1.0); // retarget while 60 still held
        assert_eq!(manager.voices()[0].midi_note(), 67);
        assert_eq!(manager.voices()[0].state(), VoiceState::Active);

        manager.note_off(67); // falls back to 60
        assert_eq!(manager.voices()[0].midi_note(), 60);
        assert_eq!(manager.voices()[0].state(), VoiceState::Active);

        manager.note_off(60); // nothing held -> release
        assert_eq!(manager.voices()[0].state(), VoiceState::Releasing);
    }

    #[test]
    fn legato_retarget_glides_from_current_pitch() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Legato,
            glide_time_ms: 100.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);

        manager.note_on(57, 1.0); // A3 = 220 Hz
        let pitch_before = manager.voices()[0].current_pitch_hz();

        manager.note_on(69, 1.0); // target 440 Hz
        assert!(
            (manager.voices()[0].current_pitch_hz() - pitch_before).abs() < 0.01,
            "legato must not jump"
        );

        for _ in 0..100 {
            manager.advance(64);
        }
        assert!((manager.voices()[0].current_pitch_hz() - 440.0).abs() < 0.5);
    }

    #[test]
    fn unison_distributes_symmetric_detune_and_pan() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Unison,
            max_voices: 8,
            unison_voices: 3,
            unison_detune_cents: 10.0,
            unison_spread: 1.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);

        manager.note_on(60, 1.0);

        let mut voices: Vec<(i32, f32, f32)> = manager
            .voices()
            .iter()
            .filter(|v| v.state() == VoiceState::Active)
            .map(|v| (v.unison_index(), v.detune_cents(), v.spread_pan()))
            .collect();
        voices.sort_by_key(|(index, _, _)| *index);

        assert_eq!(voices.len(), 3);
        let expected = [(0, -10.0, -1.0), (1, 0.0, 0.0), (2, 10.0, 1.0)];
        for ((index, detune, pan), (want_index, want_detune, want_pan)) in
            voices.iter().zip(expected.iter())
        {
            assert_eq!(index, want_index);
            assert!((detune - want_detune).abs() < 1e-6, "detune {detune}");
            assert!((pan - want_pan).abs() < 1e-6, "pan {pan}");
        }
    }

    #[test]
    fn unison_single_voice_has_no_offsets() {
        let mut manager = VoiceManager::with_config(VoiceManagerConfig {
            mode: VoiceMode::Unison,
            max_voices: 4,
            unison_voices: 1,
            unison_detune_cents: 25.0,
            unison_spread: 1.0,
            ..VoiceManagerConfig::default()
        });
        manager.prepare(48000.0, 64);
        manager.note_on(60, 1.0);

        let voice = &manager.voices()[0];
        assert_eq!(voice.detune_cents(), 0.0);
        assert_eq!(voice.spread_pan(), 0.0);
    }

    #[test]
    fn retriggering_same_note_reuses_its_voice() {
        let mut manager = manager(VoiceMode::Poly, 4);
        manager.note_on(60, 1.0);
        manager.note_on(60, 1.0);

        let sounding = notes_sounding(&manager);
        assert_eq!(sounding, vec![60], "same note must not claim a second voice");
    }

    #[test]
    fn reset_clears_everything() {
        let mut manager = manager(VoiceMode::Poly, 4);
        manager.note_on(60, 1.0);
        manager.note_on(64, 1.0);

        manager.reset();
        assert!(notes_sounding(&manager).is_empty());

        // Event counter restarts
        manager.note_on(72, 1.0);
        let index = manager
            .voices()
            .iter()
            .find(|v| v.state() == VoiceState::Active)
            .map(|v| v.event_index());
        assert_eq!(index, Some(1));
    }
}
