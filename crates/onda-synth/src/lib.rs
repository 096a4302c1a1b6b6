//! Onda Synth - phase-distortion synthesis engine
//!
//! This crate provides the synthesis core beneath an instrument plugin:
//! note lifecycle and voice allocation, a phase-distortion oscillator, an
//! envelope/LFO modulation engine, and a routing matrix with
//! per-destination smoothing. The host shell (MIDI parsing, buses, GUI,
//! parameter persistence framing) lives outside this crate; the boundary
//! is plain data — note events in, pitch/modulation values out.
//!
//! # Core Components
//!
//! ## Voices
//!
//! - [`Voice`] - One note's pitch, glide, and release timing
//! - [`VoiceManager`] - Mono/poly/legato/unison allocation with
//!   deterministic stealing
//!
//! ```rust
//! use onda_synth::{VoiceManager, VoiceManagerConfig, VoiceMode};
//!
//! let mut manager = VoiceManager::with_config(VoiceManagerConfig {
//!     mode: VoiceMode::Poly,
//!     max_voices: 8,
//!     ..VoiceManagerConfig::default()
//! });
//! manager.prepare(48000.0, 128);
//!
//! manager.note_on(60, 0.8);
//! manager.advance(128);
//! manager.note_off(60);
//! ```
//!
//! ## Oscillator
//!
//! - [`PhaseDistortionOscillator`] - Warped-phase sine with 1×/2×/4×
//!   oversampling
//!
//! ```rust
//! use onda_synth::{PhaseDistortionOscillator, OscQuality};
//!
//! let mut osc = PhaseDistortionOscillator::new(48000.0);
//! osc.set_frequency(220.0);
//! osc.set_pd_amount(0.6);
//! osc.set_quality(OscQuality::Medium);
//! let sample = osc.advance();
//! ```
//!
//! ## Modulation
//!
//! - [`ModulationEngine`] - The canonical sources: two [`AdsrEnvelope`]s
//!   and two LFOs
//! - [`ModulationMatrix`] - Routes sources to destinations with depth,
//!   polarity, and per-destination smoothing; serializes its route list
//!   for the host's state persistence
//! - [`SharedModState`] - Relaxed-atomic publication of modulation values
//!   for UI meters
//!
//! Per audio block, the integration layer advances the voice manager's
//! timers, evaluates the engine's sources per sample, maps them through
//! the matrix into per-destination deltas, and applies those deltas to its
//! base parameter values before driving the oscillator and filter.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (an allocator is required for the
//! voice pool and route serialization). Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! onda-synth = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod envelope;
pub mod mod_engine;
pub mod mod_matrix;
pub mod oscillator;
pub mod shared;
pub mod voice;
pub mod voice_manager;

// Re-export main types at crate root
pub use envelope::{AdsrEnvelope, EnvelopeStage};
pub use mod_engine::ModulationEngine;
pub use mod_matrix::{
    DestinationValues, ModDestination, ModSource, ModulationMatrix, Route, RouteParseError,
    SCHEMA_VERSION, SourceValues,
};
pub use oscillator::{OscQuality, PhaseDistortionOscillator};
pub use shared::SharedModState;
pub use voice::{GlideCurve, NoteEvent, Voice, VoiceState, cents_to_ratio, midi_to_freq};
pub use voice_manager::{VoiceManager, VoiceManagerConfig, VoiceMode};

// Re-export commonly used types from onda-core
pub use onda_core::{FilterMode, Lfo, LfoRateMode, LfoWaveform, MultiModeFilter, SyncDivision};
