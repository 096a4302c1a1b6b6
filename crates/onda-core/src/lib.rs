//! Onda Core - DSP primitives for the onda synthesis engine
//!
//! This crate provides the foundational building blocks shared by the
//! synthesis layer: a multimode filter, a modulation LFO, parameter
//! smoothing, tempo utilities, and the numerical-safety helpers they
//! depend on. Everything is designed for real-time audio processing with
//! zero allocation on the per-sample path.
//!
//! # Core Components
//!
//! ## Multimode Filter
//!
//! - [`MultiModeFilter`] - Zero-delay-feedback state-variable filter with
//!   key-tracked cutoff (lowpass, bandpass, highpass)
//! - [`FilterMode`] - Output tap selection
//!
//! ```rust
//! use onda_core::{MultiModeFilter, FilterMode};
//!
//! let mut filter = MultiModeFilter::new(48000.0);
//! filter.set_mode(FilterMode::Lowpass);
//! filter.set_cutoff_hz(1200.0);
//! filter.set_resonance(0.4);
//!
//! // key_frequency_hz drives keyboard tracking of the cutoff
//! let out = filter.process_sample(0.5, 220.0);
//! ```
//!
//! ## Modulation LFO
//!
//! - [`Lfo`] - Sine/triangle low-frequency oscillator, free-running or
//!   tempo-synced
//! - [`SyncDivision`] - Musical divisions for tempo sync
//!
//! ```rust
//! use onda_core::{Lfo, LfoRateMode, SyncDivision};
//!
//! let mut lfo = Lfo::new(48000.0, 2.0);
//! lfo.set_rate_mode(LfoRateMode::TempoSync);
//! lfo.set_tempo_bpm(120.0);
//! lfo.set_sync_division(SyncDivision::Quarter);
//! assert!((lfo.frequency_hz() - 2.0).abs() < 1e-6);
//! let value = lfo.advance();
//! ```
//!
//! ## Parameter Smoothing
//!
//! - [`SmoothedParam`] - Exponential one-pole smoothing for zipper-free
//!   parameter and modulation-destination changes
//!
//! ## Utilities
//!
//! - [`flush_denormal`] - NaN/Inf/subnormal containment for recursive state
//! - [`lerp`] - Linear crossfade
//! - [`fast_tan`] - Padé tangent approximation for filter coefficients
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! onda-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocations, locks, or panics in processing paths
//! - **Numerically contained**: recursive state is flushed to exact zero when
//!   it goes non-finite or subnormal
//! - **`libm` math**: no dependency on `std` float intrinsics

#![cfg_attr(not(feature = "std"), no_std)]

pub mod fast_math;
pub mod lfo;
pub mod math;
pub mod param;
pub mod svf;
pub mod tempo;

// Re-export main types at crate root
pub use fast_math::fast_tan;
pub use lfo::{Lfo, LfoRateMode, LfoWaveform};
pub use math::{flush_denormal, lerp};
pub use param::SmoothedParam;
pub use svf::{FilterMode, MultiModeFilter};
pub use tempo::SyncDivision;
