//! Modulation routing matrix.
//!
//! Routes named sources (envelopes, LFOs, velocity, key tracking) to named
//! destinations (pitch, warp amount, filter cutoff, amplitude) with a
//! per-route depth and polarity. Each processing step accumulates the
//! signed, depth-scaled contributions per destination and then smooths the
//! result through a dedicated one-pole per destination, so a route being
//! added, removed, or re-depthed between blocks never steps audibly.
//!
//! # Serialization
//!
//! The route list serializes to a versioned line format consumed by the
//! host's state-persistence layer:
//!
//! ```text
//! schema=1
//! routes=2
//! 0,3,1,0
//! 2,2,0.37,1
//! ```
//!
//! Each route line is `sourceIndex,destinationIndex,depth,bipolar(0|1)`.
//! The numeric values of [`ModSource`] and [`ModDestination`] are frozen
//! for shipped schema versions — compile-time assertions below guard
//! against accidental renumbering. Deserialization is strict and
//! all-or-nothing: any malformed input leaves the existing routes
//! untouched.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt::Write as _;

use onda_core::SmoothedParam;
use thiserror::Error;

/// Version tag written by [`ModulationMatrix::serialize`].
pub const SCHEMA_VERSION: u32 = 1;

/// Modulation sources.
///
/// The discriminants are the serialized wire indices — frozen, never
/// renumber for a shipped schema version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ModSource {
    /// Amplitude envelope (unipolar).
    AmpEnv = 0,
    /// Modulation envelope (unipolar).
    ModEnv = 1,
    /// LFO 1 (published unipolar by the integration layer).
    Lfo1 = 2,
    /// LFO 2 (published unipolar by the integration layer).
    Lfo2 = 3,
    /// Note-on velocity.
    Velocity = 4,
    /// Keyboard position.
    KeyTrack = 5,
}

impl ModSource {
    /// Number of sources; sizes fixed containers.
    pub const COUNT: usize = 6;

    /// All sources in wire-index order.
    pub const ALL: [ModSource; Self::COUNT] = [
        ModSource::AmpEnv,
        ModSource::ModEnv,
        ModSource::Lfo1,
        ModSource::Lfo2,
        ModSource::Velocity,
        ModSource::KeyTrack,
    ];

    /// Wire index of this source.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Source for a wire index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Modulation destinations.
///
/// The discriminants are the serialized wire indices — frozen, never
/// renumber for a shipped schema version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ModDestination {
    /// Oscillator pitch.
    Pitch = 0,
    /// Phase-distortion warp amount.
    PdAmount = 1,
    /// Filter cutoff.
    FilterCutoff = 2,
    /// Output amplitude.
    Amp = 3,
}

impl ModDestination {
    /// Number of destinations; sizes fixed containers.
    pub const COUNT: usize = 4;

    /// All destinations in wire-index order.
    pub const ALL: [ModDestination; Self::COUNT] = [
        ModDestination::Pitch,
        ModDestination::PdAmount,
        ModDestination::FilterCutoff,
        ModDestination::Amp,
    ];

    /// Wire index of this destination.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Destination for a wire index, if in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

// Wire indices are load-bearing for shipped state; a reordered variant
// must fail the build, not ship.
const _: () = {
    assert!(ModSource::AmpEnv as usize == 0);
    assert!(ModSource::ModEnv as usize == 1);
    assert!(ModSource::Lfo1 as usize == 2);
    assert!(ModSource::Lfo2 as usize == 3);
    assert!(ModSource::Velocity as usize == 4);
    assert!(ModSource::KeyTrack as usize == 5);
    assert!(ModDestination::Pitch as usize == 0);
    assert!(ModDestination::PdAmount as usize == 1);
    assert!(ModDestination::FilterCutoff as usize == 2);
    assert!(ModDestination::Amp as usize == 3);
};

/// One source→destination connection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Route {
    /// Where the modulation signal comes from.
    pub source: ModSource,
    /// Which parameter it drives.
    pub destination: ModDestination,
    /// Scale applied to the (possibly remapped) source value.
    pub depth: f32,
    /// When set, the source value is remapped `v·2 − 1` before scaling.
    pub bipolar: bool,
}

impl Route {
    /// Create a bipolar route.
    pub fn new(source: ModSource, destination: ModDestination, depth: f32) -> Self {
        Self {
            source,
            destination,
            depth,
            bipolar: true,
        }
    }

    /// Create a unipolar route (source value used as-is).
    pub fn unipolar(source: ModSource, destination: ModDestination, depth: f32) -> Self {
        Self {
            source,
            destination,
            depth,
            bipolar: false,
        }
    }
}

/// Current source values, one slot per [`ModSource`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceValues {
    values: [f32; ModSource::COUNT],
}

impl SourceValues {
    /// All sources at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one source value.
    #[inline]
    pub fn set(&mut self, source: ModSource, value: f32) {
        self.values[source.index()] = value;
    }

    /// Read one source value.
    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        self.values[source.index()]
    }
}

/// Smoothed per-destination modulation deltas, one slot per
/// [`ModDestination`].
///
/// These are deltas, not absolute parameter values: the integration layer
/// adds them onto its base parameter values each block.
#[derive(Clone, Copy, Debug, Default)]
pub struct DestinationValues {
    values: [f32; ModDestination::COUNT],
}

impl DestinationValues {
    /// Read one destination delta.
    #[inline]
    pub fn get(&self, destination: ModDestination) -> f32 {
        self.values[destination.index()]
    }
}

/// Failure cases for [`ModulationMatrix::deserialize`].
///
/// Every variant leaves the matrix's existing routes untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteParseError {
    /// A `schema=`/`routes=` header line was missing or unparseable.
    #[error("malformed header")]
    MalformedHeader,
    /// The stream was written by an unknown schema version.
    #[error("unsupported schema version {found}")]
    UnsupportedSchema {
        /// Version found in the stream.
        found: u32,
    },
    /// The declared route count disagrees with the number of route lines.
    #[error("route count mismatch: header declares {expected}, stream holds {found}")]
    RouteCountMismatch {
        /// Count from the `routes=` header.
        expected: usize,
        /// Route lines actually present.
        found: usize,
    },
    /// A route line had missing/extra fields or a non-numeric value.
    #[error("malformed route on line {line}")]
    MalformedRoute {
        /// 1-based route line number.
        line: usize,
    },
    /// A source index was outside the known range.
    #[error("source index {index} out of range")]
    InvalidSource {
        /// Index found in the stream.
        index: i64,
    },
    /// A destination index was outside the known range.
    #[error("destination index {index} out of range")]
    InvalidDestination {
        /// Index found in the stream.
        index: i64,
    },
    /// The stream holds more routes than this matrix has slots.
    #[error("route count {count} exceeds matrix capacity {capacity}")]
    CapacityExceeded {
        /// Count declared in the stream.
        count: usize,
        /// Slots available in this matrix.
        capacity: usize,
    },
}

/// Modulation matrix with `N` route slots and per-destination smoothing.
///
/// Route order is preserved (it makes serialization deterministic); the
/// accumulation itself is additive and order-independent.
///
/// # Example
///
/// ```rust
/// use onda_synth::{ModSource, ModDestination, ModulationMatrix, Route, SourceValues};
///
/// let mut matrix: ModulationMatrix<8> = ModulationMatrix::new(48000.0);
/// matrix.set_smoothing_time_ms(0.0); // unsmoothed
/// matrix.add_route(Route::unipolar(ModSource::AmpEnv, ModDestination::Amp, 1.0));
///
/// let mut sources = SourceValues::new();
/// sources.set(ModSource::AmpEnv, 0.5);
/// let deltas = matrix.process(&sources);
/// assert!((deltas.get(ModDestination::Amp) - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct ModulationMatrix<const N: usize> {
    routes: [Option<Route>; N],
    route_count: usize,
    smoothers: [SmoothedParam; ModDestination::COUNT],
    sample_rate: f32,
}

impl<const N: usize> ModulationMatrix<N> {
    /// Default destination smoothing time constant.
    pub const DEFAULT_SMOOTHING_MS: f32 = 10.0;

    /// Create an empty matrix at the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            routes: [None; N],
            route_count: 0,
            smoothers: core::array::from_fn(|_| {
                SmoothedParam::with_config(0.0, sample_rate, Self::DEFAULT_SMOOTHING_MS)
            }),
            sample_rate,
        }
    }

    /// Update the sample rate (rescales the smoothing coefficients).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        for smoother in &mut self.smoothers {
            smoother.set_sample_rate(self.sample_rate);
        }
    }

    /// Set the smoothing time constant applied to every destination.
    ///
    /// Zero (or negative) disables smoothing: destinations follow the
    /// accumulated value exactly.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        for smoother in &mut self.smoothers {
            smoother.set_smoothing_time_ms(time_ms);
        }
    }

    /// Append a route. Returns `false` when every slot is taken.
    pub fn add_route(&mut self, route: Route) -> bool {
        if self.route_count >= N {
            return false;
        }
        self.routes[self.route_count] = Some(route);
        self.route_count += 1;
        true
    }

    /// Remove all routes. Smoother state is left alone — the accumulated
    /// targets fall to zero and the smoothers glide there.
    pub fn clear_routes(&mut self) {
        self.routes = [None; N];
        self.route_count = 0;
    }

    /// Number of active routes.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Total route slots.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Route by position, if present.
    pub fn get_route(&self, index: usize) -> Option<&Route> {
        self.routes[..self.route_count].get(index)?.as_ref()
    }

    /// Iterate active routes in order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes[..self.route_count].iter().filter_map(Option::as_ref)
    }

    /// One modulation step: accumulate every route into its destination,
    /// then smooth each destination.
    ///
    /// Allocation-free; call once per sample.
    #[inline]
    pub fn process(&mut self, sources: &SourceValues) -> DestinationValues {
        let mut accumulated = [0.0f32; ModDestination::COUNT];
        for route in self.routes[..self.route_count].iter().flatten() {
            let raw = sources.get(route.source);
            let value = if route.bipolar { raw * 2.0 - 1.0 } else { raw };
            accumulated[route.destination.index()] += value * route.depth;
        }

        let mut values = [0.0f32; ModDestination::COUNT];
        for i in 0..ModDestination::COUNT {
            self.smoothers[i].set_target(accumulated[i]);
            values[i] = self.smoothers[i].advance();
        }

        DestinationValues { values }
    }

    /// Serialize the route list to the versioned text format.
    pub fn serialize(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(text, "schema={SCHEMA_VERSION}");
        let _ = writeln!(text, "routes={}", self.route_count);
        for route in self.routes() {
            let _ = writeln!(
                text,
                "{},{},{},{}",
                route.source.index(),
                route.destination.index(),
                route.depth,
                u8::from(route.bipolar)
            );
        }
        text
    }

    /// Replace the route list from serialized text.
    ///
    /// Strict and all-or-nothing: on any error the existing routes are
    /// left untouched. Reading stops at the first empty line, so trailing
    /// unrelated state concatenated by the persistence layer is ignored.
    pub fn deserialize(&mut self, text: &str) -> Result<(), RouteParseError> {
        let mut lines = text.lines();

        let schema: u32 = lines
            .next()
            .and_then(|line| line.strip_prefix("schema="))
            .and_then(|value| value.parse().ok())
            .ok_or(RouteParseError::MalformedHeader)?;
        if schema != SCHEMA_VERSION {
            return Err(RouteParseError::UnsupportedSchema { found: schema });
        }

        let expected: usize = lines
            .next()
            .and_then(|line| line.strip_prefix("routes="))
            .and_then(|value| value.parse().ok())
            .ok_or(RouteParseError::MalformedHeader)?;
        if expected > N {
            return Err(RouteParseError::CapacityExceeded {
                count: expected,
                capacity: N,
            });
        }

        let mut parsed: [Option<Route>; N] = [None; N];
        let mut found = 0usize;
        for line in lines {
            if line.is_empty() {
                break;
            }
            found += 1;
            if found > expected {
                continue; // keep counting for the mismatch report
            }
            parsed[found - 1] = Some(parse_route_line(line, found)?);
        }
        if found != expected {
            return Err(RouteParseError::RouteCountMismatch { expected, found });
        }

        self.routes = parsed;
        self.route_count = expected;
        Ok(())
    }
}

/// Parse one `source,destination,depth,bipolar` line.
fn parse_route_line(line: &str, line_number: usize) -> Result<Route, RouteParseError> {
    let malformed = RouteParseError::MalformedRoute { line: line_number };

    let mut fields = line.split(',');
    let (Some(source), Some(destination), Some(depth), Some(bipolar), None) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(malformed);
    };

    let source_index: i64 = source.parse().map_err(|_| malformed)?;
    let source = usize::try_from(source_index)
        .ok()
        .and_then(ModSource::from_index)
        .ok_or(RouteParseError::InvalidSource {
            index: source_index,
        })?;

    let destination_index: i64 = destination.parse().map_err(|_| malformed)?;
    let destination = usize::try_from(destination_index)
        .ok()
        .and_then(ModDestination::from_index)
        .ok_or(RouteParseError::InvalidDestination {
            index: destination_index,
        })?;

    let depth: f32 = depth.parse().map_err(|_| malformed)?;

    let bipolar = match bipolar {
        "0" => false,
        "1" => true,
        _ => return Err(malformed),
    };

    Ok(Route {
        source,
        destination,
        depth,
        bipolar,
    })
}
