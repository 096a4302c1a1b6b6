//! Musical timing for tempo-synced modulation.
//!
//! Provides the division→rate conversion used by the tempo-synced LFO
//! mode: a division names how many modulation cycles fit in one beat, and
//! the host tempo turns that into a frequency.

/// Musical note divisions for tempo sync.
///
/// The numeric mapping is cycles per beat: a whole note spans four beats
/// (0.25 cycles per beat), an eighth-note triplet fits three cycles into
/// one beat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncDivision {
    /// Whole note (4 beats per cycle)
    Whole,
    /// Half note (2 beats per cycle)
    Half,
    /// Quarter note (1 beat per cycle)
    #[default]
    Quarter,
    /// Eighth note (2 cycles per beat)
    Eighth,
    /// Sixteenth note (4 cycles per beat)
    Sixteenth,
    /// Eighth-note triplet (3 cycles per beat)
    EighthTriplet,
}

impl SyncDivision {
    /// Modulation cycles completed per beat.
    pub fn cycles_per_beat(self) -> f32 {
        match self {
            SyncDivision::Whole => 0.25,
            SyncDivision::Half => 0.5,
            SyncDivision::Quarter => 1.0,
            SyncDivision::Eighth => 2.0,
            SyncDivision::Sixteenth => 4.0,
            SyncDivision::EighthTriplet => 3.0,
        }
    }

    /// Convert this division to a rate in Hz at the given tempo.
    ///
    /// # Example
    ///
    /// ```rust
    /// use onda_core::SyncDivision;
    ///
    /// // At 120 BPM, quarter notes tick at 2 Hz
    /// assert!((SyncDivision::Quarter.to_hz(120.0) - 2.0).abs() < 1e-6);
    ///
    /// // At 120 BPM, sixteenth notes tick at 8 Hz
    /// assert!((SyncDivision::Sixteenth.to_hz(120.0) - 8.0).abs() < 1e-6);
    /// ```
    pub fn to_hz(self, bpm: f32) -> f32 {
        let beats_per_second = bpm / 60.0;
        beats_per_second * self.cycles_per_beat()
    }
}
