//! Exponential parameter smoothing.
//!
//! Abrupt per-block changes to a control value (a modulation amount, a
//! gain, a cutoff) produce audible steps — "zipper noise". [`SmoothedParam`]
//! is a one-pole lowpass toward a target value, advanced once per sample:
//!
//! ```text
//! y[n] = y[n-1] + coeff * (target - y[n-1])
//! coeff = 1 - e^(-1 / (tau * sample_rate))
//! ```
//!
//! where `tau` is the smoothing time constant. The value reaches ~63% of a
//! step after `tau` and is effectively settled after `5·tau`. A time of
//! zero (or less) sets `coeff = 1`: the smoother becomes a pass-through,
//! which is how an unsmoothed modulation destination is expressed.

use libm::expf;

/// A control value with built-in exponential smoothing.
///
/// Used for modulation-destination smoothing and any parameter that must
/// move without audible discontinuities. `advance` is allocation-free and
/// branch-free — safe on the per-sample path.
///
/// # Example
///
/// ```rust
/// use onda_core::SmoothedParam;
///
/// let mut amount = SmoothedParam::with_config(0.0, 48000.0, 10.0);
/// amount.set_target(1.0);
/// for _ in 0..4800 {
///     amount.advance();
/// }
/// assert!((amount.get() - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a new smoothed parameter at the given initial value.
    ///
    /// Smoothing starts disabled (instant response) until
    /// [`set_smoothing_time_ms`](Self::set_smoothing_time_ms) is called with
    /// a positive time.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a fully configured smoothed parameter.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate.max(1.0);
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Set the value the smoother approaches.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and current value at once (no transition).
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update the sample rate and recompute the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate_coeff();
    }

    /// Set the smoothing time constant in milliseconds.
    ///
    /// Zero or negative disables smoothing (instant response).
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value, without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// The target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the smoothed value has effectively reached the target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 {
            self.coeff = 1.0;
        } else {
            let tau_samples = self.smoothing_time_ms * 0.001 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / tau_samples.max(1.0));
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time_is_instant() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 0.0);
        param.set_target(3.5);
        assert_eq!(param.advance(), 3.5);
    }

    #[test]
    fn negative_time_is_instant() {
        let mut param = SmoothedParam::with_config(1.0, 48000.0, -5.0);
        param.set_target(-2.0);
        assert_eq!(param.advance(), -2.0);
    }

    #[test]
    fn converges_to_target() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 10.0);
        param.set_target(1.0);

        // First sample moves but does not arrive
        let first = param.advance();
        assert!(first > 0.0 && first < 0.01);

        // 5 time constants later it is settled for audio purposes
        for _ in 0..2400 {
            param.advance();
        }
        assert!((param.get() - 1.0).abs() < 0.01);
    }

    #[test]
    fn set_immediate_skips_transition() {
        let mut param = SmoothedParam::with_config(0.0, 48000.0, 100.0);
        param.set_immediate(0.7);
        assert_eq!(param.get(), 0.7);
        assert_eq!(param.target(), 0.7);
        assert!(param.is_settled());
    }

    #[test]
    fn longer_time_moves_slower() {
        let mut fast = SmoothedParam::with_config(0.0, 48000.0, 5.0);
        let mut slow = SmoothedParam::with_config(0.0, 48000.0, 50.0);
        fast.set_target(1.0);
        slow.set_target(1.0);

        for _ in 0..480 {
            fast.advance();
            slow.advance();
        }
        assert!(fast.get() > slow.get());
    }
}
