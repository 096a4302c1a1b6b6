//! Integration tests for onda-core DSP primitives.
//!
//! Covers filter stability under automation, silence decay to exact zero,
//! keyboard tracking audibility, and tempo-synced LFO rate accuracy.

use onda_core::{FilterMode, Lfo, LfoRateMode, MultiModeFilter, SyncDivision};

const SR: f32 = 48000.0;

// ---------------------------------------------------------------------------
// Filter stability
// ---------------------------------------------------------------------------

#[test]
fn filter_impulse_finite_all_modes() {
    for mode in [FilterMode::Lowpass, FilterMode::Bandpass, FilterMode::Highpass] {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_mode(mode);
        filter.set_cutoff_hz(1000.0);
        filter.set_resonance(0.9);

        let out = filter.process_sample(1.0, 440.0);
        assert!(out.is_finite(), "{mode:?} impulse response non-finite");
        for i in 0..48_000 {
            let out = filter.process_sample(0.0, 440.0);
            assert!(out.is_finite(), "{mode:?} non-finite at sample {i}");
        }
    }
}

#[test]
fn filter_survives_automation_sweep() {
    // One second of simultaneous cutoff (20 Hz -> 20 kHz) and resonance
    // (0 -> 1, clamped to 0.99) automation while filtering a sine.
    for mode in [FilterMode::Lowpass, FilterMode::Bandpass, FilterMode::Highpass] {
        let mut filter = MultiModeFilter::new(SR);
        filter.set_mode(mode);

        let samples = SR as usize;
        for i in 0..samples {
            let t = i as f32 / samples as f32;
            filter.set_cutoff_hz(20.0 + t * (20_000.0 - 20.0));
            filter.set_resonance(t);

            let input = libm::sinf(i as f32 * 0.08) * 1.0;
            let out = filter.process_sample(input, 440.0);
            assert!(
                out.is_finite(),
                "{mode:?} non-finite during sweep at sample {i}"
            );
        }
    }
}

#[test]
fn resonant_ring_decays_to_exact_zero() {
    let mut filter = MultiModeFilter::new(SR);
    filter.set_cutoff_hz(200.0);
    filter.set_resonance(0.95);

    // Transient excitation
    for _ in 0..64 {
        filter.process_sample(1.0, 440.0);
    }

    // Zero input must drive the output to exact 0.0 — not merely small —
    // within 200k samples, proving the denormal flush terminates the tail.
    // A sustained run of zeros is required: a single zero sample can occur
    // at a zero-crossing while the ring is still alive.
    let mut consecutive_zeros = 0u32;
    let mut settled_at = None;
    for i in 0..200_000 {
        let out = filter.process_sample(0.0, 440.0);
        if out == 0.0 {
            consecutive_zeros += 1;
            if consecutive_zeros >= 1000 {
                settled_at = Some(i);
                break;
            }
        } else {
            consecutive_zeros = 0;
        }
    }
    assert!(
        settled_at.is_some(),
        "ring never settled to exact zero within 200k samples"
    );

    // And it must stay there
    for _ in 0..1000 {
        assert_eq!(filter.process_sample(0.0, 440.0), 0.0);
    }
}

// ---------------------------------------------------------------------------
// Keyboard tracking
// ---------------------------------------------------------------------------

fn tracked_rms(key_frequency_hz: f32) -> f32 {
    let mut filter = MultiModeFilter::new(SR);
    filter.set_cutoff_hz(500.0);
    filter.set_key_tracking(1.0);
    filter.set_key_tracking_reference_hz(440.0);

    // 3 kHz test tone: well above the base cutoff, so the amount that
    // leaks through depends on how far tracking has pushed the cutoff up.
    let omega = core::f32::consts::TAU * 3000.0 / SR;
    let mut sum_sq = 0.0;
    let n = 24_000;
    for i in 0..n {
        let input = libm::sinf(i as f32 * omega);
        let out = filter.process_sample(input, key_frequency_hz);
        sum_sq += out * out;
    }
    libm::sqrtf(sum_sq / n as f32)
}

#[test]
fn higher_key_frequency_opens_tracked_filter() {
    let low_key = tracked_rms(110.0);
    let high_key = tracked_rms(1760.0);
    assert!(
        high_key > low_key * 2.0,
        "tracking should open the filter for higher notes: low={low_key}, high={high_key}"
    );
}

// ---------------------------------------------------------------------------
// Tempo-synced LFO
// ---------------------------------------------------------------------------

#[test]
fn tempo_synced_lfo_rate_measured_by_zero_crossings() {
    let mut lfo = Lfo::new(SR, 1.0);
    lfo.set_rate_mode(LfoRateMode::TempoSync);
    lfo.set_tempo_bpm(120.0);
    lfo.set_sync_division(SyncDivision::Quarter);

    // 120 BPM quarter notes = 2 Hz. Measure over a 4-second window.
    let total = (SR * 4.0) as usize;
    let mut prev = 0.0f32;
    let mut positive_crossings = 0u32;
    for i in 0..total {
        let value = lfo.advance();
        if i > 0 && prev <= 0.0 && value > 0.0 {
            positive_crossings += 1;
        }
        prev = value;
    }

    let measured_hz = positive_crossings as f32 / 4.0;
    assert!(
        (measured_hz - 2.0).abs() < 0.3,
        "expected ~2 Hz, measured {measured_hz}"
    );
}
