//! Drive the synthesis engine the way a host integration layer would.
//!
//! Plays a short phrase through the full chain — voice manager, modulation
//! engine, matrix, oscillator, filter — and prints a block-level envelope
//! so the output is visible without an audio device:
//!
//! ```sh
//! cargo run -p onda-synth --example engine_demo
//! ```

use onda_synth::{
    FilterMode, ModDestination, ModSource, ModulationEngine, ModulationMatrix, MultiModeFilter,
    OscQuality, PhaseDistortionOscillator, Route, SourceValues, VoiceManager, VoiceManagerConfig,
    VoiceMode,
};

const SR: f32 = 48000.0;
const BLOCK: usize = 256;

fn main() {
    let mut manager = VoiceManager::with_config(VoiceManagerConfig {
        mode: VoiceMode::Legato,
        glide_time_ms: 60.0,
        release_time_ms: 150.0,
        ..VoiceManagerConfig::default()
    });
    manager.prepare(SR, BLOCK);

    let mut engine = ModulationEngine::new(SR);
    engine.amp_env.set_attack_ms(5.0);
    engine.amp_env.set_sustain(0.8);
    engine.amp_env.set_release_ms(150.0);
    engine.mod_env.set_attack_ms(120.0);
    engine.lfo1.set_rate_hz(5.5);

    let mut matrix: ModulationMatrix<16> = ModulationMatrix::new(SR);
    matrix.add_route(Route::unipolar(ModSource::AmpEnv, ModDestination::Amp, 1.0));
    matrix.add_route(Route::unipolar(ModSource::ModEnv, ModDestination::PdAmount, 0.8));
    matrix.add_route(Route::new(ModSource::Lfo1, ModDestination::FilterCutoff, 0.15));

    let mut osc = PhaseDistortionOscillator::new(SR);
    osc.set_quality(OscQuality::High);

    let mut filter = MultiModeFilter::new(SR);
    filter.set_mode(FilterMode::Lowpass);
    filter.set_cutoff_hz(3000.0);
    filter.set_resonance(0.3);
    filter.set_key_tracking(0.6);

    // A small phrase: (block index, note on/off)
    let phrase: &[(usize, i32, bool)] = &[
        (0, 45, true),
        (60, 52, true),
        (120, 57, true),
        (180, 57, false),
        (180, 52, false),
        (200, 45, false),
    ];

    let base_pd = 0.1;
    let base_cutoff = 3000.0;
    let total_blocks = 280;

    for block in 0..total_blocks {
        for &(at, note, on) in phrase {
            if at == block {
                if on {
                    manager.note_on(note, 0.9);
                    engine.amp_env.gate_on();
                    engine.mod_env.gate_on();
                } else {
                    manager.note_off(note);
                }
            }
        }
        if block == 200 {
            engine.amp_env.gate_off();
            engine.mod_env.gate_off();
        }

        manager.advance(BLOCK);
        let key_hz = manager.voices()[0].current_pitch_hz().max(20.0);
        osc.set_frequency(key_hz);

        let mut peak = 0.0f32;
        for _ in 0..BLOCK {
            let mut sources = SourceValues::new();
            sources.set(ModSource::AmpEnv, engine.amp_env.advance());
            sources.set(ModSource::ModEnv, engine.mod_env.advance());
            sources.set(ModSource::Lfo1, (engine.lfo1.advance() + 1.0) * 0.5);
            sources.set(ModSource::Lfo2, (engine.lfo2.advance() + 1.0) * 0.5);
            sources.set(ModSource::Velocity, 0.9);

            let deltas = matrix.process(&sources);
            osc.set_pd_amount((base_pd + deltas.get(ModDestination::PdAmount)).clamp(0.0, 1.0));
            filter.set_cutoff_hz(
                (base_cutoff + 8000.0 * deltas.get(ModDestination::FilterCutoff))
                    .clamp(20.0, 20000.0),
            );

            let amp = deltas.get(ModDestination::Amp).clamp(0.0, 1.0);
            let sample = filter.process_sample(osc.advance(), key_hz) * amp;
            peak = peak.max(sample.abs());
        }

        if block % 10 == 0 {
            let bar = "#".repeat((peak * 50.0) as usize);
            println!("block {block:3}  {:7.1} Hz  |{bar}", key_hz);
        }
    }
}
