//! Signal Chain
//!
//! Runs the eight stages in their fixed order once per buffer:
//!
//! ```text
//! Gate → Compressor → Distortion → Tone EQ → Modulation → Cabinet → Delay → Reverb
//! ```
//!
//! Before processing, the chain syncs itself with [`SharedState`]: enable
//! flags are sampled, stages whose controls changed are re-derived through
//! the parameter mapper, and the cabinet index and LFO output are read
//! exactly once. Everything that happens mid-buffer uses those snapshots.

use tonestack_dsp::mapping::{
    compressor_makeup_db, compressor_ratio, compressor_threshold_db, delay_feedback_pct,
    delay_seconds, delay_wet_dry_mix, distortion_pre_gain_db, distortion_wet_dry_mix,
    gate_threshold_db, reverb_wet_dry_mix, tone_gain_db,
};
use tonestack_dsp::{
    Cabinet, Compressor, Delay, Distortion, ModulationStage, NoiseGate, ProcessContext, Reverb,
    Stage, ToneEq,
};

use crate::config::StreamConfig;
use crate::error::EngineResult;
use crate::shared::SharedState;
use crate::stage::{StageId, STAGE_COUNT};

/// The fixed-order effect chain
///
/// Owns every stage's DSP state. Lives on the audio thread.
pub struct SignalChain {
    context: ProcessContext,

    gate: NoiseGate,
    compressor: Compressor,
    distortion: Distortion,
    tone_eq: ToneEq,
    modulation: ModulationStage,
    cabinet: Cabinet,
    delay: Delay,
    reverb: Reverb,

    /// Enable flags as of the last buffer
    enabled: [bool; STAGE_COUNT],
    /// Control generation each stage was last derived from
    derived: [u32; STAGE_COUNT],
    /// Bypass epoch each stage was last cleared at
    cleared: [u32; STAGE_COUNT],
}

impl SignalChain {
    /// Build every stage for `config` and derive parameters from `shared`
    ///
    /// Allocates. Call at engine construction or reinitialisation only.
    pub fn new(config: &StreamConfig, shared: &SharedState) -> EngineResult<Self> {
        let sample_rate = config.sample_rate as f32;

        let mut chain = Self {
            context: ProcessContext::new(sample_rate, config.block_size as usize),
            gate: NoiseGate::new(sample_rate),
            compressor: Compressor::new(sample_rate),
            distortion: Distortion::new(),
            tone_eq: ToneEq::new(sample_rate)?,
            modulation: ModulationStage::new(sample_rate),
            cabinet: Cabinet::new(sample_rate)?,
            delay: Delay::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            enabled: [false; STAGE_COUNT],
            derived: [0; STAGE_COUNT],
            cleared: [0; STAGE_COUNT],
        };

        for id in StageId::ALL {
            chain.enabled[id.index()] = shared.is_enabled(id);
            chain.derived[id.index()] = shared.generation(id);
            chain.cleared[id.index()] = shared.bypass_epoch(id);
            chain.derive(id, shared);
        }
        chain.cabinet.select(shared.cabinet());

        Ok(chain)
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    /// Process one block in place
    ///
    /// # Real-time Safety
    /// No allocations, no locks. Only atomics are read from `shared`.
    pub fn process(&mut self, buffer: &mut [f32], shared: &SharedState) {
        self.sync(shared);

        for id in StageId::ALL {
            if self.enabled[id.index()] {
                let context = self.context;
                self.stage_mut(id).process(buffer, &context);
            }
        }
    }

    /// Clear all internal DSP state (delay lines, envelopes, filter memory)
    pub fn reset(&mut self) {
        for id in StageId::ALL {
            self.stage_mut(id).reset();
        }
    }

    /// Name of the preset the cabinet rendered the last buffer with
    pub fn active_cabinet(&self) -> &'static str {
        self.cabinet.active_name()
    }

    fn sync(&mut self, shared: &SharedState) {
        for id in StageId::ALL {
            let i = id.index();

            let enabled = shared.is_enabled(id);
            let epoch = shared.bypass_epoch(id);
            if epoch != self.cleared[i] || (self.enabled[i] && !enabled) {
                // Nothing from before the bypass may ring out on re-enable,
                // even if the stage came back before this buffer
                self.cleared[i] = epoch;
                self.stage_mut(id).reset();
            }
            self.enabled[i] = enabled;

            let generation = shared.generation(id);
            if generation != self.derived[i] {
                self.derived[i] = generation;
                self.derive(id, shared);
            }
        }

        // One load each; a switch lands between buffers, never inside one
        self.cabinet.select(shared.cabinet());
        if self.enabled[StageId::Modulation.index()] {
            let (kind, output) = shared.modulation();
            self.modulation.set_output(kind, output);
        }
    }

    /// Recompute physical parameters from the normalised controls
    fn derive(&mut self, id: StageId, shared: &SharedState) {
        let control = |slot: usize| shared.control(id, slot);

        match id {
            StageId::Gate => self.gate.set_threshold_db(gate_threshold_db(control(0))),
            StageId::Compressor => {
                let sustain = control(0);
                self.compressor.set_params(
                    compressor_threshold_db(sustain),
                    compressor_ratio(sustain),
                    compressor_makeup_db(control(1)),
                );
            }
            StageId::Distortion => {
                let drive = control(0);
                self.distortion
                    .set_params(distortion_pre_gain_db(drive), distortion_wet_dry_mix(drive));
            }
            StageId::ToneEq => {
                let gains = [
                    tone_gain_db(control(0)),
                    tone_gain_db(control(1)),
                    tone_gain_db(control(2)),
                ];
                // Bands are already fitted below Nyquist; on failure the
                // previous coefficients stay in place
                let _ = self.tone_eq.set_gains(gains);
            }
            // Rate and depth are consumed by the LFO ticker
            StageId::Modulation | StageId::Cabinet => {}
            StageId::Delay => self.delay.set_params(
                delay_seconds(control(0)),
                delay_feedback_pct(control(1)),
                delay_wet_dry_mix(control(2)),
            ),
            StageId::Reverb => self.reverb.set_mix(reverb_wet_dry_mix(control(0))),
        }
    }

    fn stage_mut(&mut self, id: StageId) -> &mut dyn Stage {
        match id {
            StageId::Gate => &mut self.gate,
            StageId::Compressor => &mut self.compressor,
            StageId::Distortion => &mut self.distortion,
            StageId::ToneEq => &mut self.tone_eq,
            StageId::Modulation => &mut self.modulation,
            StageId::Cabinet => &mut self.cabinet,
            StageId::Delay => &mut self.delay,
            StageId::Reverb => &mut self.reverb,
        }
    }

    #[cfg(test)]
    pub(crate) fn modulation(&self) -> &ModulationStage {
        &self.modulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tonestack_dsp::{find_preset, ModulationOutput, ModulationType};

    const BLOCK: usize = 1024;

    fn config() -> StreamConfig {
        StreamConfig {
            sample_rate: 44100,
            block_size: BLOCK as u32,
        }
    }

    fn sine(freq: f32) -> Vec<f32> {
        (0..BLOCK)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 44100.0).sin() * 0.5)
            .collect()
    }

    /// Shared state with every stage off
    fn all_bypassed() -> SharedState {
        let shared = SharedState::new();
        for id in StageId::ALL {
            shared.set_enabled(id, false);
        }
        shared
    }

    #[test]
    fn test_all_bypassed_is_identity() {
        let shared = all_bypassed();
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let input = sine(220.0);
        let mut buffer = input.clone();
        chain.process(&mut buffer, &shared);

        assert_eq!(buffer, input);
    }

    #[test]
    fn test_default_chain_is_transparent() {
        // Flat tone EQ and bypass cabinet
        let shared = SharedState::new();
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let input = sine(440.0);
        let mut buffer = input.clone();
        chain.process(&mut buffer, &shared);

        for (out, inp) in buffer.iter().zip(&input) {
            assert!((out - inp).abs() < 1e-4);
        }
    }

    #[test]
    fn test_control_write_is_rederived() {
        let shared = all_bypassed();
        shared.set_enabled(StageId::Distortion, true);
        shared.set_control(StageId::Distortion, 0, 0.0);
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let mut clean = sine(220.0);
        chain.process(&mut clean, &shared);

        shared.set_control(StageId::Distortion, 0, 1.0);
        let mut driven = sine(220.0);
        chain.process(&mut driven, &shared);

        let peak = |b: &[f32]| b.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        assert!(peak(&driven) > peak(&clean) + 0.2);
    }

    /// Stages that keep memory between buffers, with controls that make it audible
    fn stateful_stages() -> Vec<(StageId, Vec<(usize, f32)>)> {
        vec![
            (StageId::Gate, vec![(0, 0.5)]),
            (StageId::Compressor, vec![(0, 1.0), (1, 0.6)]),
            (StageId::ToneEq, vec![(0, 1.0), (1, 0.2), (2, 0.9)]),
            (StageId::Modulation, vec![(0, 0.5), (1, 1.0)]),
            (StageId::Cabinet, vec![]),
            (StageId::Delay, vec![(0, 0.01), (1, 0.6), (2, 1.0)]),
            (StageId::Reverb, vec![(0, 1.0)]),
        ]
    }

    fn chain_with(stage: StageId, controls: &[(usize, f32)]) -> (SharedState, SignalChain) {
        let shared = all_bypassed();
        shared.set_enabled(stage, true);
        shared.set_cabinet(find_preset("Vintage 4x12").unwrap());
        shared.set_modulation_type(ModulationType::Flanger);
        shared.publish_lfo_output(
            ModulationType::Flanger,
            ModulationType::Flanger.derive(0.5, 1.0),
        );
        for &(slot, value) in controls {
            shared.set_control(stage, slot, value);
        }
        let chain = SignalChain::new(&config(), &shared).unwrap();
        (shared, chain)
    }

    #[test]
    fn test_bypass_idempotence() {
        let input = sine(330.0);

        for (stage, controls) in stateful_stages() {
            let (shared, mut chain) = chain_with(stage, &controls);

            let mut first = input.clone();
            chain.process(&mut first, &shared);

            // Disabling clears the stage's memory
            shared.set_enabled(stage, false);
            let mut bypassed = sine(110.0);
            chain.process(&mut bypassed, &shared);
            assert_eq!(bypassed, sine(110.0), "{} should pass through", stage);

            shared.set_enabled(stage, true);
            let mut second = input.clone();
            chain.process(&mut second, &shared);

            assert_eq!(first, second, "{} kept state across bypass", stage);
        }
    }

    #[test]
    fn test_bypass_between_buffers_still_clears() {
        let input = sine(330.0);

        for (stage, controls) in stateful_stages() {
            let (shared, mut chain) = chain_with(stage, &controls);

            let mut first = input.clone();
            chain.process(&mut first, &shared);

            // Both toggles land before the next buffer
            shared.set_enabled(stage, false);
            shared.set_enabled(stage, true);

            let mut second = input.clone();
            chain.process(&mut second, &shared);
            assert_eq!(first, second, "{} kept state across a quick bypass", stage);
        }
    }

    #[test]
    fn test_quick_bypass_silences_delay_tail() {
        let shared = all_bypassed();
        shared.set_enabled(StageId::Delay, true);
        shared.set_control(StageId::Delay, 0, 0.01);
        shared.set_control(StageId::Delay, 1, 0.9);
        shared.set_control(StageId::Delay, 2, 1.0);
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let mut loud = vec![0.5; 512];
        chain.process(&mut loud, &shared);

        shared.set_enabled(StageId::Delay, false);
        shared.set_enabled(StageId::Delay, true);

        let mut silence = vec![0.0; 512];
        chain.process(&mut silence, &shared);
        assert!(silence.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_chain_at_lowest_sample_rate() {
        let config = StreamConfig {
            sample_rate: 8000,
            block_size: 256,
        };
        config.validate().unwrap();

        let shared = SharedState::new();
        for id in StageId::ALL {
            shared.set_enabled(id, true);
        }
        shared.set_control(StageId::ToneEq, 2, 1.0);
        shared.set_cabinet(find_preset("Modern 4x12").unwrap());
        let mut chain = SignalChain::new(&config, &shared).unwrap();

        let mut buffer: Vec<f32> = (0..256)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin() * 0.5)
            .collect();
        chain.process(&mut buffer, &shared);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_nan_control_never_reaches_audio() {
        let shared = SharedState::new();
        for id in StageId::ALL {
            shared.set_enabled(id, true);
            for slot in 0..id.controls().len() {
                shared.set_control(id, slot, f32::NAN);
            }
        }
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let mut buffer = sine(196.0);
        chain.process(&mut buffer, &shared);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_disabling_modulation_restores_bypass_state() {
        let shared = all_bypassed();
        shared.set_enabled(StageId::Modulation, true);
        shared.set_modulation_type(ModulationType::Tremolo);
        shared.publish_lfo_output(
            ModulationType::Tremolo,
            ModulationOutput {
                delay_ms: 0.0,
                amplitude: 0.2,
            },
        );
        let mut chain = SignalChain::new(&config(), &shared).unwrap();

        let mut buffer = sine(220.0);
        chain.process(&mut buffer, &shared);
        assert!(chain.modulation().amplitude() < 0.5);

        shared.set_enabled(StageId::Modulation, false);
        let mut buffer = sine(220.0);
        chain.process(&mut buffer, &shared);

        assert_eq!(chain.modulation().amplitude(), 1.0);
        assert_eq!(chain.modulation().delay_ms(), 0.0);
        assert_eq!(buffer, sine(220.0));
    }

    #[test]
    fn test_cabinet_switch_is_atomic() {
        let preset_a = find_preset("Vintage 4x12").unwrap();
        let preset_b = find_preset("8x10 Bass").unwrap();
        let input = sine(2500.0);

        let render = |preset: usize| {
            let shared = all_bypassed();
            shared.set_enabled(StageId::Cabinet, true);
            shared.set_cabinet(preset);
            let mut chain = SignalChain::new(&config(), &shared).unwrap();
            let mut buffer = input.clone();
            chain.process(&mut buffer, &shared);
            buffer
        };
        let expected_a = render(preset_a);
        let expected_b = render(preset_b);
        assert_ne!(expected_a, expected_b);

        let shared = Arc::new(all_bypassed());
        shared.set_enabled(StageId::Cabinet, true);
        shared.set_cabinet(preset_a);
        let done = Arc::new(AtomicBool::new(false));

        let flipper = {
            let shared = Arc::clone(&shared);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut use_b = false;
                while !done.load(Ordering::Relaxed) {
                    use_b = !use_b;
                    shared.set_cabinet(if use_b { preset_b } else { preset_a });
                    thread::yield_now();
                }
            })
        };

        let mut chain = SignalChain::new(&config(), &shared).unwrap();
        let mut seen_a = false;
        let mut seen_b = false;
        for _ in 0..400 {
            chain.reset();
            let mut buffer = input.clone();
            chain.process(&mut buffer, &shared);

            if buffer == expected_a {
                seen_a = true;
            } else if buffer == expected_b {
                seen_b = true;
            } else {
                panic!("buffer mixed bands from two presets");
            }
        }

        done.store(true, Ordering::Relaxed);
        flipper.join().unwrap();
        assert!(seen_a || seen_b);
    }
}
