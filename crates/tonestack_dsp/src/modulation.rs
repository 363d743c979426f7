//! Modulation Stage and LFO
//!
//! The LFO is a phase accumulator advanced by a coarse external clock
//! (the engine ticks it at 30 Hz), not by the audio sample count. Each tick
//! yields a [`ModulationOutput`] that the audio thread picks up once per
//! block and glides toward per sample.
//!
//! ```text
//! chorus:  delay = 15 ms + sin(phase) * (5..15 ms by depth)
//! flanger: delay =  3 ms + sin(phase) * (1..3 ms by depth)
//! tremolo: gain  = 1 - depth * (1 - (sin(phase) + 1) / 2)
//! ```

use std::f64::consts::TAU;

use crate::delay_line::DelayLine;
use crate::error::DspError;
use crate::processor::{ProcessContext, Stage};
use crate::smoothing::Smoother;

/// Longest modulated delay any type can ask for (chorus peak is 30 ms)
const MAX_MODULATION_DELAY_S: f32 = 0.04;

/// Glide time for per-block modulation targets
const MODULATION_SMOOTHING_MS: f32 = 20.0;

/// Flanger feeds part of its output back into the delay line
const FLANGER_FEEDBACK: f32 = 0.5;

/// Wet share of the chorus/flanger output
const MODULATION_WET: f32 = 0.5;

/// Mutually exclusive modulation effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModulationType {
    Chorus = 0,
    Flanger = 1,
    Tremolo = 2,
}

impl ModulationType {
    pub const ALL: [ModulationType; 3] = [
        ModulationType::Chorus,
        ModulationType::Flanger,
        ModulationType::Tremolo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModulationType::Chorus => "chorus",
            ModulationType::Flanger => "flanger",
            ModulationType::Tremolo => "tremolo",
        }
    }

    /// Case-insensitive lookup by name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Decode the value stored in an atomic; unknown values fall back to chorus
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ModulationType::Flanger,
            2 => ModulationType::Tremolo,
            _ => ModulationType::Chorus,
        }
    }

    /// Derive delay time and amplitude from one LFO sample (-1..1) and depth (0..1)
    pub fn derive(self, lfo_value: f32, depth: f32) -> ModulationOutput {
        let depth = crate::mapping::modulation_depth(depth);
        match self {
            ModulationType::Chorus => ModulationOutput {
                delay_ms: 15.0 + lfo_value * (5.0 + 10.0 * depth),
                amplitude: 1.0,
            },
            ModulationType::Flanger => ModulationOutput {
                delay_ms: 3.0 + lfo_value * (1.0 + 2.0 * depth),
                amplitude: 1.0,
            },
            ModulationType::Tremolo => ModulationOutput {
                delay_ms: 0.0,
                amplitude: 1.0 - depth * (1.0 - (lfo_value + 1.0) / 2.0),
            },
        }
    }
}

impl std::fmt::Display for ModulationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModulationType {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DspError::UnknownModulationType(s.to_string()))
    }
}

/// Parameters derived by one LFO tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationOutput {
    pub delay_ms: f32,
    pub amplitude: f32,
}

impl ModulationOutput {
    /// No delay, unity gain
    pub const NEUTRAL: ModulationOutput = ModulationOutput {
        delay_ms: 0.0,
        amplitude: 1.0,
    };
}

/// Sine LFO phase accumulator
///
/// Phase is kept in f64 so long sessions don't drift.
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    phase: f64,
}

impl Lfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick and return the new sine value
    ///
    /// Phase moves by `2π · rate_hz · tick_interval_s`, wrapped into [0, 2π).
    pub fn advance(&mut self, rate_hz: f32, tick_interval_s: f32) -> f32 {
        let step = TAU * rate_hz as f64 * tick_interval_s as f64;
        self.phase = (self.phase + step).rem_euclid(TAU);
        self.value()
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.phase.sin() as f32
    }

    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Chorus / flanger / tremolo stage driven by LFO outputs
pub struct ModulationStage {
    line: DelayLine,
    delay_ms: Smoother,
    amplitude: Smoother,
    kind: ModulationType,
    primed: bool,
}

impl ModulationStage {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            line: DelayLine::new(sample_rate, MAX_MODULATION_DELAY_S),
            delay_ms: Smoother::new(sample_rate, MODULATION_SMOOTHING_MS, 0.0),
            amplitude: Smoother::new(sample_rate, MODULATION_SMOOTHING_MS, 1.0),
            kind: ModulationType::Chorus,
            primed: false,
        }
    }

    /// Hand the latest LFO output to the stage (once per block)
    pub fn set_output(&mut self, kind: ModulationType, output: ModulationOutput) {
        if kind != self.kind {
            self.line.clear();
            self.kind = kind;
        }

        self.delay_ms.set_target(output.delay_ms.max(0.0));
        self.amplitude.set_target(output.amplitude.clamp(0.0, 1.0));

        if !self.primed {
            self.delay_ms.snap(self.delay_ms.target());
            self.amplitude.snap(self.amplitude.target());
            self.primed = true;
        }
    }

    pub fn kind(&self) -> ModulationType {
        self.kind
    }

    /// Current (smoothed) tremolo gain
    pub fn amplitude(&self) -> f32 {
        self.amplitude.value()
    }

    /// Current (smoothed) modulated delay in milliseconds
    pub fn delay_ms(&self) -> f32 {
        self.delay_ms.value()
    }
}

impl Stage for ModulationStage {
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext) {
        let samples_per_ms = context.sample_rate * 0.001;

        match self.kind {
            ModulationType::Chorus | ModulationType::Flanger => {
                let feedback = if self.kind == ModulationType::Flanger {
                    FLANGER_FEEDBACK
                } else {
                    0.0
                };
                for sample in buffer.iter_mut() {
                    let delay = self.delay_ms.next() * samples_per_ms;
                    let wet = self.line.read(delay);
                    self.line.write(*sample + wet * feedback);
                    *sample = *sample * (1.0 - MODULATION_WET) + wet * MODULATION_WET;
                }
            }
            ModulationType::Tremolo => {
                for sample in buffer.iter_mut() {
                    *sample *= self.amplitude.next();
                }
            }
        }
    }

    /// Drop back to bypass: unity gain, empty delay line
    fn reset(&mut self) {
        self.line.clear();
        self.delay_ms.snap(ModulationOutput::NEUTRAL.delay_ms);
        self.amplitude.snap(ModulationOutput::NEUTRAL.amplitude);
        self.primed = false;
    }

    fn name(&self) -> &'static str {
        "Modulation"
    }
}
