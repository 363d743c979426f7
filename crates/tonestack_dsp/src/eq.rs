//! Filter Bands and the 3-Band Tone EQ
//!
//! Implements a cascade of BiQuad filters for tone shaping.
//! Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::error::DspError;
use crate::mapping::octaves_to_q;
use crate::processor::{ProcessContext, Stage};

/// Tone EQ center frequencies (Hz): bass, mid, treble
pub const TONE_BANDS: [f32; 3] = [100.0, 1000.0, 5000.0];

/// Tone EQ bandwidth in octaves
pub const TONE_BANDWIDTH_OCTAVES: f32 = 1.0;

/// Band frequencies are pulled below Nyquist at low sample rates
const MAX_BAND_FRACTION: f32 = 0.45;

/// Filter response of a single band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    Parametric,
}

/// Single filter band description
///
/// `width` is a Q for low/high-pass bands and a bandwidth in octaves for
/// parametric bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterBand {
    pub kind: FilterKind,
    pub frequency: f32,
    pub gain_db: f32,
    pub width: f32,
}

impl FilterBand {
    pub const fn low_pass(frequency: f32, q: f32) -> Self {
        Self {
            kind: FilterKind::LowPass,
            frequency,
            gain_db: 0.0,
            width: q,
        }
    }

    pub const fn high_pass(frequency: f32, q: f32) -> Self {
        Self {
            kind: FilterKind::HighPass,
            frequency,
            gain_db: 0.0,
            width: q,
        }
    }

    pub const fn parametric(frequency: f32, gain_db: f32, octaves: f32) -> Self {
        Self {
            kind: FilterKind::Parametric,
            frequency,
            gain_db,
            width: octaves,
        }
    }

    /// Generate BiQuad coefficients for this band
    pub fn to_coefficients(self, sample_rate: f32) -> Result<Coefficients<f32>, DspError> {
        if !(sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let freq = self.frequency.hz();
        let fs = sample_rate.hz();

        let coeffs = match self.kind {
            FilterKind::LowPass => {
                Coefficients::<f32>::from_params(Type::LowPass, fs, freq, self.width)
            }
            FilterKind::HighPass => {
                Coefficients::<f32>::from_params(Type::HighPass, fs, freq, self.width)
            }
            FilterKind::Parametric => Coefficients::<f32>::from_params(
                Type::PeakingEQ(self.gain_db),
                fs,
                freq,
                octaves_to_q(self.width),
            ),
        };

        coeffs.map_err(|_| DspError::InvalidCoefficients {
            frequency: self.frequency,
            sample_rate,
        })
    }
}

/// Clamp a band's frequency so it stays valid at `sample_rate`
pub(crate) fn fit_band(band: FilterBand, sample_rate: f32) -> FilterBand {
    FilterBand {
        frequency: band.frequency.min(sample_rate * MAX_BAND_FRACTION),
        ..band
    }
}

/// Build a filter with fresh state for a band
pub(crate) fn build_filter(
    band: FilterBand,
    sample_rate: f32,
) -> Result<DirectForm2Transposed<f32>, DspError> {
    Ok(DirectForm2Transposed::<f32>::new(
        band.to_coefficients(sample_rate)?,
    ))
}

/// Three fixed parametric bands (bass / mid / treble) with adjustable gain
///
/// Designed for real-time use: no allocations in `process()`, and gain
/// updates only recompute coefficients.
pub struct ToneEq {
    filters: [DirectForm2Transposed<f32>; 3],
    bands: [FilterBand; 3],
    sample_rate: f32,
}

impl ToneEq {
    /// Create a flat tone EQ
    pub fn new(sample_rate: f32) -> Result<Self, DspError> {
        let bands = core::array::from_fn(|i| {
            fit_band(
                FilterBand::parametric(TONE_BANDS[i], 0.0, TONE_BANDWIDTH_OCTAVES),
                sample_rate,
            )
        });

        let filters = [
            build_filter(bands[0], sample_rate)?,
            build_filter(bands[1], sample_rate)?,
            build_filter(bands[2], sample_rate)?,
        ];

        Ok(Self {
            filters,
            bands,
            sample_rate,
        })
    }

    /// Set the gains (dB) of bass, mid and treble
    ///
    /// Filter memory is kept so a knob turn doesn't click.
    pub fn set_gains(&mut self, gains_db: [f32; 3]) -> Result<(), DspError> {
        for (i, gain_db) in gains_db.into_iter().enumerate() {
            if self.bands[i].gain_db == gain_db {
                continue;
            }
            let band = FilterBand {
                gain_db,
                ..self.bands[i]
            };
            let coeffs = band.to_coefficients(self.sample_rate)?;
            self.filters[i].update_coefficients(coeffs);
            self.bands[i] = band;
        }
        Ok(())
    }

    pub fn gains(&self) -> [f32; 3] {
        core::array::from_fn(|i| self.bands[i].gain_db)
    }

    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let mut out = sample;
        for filter in self.filters.iter_mut() {
            out = filter.run(out);
        }
        out
    }
}

impl Stage for ToneEq {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset_state();
        }
    }

    fn name(&self) -> &'static str {
        "Tone EQ"
    }
}
