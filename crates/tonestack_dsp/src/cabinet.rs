//! Cabinet Model Bank
//!
//! Every catalog preset gets its own filter cascade, built once when the
//! bank is created. Switching presets only moves the active index, so the
//! audio thread never rebuilds filters and a block is always rendered by
//! exactly one preset.

use biquad::{Biquad, DirectForm2Transposed};

use crate::eq::{build_filter, fit_band};
use crate::error::DspError;
use crate::presets::{find_preset, CABINET_PRESETS};
use crate::processor::{ProcessContext, Stage};

/// Speaker cabinet simulator holding prepared filters for every preset
pub struct Cabinet {
    banks: Vec<Vec<DirectForm2Transposed<f32>>>,
    active: usize,
}

impl Cabinet {
    /// Build filters for the whole catalog; starts on bypass
    ///
    /// Allocates. Call at engine construction or reinitialisation only.
    pub fn new(sample_rate: f32) -> Result<Self, DspError> {
        let banks = CABINET_PRESETS
            .iter()
            .map(|(_, bands)| {
                bands
                    .iter()
                    .map(|band| build_filter(fit_band(*band, sample_rate), sample_rate))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { banks, active: 0 })
    }

    /// Number of presets in the catalog
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Make `index` the active preset
    ///
    /// Returns false for an out-of-range index. Filter memory of the newly
    /// selected preset starts from silence.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.banks.len() {
            return false;
        }
        if index != self.active {
            for filter in self.banks[index].iter_mut() {
                filter.reset_state();
            }
            self.active = index;
        }
        true
    }

    /// Select a preset by catalog name
    pub fn select_by_name(&mut self, name: &str) -> Result<(), DspError> {
        let index = find_preset(name).ok_or_else(|| DspError::UnknownPreset(name.to_string()))?;
        self.select(index);
        Ok(())
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_name(&self) -> &'static str {
        CABINET_PRESETS[self.active].0
    }
}

impl Stage for Cabinet {
    fn process(&mut self, buffer: &mut [f32], _context: &ProcessContext) {
        let bank = &mut self.banks[self.active];
        if bank.is_empty() {
            return;
        }
        for sample in buffer.iter_mut() {
            let mut out = *sample;
            for filter in bank.iter_mut() {
                out = filter.run(out);
            }
            *sample = out;
        }
    }

    fn reset(&mut self) {
        for filter in self.banks.iter_mut().flatten() {
            filter.reset_state();
        }
    }

    fn name(&self) -> &'static str {
        "Cabinet"
    }
}
