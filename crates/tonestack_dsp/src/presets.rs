//! Built-in Cabinet Presets
//!
//! EQ approximations of speaker cabinets. These band tables are what
//! saved rigs refer to by name, so treat the numbers as frozen.

use crate::eq::FilterBand;

/// Named cabinet preset with its filter bands (empty = bypass)
pub type CabinetPreset = (&'static str, &'static [FilterBand]);

const Q: f32 = biquad::Q_BUTTERWORTH_F32;

/// List of built-in cabinet presets; index 0 is always bypass
pub const CABINET_PRESETS: &[CabinetPreset] = &[
    ("Bypass", &[]),
    (
        "Vintage 4x12",
        &[
            FilterBand::high_pass(80.0, Q),
            FilterBand::parametric(120.0, 3.0, 1.0),
            FilterBand::parametric(2500.0, 2.0, 1.5),
            FilterBand::low_pass(5000.0, Q),
        ],
    ),
    (
        "Modern 4x12",
        &[
            FilterBand::high_pass(70.0, Q),
            FilterBand::parametric(100.0, 4.0, 0.8),
            FilterBand::parametric(800.0, -3.0, 1.2), // Mid scoop
            FilterBand::low_pass(6500.0, Q),
            FilterBand::low_pass(9000.0, 0.5), // Steeper top end
        ],
    ),
    (
        "1x12 Combo",
        &[
            FilterBand::high_pass(100.0, Q),
            FilterBand::parametric(1800.0, 2.0, 1.0),
            FilterBand::low_pass(5500.0, Q),
        ],
    ),
    (
        "8x10 Bass",
        &[
            FilterBand::high_pass(40.0, Q),
            FilterBand::parametric(80.0, 5.0, 1.0),
            FilterBand::parametric(500.0, -2.0, 1.5),
            FilterBand::low_pass(4000.0, Q),
        ],
    ),
    (
        "Matched IR",
        &[
            FilterBand::high_pass(90.0, Q),
            FilterBand::parametric(150.0, 2.0, 1.0),
            FilterBand::parametric(3000.0, 4.0, 0.7),
            FilterBand::low_pass(7000.0, Q),
        ],
    ),
];

/// Most bands any preset uses
pub const MAX_CABINET_BANDS: usize = 5;

/// Find a preset index by name (case-insensitive)
pub fn find_preset(name: &str) -> Option<usize> {
    CABINET_PRESETS
        .iter()
        .position(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eq::FilterKind;

    #[test]
    fn test_bypass_has_no_bands() {
        assert_eq!(CABINET_PRESETS[0].0, "Bypass");
        assert!(CABINET_PRESETS[0].1.is_empty());
    }

    #[test]
    fn test_presets_engage_three_to_five_bands() {
        for (name, bands) in &CABINET_PRESETS[1..] {
            assert!(
                (3..=MAX_CABINET_BANDS).contains(&bands.len()),
                "{} has {} bands",
                name,
                bands.len()
            );
            let parametric = bands
                .iter()
                .filter(|b| b.kind == FilterKind::Parametric)
                .count();
            assert!((1..=2).contains(&parametric), "{} parametric count", name);
        }
    }

    #[test]
    fn test_find_preset() {
        assert_eq!(find_preset("Bypass"), Some(0));
        assert_eq!(find_preset("vintage 4x12"), Some(1));
        assert_eq!(find_preset("Mystery 2x12"), None);
    }
}
