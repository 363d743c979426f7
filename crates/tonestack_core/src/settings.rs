//! Rig Settings (user presets)
//!
//! A rig is a complete snapshot of the chain: every stage's enable flag and
//! normalised controls, the cabinet preset and the modulation type. Rigs are
//! stored as JSON.
//!
//! # Storage Locations
//! - Linux: `~/.config/tonestack/rig.json`
//! - Windows: `%APPDATA%\tonestack\rig.json`
//! - macOS: `~/Library/Application Support/com.tonestack.tonestack/rig.json`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{EngineError, EngineResult};
use crate::stage::StageId;

/// One stage's saved state
///
/// Names are kept as strings so a rig from a newer version still loads;
/// unknown entries are reported when the rig is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
    pub stage: String,
    pub enabled: bool,
    #[serde(default)]
    pub controls: BTreeMap<String, f32>,
}

/// A saved rig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigSettings {
    pub name: String,
    pub stages: Vec<StageSettings>,
    #[serde(default = "default_cabinet")]
    pub cabinet: String,
    #[serde(default = "default_modulation")]
    pub modulation: String,
    pub saved_at: DateTime<Utc>,
}

fn default_cabinet() -> String {
    "Bypass".to_string()
}

fn default_modulation() -> String {
    "chorus".to_string()
}

impl Default for RigSettings {
    /// The factory rig: every stage at its default position
    fn default() -> Self {
        let stages = StageId::ALL
            .into_iter()
            .map(|id| StageSettings {
                stage: id.as_str().to_string(),
                enabled: id.enabled_by_default(),
                controls: id
                    .controls()
                    .iter()
                    .map(|spec| (spec.name.to_string(), spec.default))
                    .collect(),
            })
            .collect();

        Self::new("Default", stages, &default_cabinet(), &default_modulation())
    }
}

impl RigSettings {
    /// Create a rig stamped with the current time
    pub fn new(name: &str, stages: Vec<StageSettings>, cabinet: &str, modulation: &str) -> Self {
        Self {
            name: name.to_string(),
            stages,
            cabinet: cabinet.to_string(),
            modulation: modulation.to_string(),
            saved_at: Utc::now(),
        }
    }

    /// Saved state for `stage`, if present
    pub fn stage(&self, stage: StageId) -> Option<&StageSettings> {
        self.stages.iter().find(|s| s.stage == stage.as_str())
    }

    /// Load a rig from `path`
    pub fn load(path: &Path) -> EngineResult<Self> {
        let file = fs::File::open(path)
            .map_err(|e| EngineError::Settings(format!("{}: {}", path.display(), e)))?;
        let settings: Self = serde_json::from_reader(file)
            .map_err(|e| EngineError::Settings(format!("{}: {}", path.display(), e)))?;
        info!("Rig '{}' loaded from {:?}", settings.name, path);
        Ok(settings)
    }

    /// Load from `path`, or fall back to the factory rig if missing/corrupt
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(settings) => return settings,
                Err(e) => error!("Failed to load rig: {}", e),
            }
        }

        info!("Using default rig");
        Self::default()
    }

    /// Save to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::Settings(e.to_string()))?;
        }

        let file = fs::File::create(path).map_err(|e| EngineError::Settings(e.to_string()))?;
        serde_json::to_writer_pretty(file, self).map_err(|e| EngineError::Settings(e.to_string()))?;

        info!("Rig '{}' saved to {:?}", self.name, path);
        Ok(())
    }

    /// Get the platform-specific rig file path
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "tonestack", "tonestack")
            .map(|proj| proj.config_dir().join("rig.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("tonestack-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_rig() {
        let rig = RigSettings::default();
        assert_eq!(rig.stages.len(), StageId::ALL.len());
        assert_eq!(rig.cabinet, "Bypass");
        assert_eq!(rig.modulation, "chorus");

        let delay = rig.stage(StageId::Delay).unwrap();
        assert!(!delay.enabled);
        assert_eq!(delay.controls.get("mix"), Some(&0.35));
        assert!(rig.stage(StageId::ToneEq).unwrap().enabled);
    }

    #[test]
    fn test_rig_serialization_roundtrip() {
        let mut rig = RigSettings::default();
        rig.name = "Crunch".to_string();
        rig.cabinet = "Modern 4x12".to_string();
        rig.stages[2].enabled = true;
        rig.stages[2].controls.insert("drive".to_string(), 0.9);

        let json = serde_json::to_string_pretty(&rig).unwrap();
        let deserialized: RigSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized, rig);
    }

    #[test]
    fn test_missing_fields_default() {
        let json = r#"{
            "name": "Old",
            "stages": [{ "stage": "gate", "enabled": true }],
            "saved_at": "2024-01-01T00:00:00Z"
        }"#;

        let rig: RigSettings = serde_json::from_str(json).unwrap();
        assert_eq!(rig.cabinet, "Bypass");
        assert_eq!(rig.modulation, "chorus");
        assert!(rig.stages[0].controls.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("save_and_load/rig.json");
        let rig = RigSettings::default();

        rig.save(&path).unwrap();
        let loaded = RigSettings::load(&path).unwrap();
        assert_eq!(loaded, rig);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_path("does/not/exist.json");
        assert!(matches!(
            RigSettings::load(&path),
            Err(EngineError::Settings(_))
        ));
        assert_eq!(RigSettings::load_or_default(&path).name, "Default");
    }

    #[test]
    fn test_load_corrupt_file_falls_back() {
        let path = temp_path("corrupt/rig.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(RigSettings::load(&path).is_err());
        assert_eq!(RigSettings::load_or_default(&path).name, "Default");

        let _ = fs::remove_file(&path);
    }
}
