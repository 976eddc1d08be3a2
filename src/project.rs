use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sequencer::PatternStore;

const PROJECT_VERSION: u32 = 1;

/// Serializable snapshot of the user-authored state: tempo plus the
/// pattern's lanes and steps. Everything else is runtime state.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProjectData {
    pub version: u32,
    pub bpm: u32,
    pub pattern: PatternStore,
}

impl ProjectData {
    pub fn new(bpm: u32, pattern: PatternStore) -> Self {
        Self {
            version: PROJECT_VERSION,
            bpm,
            pattern,
        }
    }
}

/// Save the pattern and tempo to a .tgrid JSON file
pub fn save_project(data: &ProjectData, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize project")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Load a project from a .tgrid JSON file
pub fn load_project(path: &Path) -> Result<ProjectData> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let raw: Value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
    if version > PROJECT_VERSION {
        bail!(
            "Project version {} is newer than supported version {}",
            version,
            PROJECT_VERSION
        );
    }

    let data: ProjectData = serde_json::from_value(raw)
        .with_context(|| format!("Failed to parse project {}", path.display()))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_pattern_and_tempo() {
        let mut pattern = PatternStore::new(&["kick", "chime"], 8);
        pattern.toggle_step(0, 0);
        pattern.toggle_step(1, 5);
        pattern.set_note(1, 5, 19);

        let path = std::env::temp_dir().join("tonegrid_roundtrip_test.tgrid");
        save_project(&ProjectData::new(96, pattern), &path).unwrap();
        let loaded = load_project(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.bpm, 96);
        assert_eq!(loaded.pattern.step_count(), 8);
        assert!(loaded.pattern.get_step(0, 0).active);
        assert!(loaded.pattern.get_step(1, 5).active);
        assert_eq!(loaded.pattern.get_step(1, 5).note_index, 19);
        assert!(!loaded.pattern.get_step(0, 1).active);
    }

    #[test]
    fn newer_version_is_rejected() {
        let path = std::env::temp_dir().join("tonegrid_version_test.tgrid");
        std::fs::write(&path, r#"{"version": 99, "bpm": 120, "pattern": {}}"#).unwrap();
        let result = load_project(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
