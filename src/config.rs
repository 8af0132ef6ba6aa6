//! Persisted export settings (`strip-edl.json` in the config directory).
//!
//! Missing file -> defaults. Malformed file -> warning + defaults, so a bad
//! settings file never blocks an export.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::utils::sequences::{DiskProbe, ListingProbe, SequenceProbe};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "strip-edl.json";

/// Default log file name inside the data directory
pub const LOG_FILE: &str = "strip-edl.log";

/// How the offset resolver checks sequence membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Read each source directory once per run
    #[default]
    Listing,
    /// One existence check per candidate frame
    Disk,
}

impl ProbeMode {
    /// Fresh probe for one export run.
    pub fn build(self) -> Box<dyn SequenceProbe + Send + Sync> {
        match self {
            ProbeMode::Listing => Box::new(ListingProbe::new()),
            ProbeMode::Disk => Box::new(DiskProbe),
        }
    }
}

/// What a per-strip failure does to its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripFailurePolicy {
    /// Drop the strip, renumber the rest of the channel.
    #[default]
    SkipStrip,
    /// Write nothing for the channel.
    AbortChannel,
}

/// Export settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub default_title: String, // used when the timeline has no title
    pub probe: ProbeMode,
    pub strip_failure: StripFailurePolicy,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            default_title: "Untitled".to_string(),
            probe: ProbeMode::default(),
            strip_failure: StripFailurePolicy::default(),
        }
    }
}

impl ExportSettings {
    pub fn load(path: &Path) -> Self {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                debug!("No settings at {} ({}), using defaults", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring malformed settings {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// Title for a timeline: its own title if set, else the default.
    pub fn title_for<'a>(&'a self, timeline_title: &'a str) -> &'a str {
        if timeline_title.trim().is_empty() {
            &self.default_title
        } else {
            timeline_title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ExportSettings::load(&dir.path().join(SETTINGS_FILE));
        assert_eq!(settings, ExportSettings::default());
        assert_eq!(settings.probe, ProbeMode::Listing);
        assert_eq!(settings.strip_failure, StripFailurePolicy::SkipStrip);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"strip_failure": "abort_channel", "probe": "disk"}"#).unwrap();

        let settings = ExportSettings::load(&path);
        assert_eq!(settings.strip_failure, StripFailurePolicy::AbortChannel);
        assert_eq!(settings.probe, ProbeMode::Disk);
        assert_eq!(settings.default_title, "Untitled");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{{{").unwrap();
        assert_eq!(ExportSettings::load(&path), ExportSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = ExportSettings {
            default_title: "Dailies".into(),
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(ExportSettings::load(&path), settings);
    }

    #[test]
    fn test_title_for() {
        let settings = ExportSettings::default();
        assert_eq!(settings.title_for("Agent 327"), "Agent 327");
        assert_eq!(settings.title_for("  "), "Untitled");
    }
}
