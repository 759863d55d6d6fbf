//! Configuration management for the bridge
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::addressing::{Layout, Row, COLUMNS, GRID_BUTTONS};
use crate::display::DisplayConfig;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub physical: PhysicalPortConfig,
    #[serde(rename = "virtual", default)]
    pub virtual_port: VirtualPortConfig,
    #[serde(default)]
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<DisplayConfig>,
}

/// Hardware controller ports
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PhysicalPortConfig {
    #[serde(default = "default_physical_port")]
    pub input_port: String,
    #[serde(default = "default_physical_port")]
    pub output_port: String,
}

/// Software-facing ports
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VirtualPortConfig {
    #[serde(default = "default_virtual_port")]
    pub input_port: String,
    #[serde(default = "default_virtual_port")]
    pub output_port: String,
    /// Create the ports instead of looking them up (Unix only)
    #[serde(default)]
    pub create_virtual: bool,
}

impl Default for PhysicalPortConfig {
    fn default() -> Self {
        Self {
            input_port: default_physical_port(),
            output_port: default_physical_port(),
        }
    }
}

impl Default for VirtualPortConfig {
    fn default() -> Self {
        Self {
            input_port: default_virtual_port(),
            output_port: default_virtual_port(),
            create_virtual: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml(&contents).with_context(|| format!("Invalid config file: {}", path))
    }

    /// Load the file if it exists, built-in defaults otherwise
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            warn!("Config file '{}' not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// True when two configs need different ports (reload cannot apply that live)
    pub fn ports_differ(&self, other: &AppConfig) -> bool {
        self.physical != other.physical || self.virtual_port != other.virtual_port
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.physical.input_port.is_empty() {
            anyhow::bail!("physical.input_port cannot be empty");
        }
        if self.physical.output_port.is_empty() {
            anyhow::bail!("physical.output_port cannot be empty");
        }
        if self.virtual_port.input_port.is_empty() {
            anyhow::bail!("virtual.input_port cannot be empty");
        }
        if self.virtual_port.output_port.is_empty() {
            anyhow::bail!("virtual.output_port cannot be empty");
        }

        self.validate_layout().context("Invalid layout")?;

        if let Some(display) = &self.display {
            if let Some(byte) = display.vendor_id.iter().find(|b| **b > 0x7F) {
                anyhow::bail!("display.vendor_id byte {:#04X} is not 7-bit", byte);
            }
        }

        Ok(())
    }

    fn validate_layout(&self) -> Result<()> {
        let layout = &self.layout;

        let specials = [
            ("bank_left_note", layout.bank_left_note),
            ("bank_right_note", layout.bank_right_note),
            ("solo_note", layout.solo_note),
        ];
        let mut seen = HashSet::new();
        for (name, note) in specials {
            if note > 127 {
                anyhow::bail!("{} {} is invalid (must be 0-127)", name, note);
            }
            if (1..=GRID_BUTTONS).contains(&note) {
                anyhow::bail!("{} {} collides with grid buttons 1-{}", name, note, GRID_BUTTONS);
            }
            if !seen.insert(note) {
                anyhow::bail!("{} {} is used by another button", name, note);
            }
        }

        let mut bands: Vec<(Row, u16)> = Row::ALL
            .iter()
            .map(|row| (*row, layout.band_start(*row)))
            .collect();
        for (row, start) in &bands {
            let end = start + COLUMNS as u16 - 1;
            if end > 127 {
                anyhow::bail!("{} band {}-{} exceeds CC 127", row, start, end);
            }
        }

        bands.sort_by_key(|(_, start)| *start);
        for pair in bands.windows(2) {
            let (low_row, low_start) = pair[0];
            let (high_row, high_start) = pair[1];
            if low_start + COLUMNS as u16 > high_start {
                anyhow::bail!("{} band overlaps {} band", low_row, high_row);
            }
        }

        if layout.solo_cc_offset == 0 || layout.solo_cc_offset > 127 {
            anyhow::bail!(
                "solo_cc_offset {} is invalid (must be 1-127)",
                layout.solo_cc_offset
            );
        }

        if layout.feedback_channel > 15 {
            anyhow::bail!(
                "feedback_channel {} is invalid (must be 0-15)",
                layout.feedback_channel
            );
        }

        Ok(())
    }
}

// Default value functions
fn default_physical_port() -> String { "MIDI Mix".to_string() }
fn default_virtual_port() -> String { "MIDI Mix Bridge".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.physical.input_port, "MIDI Mix");
        assert_eq!(config.virtual_port.output_port, "MIDI Mix Bridge");
        assert_eq!(config.layout, Layout::default());
        assert!(config.display.is_none());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
physical:
  input_port: "MIDI Mix 1"
  output_port: "MIDI Mix 2"
virtual:
  input_port: "loopMIDI In"
  output_port: "loopMIDI Out"
  create_virtual: true
layout:
  mute_base: 16
  record_offset: 16
  solo_offset: 8
  solo_cc_offset: 32
display:
  vendor_id: [0, 32, 50]
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.physical.output_port, "MIDI Mix 2");
        assert!(config.virtual_port.create_virtual);
        assert_eq!(config.layout.band_start(Row::Record), 32);
        assert_eq!(config.layout.band_start(Row::Solo), 24);
        assert_eq!(config.layout.bank_left_note, 25);
        let display = config.display.unwrap();
        assert_eq!(display.vendor_id, [0, 32, 50]);
        assert_eq!(display.text_command, 0x12);
    }

    #[test]
    fn test_rejects_empty_port() {
        let err = AppConfig::from_yaml("physical:\n  input_port: \"\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("physical.input_port"));
    }

    #[test]
    fn test_rejects_overlapping_bands() {
        let err = AppConfig::from_yaml("layout:\n  record_offset: 4\n").unwrap_err();
        assert!(format!("{:#}", err).contains("overlaps"));
    }

    #[test]
    fn test_rejects_band_past_127() {
        let err = AppConfig::from_yaml("layout:\n  mute_base: 100\n").unwrap_err();
        assert!(format!("{:#}", err).contains("exceeds CC 127"));
    }

    #[test]
    fn test_rejects_special_note_on_grid() {
        let err = AppConfig::from_yaml("layout:\n  solo_note: 12\n").unwrap_err();
        assert!(format!("{:#}", err).contains("collides with grid"));

        let err = AppConfig::from_yaml("layout:\n  bank_right_note: 25\n").unwrap_err();
        assert!(format!("{:#}", err).contains("used by another button"));
    }

    #[test]
    fn test_rejects_bad_display_vendor() {
        let err = AppConfig::from_yaml("display:\n  vendor_id: [0, 128, 1]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("vendor_id"));
    }

    #[test]
    fn test_ports_differ() {
        let config = AppConfig::default();
        let mut other = config.clone();
        other.layout.mute_base = 0;
        assert!(!config.ports_differ(&other));

        other.virtual_port.create_virtual = true;
        assert!(config.ports_differ(&other));
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");
        let path = path.to_string_lossy().to_string();

        let mut config = AppConfig::default();
        config.layout.solo_cc_offset = 32;
        config.display = Some(DisplayConfig::default());
        config.save(&path).await?;

        assert_eq!(AppConfig::load(&path).await?, config);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_or_default_missing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("missing.yaml");

        let config = AppConfig::load_or_default(&path.to_string_lossy()).await?;
        assert_eq!(config, AppConfig::default());
        Ok(())
    }
}
