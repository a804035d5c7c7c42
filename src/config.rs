//! Reconciliation settings
//!
//! Every field has a default matching the lab's recording setup, so an empty
//! TOML file is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::comparator::DEFAULT_WARN_THRESHOLD_MS;
use crate::delimited::Delimiter;
use crate::error::ReconcileError;
use crate::photocell::{SentinelPolicy, DEVICE_PHOTOCELL_TAG, PRESENTATION_PHOTOCELL_TAG};

/// Event codes are truncated to this many characters by the device protocol
pub const DEFAULT_TAG_PREFIX_LEN: usize = 3;

/// Configuration for a [`Reconciler`](crate::pipeline::Reconciler)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Per-index differences at or above this are reported (ms)
    pub warn_threshold_ms: f64,
    /// Number of leading tag characters compared when matching event codes
    pub tag_prefix_len: usize,
    /// Level label kept from the presentation log
    pub presentation_label: String,
    /// Photocell code in the presentation log
    pub presentation_photocell_tag: String,
    /// Photocell channel code in the device log
    pub device_photocell_tag: String,
    /// Which device record is the closing sentinel
    pub sentinel: SentinelPolicy,
    /// Tag of the connectivity-check pulses
    pub auto_tag: String,
    /// Force a delimiter instead of detecting it from the file extension
    pub delimiter: Option<Delimiter>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            warn_threshold_ms: DEFAULT_WARN_THRESHOLD_MS,
            tag_prefix_len: DEFAULT_TAG_PREFIX_LEN,
            presentation_label: "data".to_string(),
            presentation_photocell_tag: PRESENTATION_PHOTOCELL_TAG.to_string(),
            device_photocell_tag: DEVICE_PHOTOCELL_TAG.to_string(),
            sentinel: SentinelPolicy::default(),
            auto_tag: "auto".to_string(),
            delimiter: None,
        }
    }
}

impl ReconcileConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ReconcileError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let text = fs::read_to_string(path).map_err(|source| ReconcileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if !(self.warn_threshold_ms.is_finite() && self.warn_threshold_ms > 0.0) {
            return Err(ReconcileError::Config(format!(
                "warn_threshold_ms must be a positive number, got {}",
                self.warn_threshold_ms
            )));
        }
        if self.tag_prefix_len == 0 {
            return Err(ReconcileError::Config(
                "tag_prefix_len must be at least 1".to_string(),
            ));
        }
        for (name, tag) in [
            ("presentation_photocell_tag", &self.presentation_photocell_tag),
            ("device_photocell_tag", &self.device_photocell_tag),
            ("auto_tag", &self.auto_tag),
        ] {
            if tag.is_empty() {
                return Err(ReconcileError::Config(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_is_default() {
        let config = ReconcileConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconcileConfig::default());
        assert_eq!(config.warn_threshold_ms, 15.0);
        assert_eq!(config.sentinel, SentinelPolicy::DropFinalRow);
    }

    #[test]
    fn test_partial_toml() {
        let config = ReconcileConfig::from_toml_str(
            r#"
            warn_threshold_ms = 8.5
            sentinel = "drop_final_photocell"
            delimiter = "tab"
            device_photocell_tag = "DIN1"
            "#,
        )
        .unwrap();

        assert_eq!(config.warn_threshold_ms, 8.5);
        assert_eq!(config.sentinel, SentinelPolicy::DropFinalPhotocell);
        assert_eq!(config.delimiter, Some(Delimiter::Tab));
        assert_eq!(config.device_photocell_tag, "DIN1");
        assert_eq!(config.tag_prefix_len, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ReconcileConfig::from_toml_str("warn_threshold_ms = 0.0"),
            Err(ReconcileError::Config(_))
        ));
        assert!(matches!(
            ReconcileConfig::from_toml_str("tag_prefix_len = 0"),
            Err(ReconcileError::Config(_))
        ));
        assert!(matches!(
            ReconcileConfig::from_toml_str("auto_tag = \"\""),
            Err(ReconcileError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            ReconcileConfig::from_toml_str("threshold = 3"),
            Err(ReconcileError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftcheck.toml");
        fs::write(&path, "presentation_label = \"exp\"\n").unwrap();

        let config = ReconcileConfig::load(&path).unwrap();
        assert_eq!(config.presentation_label, "exp");
    }
}
