//! Configuration management for the dashboard engine
//!
//! Engine settings cover layout size limits, the undo log bound, event channel
//! sizing and store verification. Loaded from a TOML file, every field falls
//! back to its default when absent.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{DashError, Result};

/// Number of columns in the dashboard grid
pub const GRID_COLUMNS: u32 = 12;

/// Engine-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Size limits for layout items
    #[serde(default)]
    pub layout: LayoutLimits,

    /// Undo log settings
    #[serde(default)]
    pub undo: UndoConfig,

    /// Event channel settings
    #[serde(default)]
    pub events: EventsConfig,

    /// Store settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Inclusive grid size limits enforced by resize commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutLimits {
    #[serde(default = "default_min_height")]
    pub min_height: u32,

    #[serde(default = "default_max_height")]
    pub max_height: u32,

    #[serde(default = "default_min_width")]
    pub min_width: u32,

    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

/// Undo log settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoConfig {
    /// Maximum entries kept on each of the undo and redo stacks
    #[serde(default = "default_undo_limit")]
    pub limit: usize,
}

/// Event channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast channel capacity; slow subscribers lag past this
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,

    /// Emitted events retained for inspection
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Run the invariant checker after every mutation
    #[serde(default = "default_verify_invariants")]
    pub verify_invariants: bool,
}

// Default value providers
fn default_min_height() -> u32 {
    1
}

fn default_max_height() -> u32 {
    40
}

fn default_min_width() -> u32 {
    1
}

fn default_max_width() -> u32 {
    GRID_COLUMNS
}

fn default_undo_limit() -> usize {
    50
}

fn default_event_capacity() -> usize {
    256
}

fn default_history_limit() -> usize {
    1000
}

fn default_verify_invariants() -> bool {
    true
}

impl EngineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DashError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded engine config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML file, or use defaults if it doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `path`
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| DashError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject limits that no size could satisfy
    pub fn validate(&self) -> Result<()> {
        let l = &self.layout;
        if l.min_height == 0 || l.min_height > l.max_height {
            return Err(DashError::Config(format!(
                "height limits {}..={} are empty",
                l.min_height, l.max_height
            )));
        }
        if l.min_width == 0 || l.min_width > l.max_width || l.max_width > GRID_COLUMNS {
            return Err(DashError::Config(format!(
                "width limits {}..={} must lie within 1..={}",
                l.min_width, l.max_width, GRID_COLUMNS
            )));
        }
        if self.events.capacity == 0 {
            return Err(DashError::Config("event capacity must be positive".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: LayoutLimits::default(),
            undo: UndoConfig::default(),
            events: EventsConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for LayoutLimits {
    fn default() -> Self {
        Self {
            min_height: default_min_height(),
            max_height: default_max_height(),
            min_width: default_min_width(),
            max_width: default_max_width(),
        }
    }
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            limit: default_undo_limit(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            verify_invariants: default_verify_invariants(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [layout]
            max_height = 20

            [undo]
            limit = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.max_height, 20);
        assert_eq!(config.layout.min_height, 1);
        assert_eq!(config.layout.max_width, GRID_COLUMNS);
        assert_eq!(config.undo.limit, 5);
        assert!(config.store.verify_invariants);
    }

    #[test]
    fn test_rejects_empty_height_range() {
        let err = EngineConfig::from_toml_str("[layout]\nmin_height = 10\nmax_height = 2\n")
            .unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("[layout\n").is_err());
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf/engine.toml");

        EngineConfig::write_default(&path).unwrap();
        let loaded = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, EngineConfig::default());
    }

    #[test]
    fn test_missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let loaded = EngineConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.undo.limit, 50);
    }
}
