//! TOML configuration.
//!
//! ```toml
//! [flow]
//! parallel = false
//! border_entries = false
//!
//! [search]
//! default_result_count = 20
//! max_distance = 35
//!
//! [resources]
//! order = ["Lustering Alloy", "Sheen Compound", "Heavy Water"]
//! ```
//!
//! Every key is optional; missing sections take compiled defaults.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StarGraphError};

pub const DEFAULT_RESULT_COUNT: usize = 20;
pub const DEFAULT_MAX_DISTANCE: u32 = 35;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StarGraphConfig {
    pub flow: FlowConfig,
    pub search: SearchConfig,
    pub resources: ResourceConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Analyse connected components on the rayon pool.
    pub parallel: bool,
    /// Treat positive-security systems bordering nullsec as entries.
    pub border_entries: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_result_count: usize,
    /// Hop limit for entry searches from an origin.
    pub max_distance: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_result_count: DEFAULT_RESULT_COUNT,
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Display order of resource types, also the last tie-break in ranking.
    pub order: Vec<String>,
}

impl StarGraphConfig {
    /// Load a config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path)
            .map_err(StarGraphError::from)
            .and_then(|text| Self::from_toml_str(&text))
        {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Parse and validate a config document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StarGraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.default_result_count == 0 {
            return Err(StarGraphError::Config(
                "search.default_result_count must be greater than 0".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.resources.order {
            if !seen.insert(name.as_str()) {
                return Err(StarGraphError::Config(format!(
                    "resources.order lists {:?} twice",
                    name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StarGraphConfig::default();
        assert!(!config.flow.parallel);
        assert!(!config.flow.border_entries);
        assert_eq!(config.search.default_result_count, 20);
        assert_eq!(config.search.max_distance, 35);
        assert!(config.resources.order.is_empty());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = StarGraphConfig::from_toml_str(
            r#"
            [flow]
            parallel = true

            [resources]
            order = ["Heavy Water", "Ice"]
            "#,
        )
        .unwrap();
        assert!(config.flow.parallel);
        assert!(!config.flow.border_entries);
        assert_eq!(config.search.max_distance, 35);
        assert_eq!(config.resources.order, vec!["Heavy Water", "Ice"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = StarGraphConfig::from_toml_str("[search]\ndefault_result_count = 0\n");
        assert!(matches!(err, Err(StarGraphError::Config(_))));

        let err = StarGraphConfig::from_toml_str("[resources]\norder = [\"Ice\", \"Ice\"]\n");
        assert!(matches!(err, Err(StarGraphError::Config(_))));

        let err = StarGraphConfig::from_toml_str("[flow]\nparallel = \"yes\"\n");
        assert!(matches!(err, Err(StarGraphError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nmax_distance = 12").unwrap();
        let config = StarGraphConfig::load(file.path());
        assert_eq!(config.search.max_distance, 12);
    }

    #[test]
    fn test_load_falls_back_on_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("stargraph.toml");
        assert_eq!(StarGraphConfig::load(&missing), StarGraphConfig::default());

        std::fs::write(&missing, "[search\nmax_distance = ").unwrap();
        assert_eq!(StarGraphConfig::load(&missing), StarGraphConfig::default());
    }
}
