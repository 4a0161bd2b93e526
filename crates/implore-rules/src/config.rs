//! Process configuration
//!
//! Loaded from TOML; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RuleError, RuleResult};

/// Which ledger entry wins when several share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupOrder {
    /// The earliest entry with the name (seeded values shadow later outputs)
    #[default]
    FirstMatch,
    /// The most recent entry with the name
    LastMatch,
}

/// Configuration shared by a process and every rule it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Fail on a mistyped primary input instead of skipping the rule
    pub strict_input_types: bool,

    pub lookup: LookupOrder,

    /// Upper bound on pairwise distance computations per rule run
    pub max_distance_pairs: Option<usize>,

    /// Dihedral angle above which an interior edge counts as a feature edge
    pub silhouette_threshold_degrees: f64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            strict_input_types: true,
            lookup: LookupOrder::FirstMatch,
            max_distance_pairs: None,
            silhouette_threshold_degrees: 1.0,
        }
    }
}

impl ProcessConfig {
    pub fn from_toml_str(text: &str) -> RuleResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| RuleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> RuleResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> RuleResult<()> {
        if !self.silhouette_threshold_degrees.is_finite() || self.silhouette_threshold_degrees < 0.0 {
            return Err(RuleError::Config(format!(
                "silhouette_threshold_degrees must be a non-negative angle, got {}",
                self.silhouette_threshold_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ProcessConfig::default();
        assert!(config.strict_input_types);
        assert_eq!(config.lookup, LookupOrder::FirstMatch);
        assert_eq!(config.max_distance_pairs, None);
        assert_eq!(config.silhouette_threshold_degrees, 1.0);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ProcessConfig::from_toml_str(
            r#"
            lookup = "last-match"
            max_distance_pairs = 10000
            "#,
        )
        .unwrap();
        assert_eq!(config.lookup, LookupOrder::LastMatch);
        assert_eq!(config.max_distance_pairs, Some(10_000));
        assert!(config.strict_input_types);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ProcessConfig::from_toml_str("lookup = \"random\""),
            Err(RuleError::Config(_))
        ));
        assert!(ProcessConfig::from_toml_str("silhouette_threshold_degrees = -5.0").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict_input_types = false").unwrap();
        let config = ProcessConfig::load(file.path()).unwrap();
        assert!(!config.strict_input_types);

        assert!(matches!(
            ProcessConfig::load("/nonexistent/process.toml"),
            Err(RuleError::Io(_))
        ));
    }
}
