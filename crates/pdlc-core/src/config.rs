use crate::error::{PdlcError, Result};
use crate::gate::{GateCheck, GateConfiguration};
use crate::io::atomic_write;
use crate::paths::config_path;
use crate::track::TrackWeights;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

fn default_version() -> u32 {
    1
}

fn default_stale_after_days() -> u32 {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Engine configuration, stored at `.pdlc/config.yaml`. Every knob has a
/// default so a bare `project:` stanza is a valid file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub weights: TrackWeights,
    /// Days without a manifest write before a record counts as stale.
    /// Zero disables staleness checks.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,
    #[serde(default)]
    pub gates: GateConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

impl EngineConfig {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            weights: TrackWeights::default(),
            stale_after_days: default_stale_after_days(),
            gates: GateConfiguration::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = config_path(root);
        if !path.exists() {
            return Err(PdlcError::NotInitialized);
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: EngineConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        atomic_write(&config_path(root), yaml.as_bytes())?;
        Ok(())
    }

    /// Hard-fails on weights that cannot be used; everything else is
    /// reported as a warning so an odd config never bricks a project.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>> {
        self.weights.validate()?;

        let mut warnings = Vec::new();
        let mut seen = BTreeSet::new();
        for gate in &self.gates.gates {
            if gate.name.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "gate with empty name".to_string(),
                });
                continue;
            }
            if !seen.insert(gate.name.clone()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("duplicate gate name: {}", gate.name),
                });
            }
            if let GateCheck::MinTrackVersion { min: 0, .. } = gate.check {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("gate {} always passes (min version 0)", gate.name),
                });
            }
        }
        if self.stale_after_days == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "staleness checks disabled (stale_after_days: 0)".to_string(),
            });
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GatePhase, GateSpec};
    use crate::types::TrackName;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let config = EngineConfig::new("storefront");
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.project.name, "storefront");
        assert_eq!(parsed.stale_after_days, 14);
        assert!(!parsed.gates.gates.is_empty());
        assert!(parsed.validate().unwrap().is_empty());
    }

    #[test]
    fn bare_config_gets_defaults() {
        let yaml = "project:\n  name: storefront\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.weights.context, 30);
        assert_eq!(config.stale_after_days, 14);
        assert!(config
            .gates
            .gates
            .iter()
            .any(|g| g.name == "no_unmitigated_high_risk"));
    }

    #[test]
    fn weight_overrides_parse() {
        let yaml = "project:\n  name: storefront\nweights:\n  context: 40\n  design: 20\n  business_case: 20\n  engineering: 20\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.weights.context, 40);
        assert!(config.validate().unwrap().is_empty());
    }

    #[test]
    fn bad_weights_hard_fail() {
        let yaml = "project:\n  name: storefront\nweights:\n  context: 90\n  design: 90\n  business_case: 90\n  engineering: 90\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(PdlcError::Configuration(_))
        ));
    }

    #[test]
    fn duplicate_gate_names_warn() {
        let mut config = EngineConfig::new("storefront");
        config.gates.gates.push(GateSpec {
            name: "estimate_recorded".to_string(),
            phase: GatePhase::Engineering,
            blocking: true,
            check: GateCheck::EstimateRecorded,
            remediation: None,
        });
        let warnings = config.validate().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("duplicate gate name")));
    }

    #[test]
    fn zero_min_version_warns() {
        let mut config = EngineConfig::new("storefront");
        config.gates.gates.push(GateSpec {
            name: "noop".to_string(),
            phase: GatePhase::Context,
            blocking: false,
            check: GateCheck::MinTrackVersion {
                track: TrackName::Context,
                min: 0,
            },
            remediation: None,
        });
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.message.contains("always passes")));
    }

    #[test]
    fn load_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".pdlc")).unwrap();

        let mut config = EngineConfig::new("storefront");
        config.stale_after_days = 30;
        config.save(dir.path()).unwrap();

        let loaded = EngineConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.stale_after_days, 30);
        assert_eq!(loaded.project.name, "storefront");
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            EngineConfig::load(dir.path()),
            Err(PdlcError::NotInitialized)
        ));
    }
}
