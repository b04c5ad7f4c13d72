//! Configuration System
//!
//! Loads run parameters, agent templates, cities, interaction rules, and
//! policies from a TOML file. Every section is optional and falls back to the
//! built-in tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::interventions::PolicyDefinition;
use crate::setup::{
    default_cities, default_policies, default_rules, default_templates, AgentTemplates,
    CityConfig, PopulationParams,
};
use crate::systems::RuleBook;

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "govsim.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub agents: AgentTemplates,
    pub cities: BTreeMap<String, CityConfig>,
    pub rules: RuleBook,
    pub policies: BTreeMap<String, PolicyDefinition>,
}

/// Run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub rounds: u32,
    pub enterprises: usize,
    pub residents: usize,
    pub seed: u64,
    /// Core, fringe, rural
    pub area_weights: [f64; 3],
    pub heterogeneity: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 20,
            enterprises: 5,
            residents: 50,
            seed: 42,
            area_weights: [0.5, 0.3, 0.2],
            heterogeneity: 0.2,
        }
    }
}

impl SimulationConfig {
    pub fn population(&self) -> PopulationParams {
        PopulationParams {
            enterprises: self.enterprises,
            residents: self.residents,
            area_weights: self.area_weights,
            heterogeneity: self.heterogeneity,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            eprintln!("Warning: Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn city(&self, name: &str) -> Result<&CityConfig, ConfigError> {
        self.cities
            .get(&name.to_lowercase())
            .ok_or_else(|| ConfigError::UnknownCity(name.to_string()))
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            agents: default_templates(),
            cities: default_cities(),
            rules: default_rules(),
            policies: default_policies(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.simulation.rounds, 20);
        assert_eq!(config.simulation.residents, 50);
        assert_eq!(config.simulation.area_weights, [0.5, 0.3, 0.2]);
        assert!(config.city("Beijing").is_ok());
        assert!(matches!(config.city("atlantis"), Err(ConfigError::UnknownCity(_))));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[simulation]
rounds = 7
seed = 3

[policies.night_school]
target = "resident"
attribute_change = {{ information_literacy = 5 }}
"#
        )
        .unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.simulation.rounds, 7);
        assert_eq!(config.simulation.enterprises, 5);
        assert_eq!(config.policies.len(), 1);
        assert!(config.policies.contains_key("night_school"));
        assert_eq!(config.cities.len(), 2);
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = SimConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: SimConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(SimConfig::load("/no/such/govsim.toml"), Err(ConfigError::Io(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation\nrounds = ").unwrap();
        assert!(matches!(SimConfig::load(file.path()), Err(ConfigError::Parse(_))));
    }
}
