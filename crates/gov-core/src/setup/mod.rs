//! Simulation Setup
//!
//! Agent creation from templates, and the built-in city, rule, and policy
//! tables used when no config file overrides them.

pub mod agents;
pub mod tables;

pub use agents::{create_agents, AgentTemplates, CityOverrides, PopulationParams, RoleTemplate};
pub use tables::{default_cities, default_policies, default_rules, default_templates, CityConfig};
