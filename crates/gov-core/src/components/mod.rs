//! Simulation components: agents and the shared environment.

pub mod agent;
pub mod environment;

pub use agent::{
    bounds, Agent, Bounds, DataCollectionStrategy, Enterprise, EnterpriseAttributes,
    EnterpriseState, GovernancePreference, Government, GovernmentAttributes, GovernmentState,
    HistoryEntry, Resident, ResidentAttributes, ResidentState, Roster, TechnologyType,
};
pub use environment::{
    AreaContext, CityEnvironment, EmergencyTransition, Environment, EnvironmentContext,
};
