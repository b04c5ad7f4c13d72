//! Shared record types and serialization for the governance simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod area;
pub mod decision;
pub mod interaction;
pub mod snapshot;

pub use area::{AgentKind, Area, AreaLevels, ParseKindError, ServiceType};

pub use decision::{Decision, DecisionEntry, DecisionSample};

pub use interaction::{InteractionType, Interaction, InteractionStatus, Outcome};

pub use snapshot::{
    AgentsSnapshot, EnterpriseSnapshot, EnvironmentSnapshot, GovernmentSnapshot, ResidentSnapshot,
    RoundRecord, Utilization,
};
