//! Interaction Records
//!
//! A resolved stochastic event between one or more agents. Records are
//! immutable once created and are consumed by the environment update,
//! agent state folding, and the metrics calculators.

use serde::{Deserialize, Serialize};

use crate::area::{Area, ServiceType};

/// Interaction type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    ServiceRequest,
    ProcurementCooperation,
    Regulation,
    DataSharing,
    ServiceProvision,
    DemandResponse,
    ServiceSupply,
    ProjectBidding,
    DataRequest,
    InformationSharing,
    EmergencyResponse,
    ServiceUse,
    PolicyImplementation,
    InformationExchange,
    Coordination,
    JointProject,
    CollaborativeService,
    MultiAgencyResponse,
    Partnership,
    Collaboration,
    MutualSupport,
}

impl InteractionType {
    /// Types that put demand on shared service capacity.
    pub fn is_load_bearing(&self) -> bool {
        matches!(
            self,
            InteractionType::ServiceRequest
                | InteractionType::DataRequest
                | InteractionType::ServiceUse
        )
    }

    /// Types counted as information sharing between agents.
    pub fn is_information_sharing(&self) -> bool {
        matches!(
            self,
            InteractionType::DataSharing
                | InteractionType::InformationExchange
                | InteractionType::Coordination
                | InteractionType::InformationSharing
        )
    }

    /// Multi-party collaborative actions.
    pub fn is_joint_action(&self) -> bool {
        matches!(
            self,
            InteractionType::JointProject
                | InteractionType::CollaborativeService
                | InteractionType::MultiAgencyResponse
                | InteractionType::Partnership
        )
    }

    /// Types that earn the cooperation bonus.
    pub fn is_cooperative(&self) -> bool {
        matches!(
            self,
            InteractionType::DataSharing
                | InteractionType::JointProject
                | InteractionType::Collaboration
                | InteractionType::Partnership
                | InteractionType::MutualSupport
        )
    }
}

/// Outcome tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failed,
    Violation,
    Denied,
    Approved,
    Ignored,
    Rejected,
    Neutral,
    SystemFailure,
    MutualBenefit,
    WinWin,
    PartialSuccess,
    Compromise,
    NoChange,
    Conflict,
    Disagreement,
    FailedNegotiation,
}

impl Outcome {
    pub fn from_bool(success: bool, failure: Outcome) -> Self {
        if success {
            Outcome::Success
        } else {
            failure
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Outcomes that build trust between two parties.
    pub fn is_positive(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::MutualBenefit | Outcome::WinWin)
    }

    /// Outcomes that lower agent state during folding.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Outcome::Failed | Outcome::Violation | Outcome::Ignored | Outcome::Rejected
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Outcome::Conflict | Outcome::Disagreement | Outcome::FailedNegotiation
        )
    }

    /// Score used by the cooperation index.
    pub fn cooperation_score(&self) -> f64 {
        match self {
            Outcome::Success | Outcome::MutualBenefit | Outcome::WinWin => 1.0,
            Outcome::PartialSuccess | Outcome::Compromise => 0.7,
            Outcome::Neutral | Outcome::NoChange => 0.5,
            Outcome::Conflict | Outcome::Failed => 0.1,
            _ => 0.5,
        }
    }
}

/// Lifecycle status of an interaction's committed resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Active,
    Closed,
}

/// A single resolved interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub interaction_type: InteractionType,
    pub participants: Vec<String>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Area>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InteractionStatus>,
}

impl Interaction {
    pub fn new(
        interaction_type: InteractionType,
        participants: Vec<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            interaction_type,
            participants,
            outcome,
            effect: None,
            area: None,
            service_type: None,
            cost: None,
            response_time: None,
            recovery_time: None,
            compliance: None,
            resolved: None,
            status: None,
        }
    }

    /// Two-party interaction shorthand.
    pub fn between(
        interaction_type: InteractionType,
        a: impl Into<String>,
        b: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self::new(interaction_type, vec![a.into(), b.into()], outcome)
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub fn with_area(mut self, area: Area) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = Some(service_type);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_response_time(mut self, response_time: f64) -> Self {
        self.response_time = Some(response_time);
        self
    }

    pub fn with_recovery_time(mut self, recovery_time: f64) -> Self {
        self.recovery_time = Some(recovery_time);
        self
    }

    pub fn with_compliance(mut self, compliance: bool) -> Self {
        self.compliance = Some(compliance);
        self
    }

    pub fn with_resolved(mut self, resolved: bool) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn with_status(mut self, status: InteractionStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// A regulation the enterprise did not comply with.
    pub fn is_compliance_failure(&self) -> bool {
        self.interaction_type == InteractionType::Regulation && self.compliance == Some(false)
    }
}
