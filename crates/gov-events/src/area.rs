//! Areas and Agent Kinds
//!
//! Fixed vocabularies shared by every record: the three agent roles,
//! the three geographic areas, and the service delivery channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three agent roles in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Government,
    Enterprise,
    Resident,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Government => "government",
            AgentKind::Enterprise => "enterprise",
            AgentKind::Resident => "resident",
        }
    }

    pub fn all() -> &'static [AgentKind] {
        &[AgentKind::Government, AgentKind::Enterprise, AgentKind::Resident]
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "government" | "gov" => Ok(AgentKind::Government),
            "enterprise" | "enterprises" => Ok(AgentKind::Enterprise),
            "resident" | "residents" => Ok(AgentKind::Resident),
            _ => Err(ParseKindError::UnknownKind(s.to_string())),
        }
    }
}

/// Geographic area a resident lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    CoreArea,
    UrbanRuralFringe,
    Rural,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::CoreArea => "core_area",
            Area::UrbanRuralFringe => "urban_rural_fringe",
            Area::Rural => "rural",
        }
    }

    /// All areas, in the fixed order used by metrics.
    pub fn all() -> [Area; 3] {
        [Area::CoreArea, Area::UrbanRuralFringe, Area::Rural]
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core_area" => Ok(Area::CoreArea),
            "urban_rural_fringe" => Ok(Area::UrbanRuralFringe),
            "rural" => Ok(Area::Rural),
            _ => Err(ParseKindError::UnknownArea(s.to_string())),
        }
    }
}

/// One value per area.
///
/// Used for infrastructure levels (0-100) and service quality (0-1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaLevels {
    pub core_area: f64,
    pub urban_rural_fringe: f64,
    pub rural: f64,
}

impl AreaLevels {
    pub fn new(core_area: f64, urban_rural_fringe: f64, rural: f64) -> Self {
        Self {
            core_area,
            urban_rural_fringe,
            rural,
        }
    }

    pub fn get(&self, area: Area) -> f64 {
        match area {
            Area::CoreArea => self.core_area,
            Area::UrbanRuralFringe => self.urban_rural_fringe,
            Area::Rural => self.rural,
        }
    }

    pub fn get_mut(&mut self, area: Area) -> &mut f64 {
        match area {
            Area::CoreArea => &mut self.core_area,
            Area::UrbanRuralFringe => &mut self.urban_rural_fringe,
            Area::Rural => &mut self.rural,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Area, f64)> + '_ {
        Area::all().into_iter().map(move |a| (a, self.get(a)))
    }

    pub fn mean(&self) -> f64 {
        (self.core_area + self.urban_rural_fringe + self.rural) / 3.0
    }
}

/// Channel a service was delivered through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Digital,
    Physical,
}

/// Errors from parsing area or kind names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseKindError {
    UnknownArea(String),
    UnknownKind(String),
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseKindError::UnknownArea(s) => write!(f, "unknown area: '{}'", s),
            ParseKindError::UnknownKind(s) => write!(f, "unknown agent kind: '{}'", s),
        }
    }
}

impl std::error::Error for ParseKindError {}
