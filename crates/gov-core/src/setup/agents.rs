//! Agent Creation
//!
//! Builds the roster for one city: one government, N enterprises, and M
//! residents spread over the three areas by weighted random choice.

use gov_events::Area;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::components::{
    bounds, DataCollectionStrategy, Enterprise, EnterpriseAttributes, EnterpriseState,
    GovernancePreference, Government, GovernmentAttributes, GovernmentState, Resident,
    ResidentAttributes, ResidentState, Roster, TechnologyType,
};
use crate::error::ConfigError;

/// Resident adjustments for the less-served areas
pub mod area_adjustments {
    pub const FRINGE_LITERACY_DROP: f64 = 20.0;
    pub const FRINGE_LITERACY_FLOOR: f64 = 30.0;
    pub const FRINGE_INCOME_DROP: f64 = 1500.0;
    pub const FRINGE_INCOME_FLOOR: f64 = 3000.0;

    pub const RURAL_LITERACY_DROP: f64 = 30.0;
    pub const RURAL_LITERACY_FLOOR: f64 = 20.0;
    pub const RURAL_INCOME_DROP: f64 = 2500.0;
    pub const RURAL_INCOME_FLOOR: f64 = 2000.0;

    /// Added to literacy/100 to get the chance of digital access
    pub const ACCESS_BASELINE: f64 = 0.25;
}

use area_adjustments::*;

/// Attribute and state template for one role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTemplate<A, S> {
    pub attributes: A,
    pub state: S,
}

/// Templates every agent is created from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTemplates {
    pub government: RoleTemplate<GovernmentAttributes, GovernmentState>,
    pub enterprise: RoleTemplate<EnterpriseAttributes, EnterpriseState>,
    pub resident: RoleTemplate<ResidentAttributes, ResidentState>,
}

/// City-specific changes applied on top of the templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance_preference: Option<GovernancePreference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_transparency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_regulation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology_type: Option<TechnologyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_strategy: Option<DataCollectionStrategy>,
}

/// Population size and spread
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationParams {
    pub enterprises: usize,
    pub residents: usize,
    /// Area weights in core, fringe, rural order
    pub area_weights: [f64; 3],
    /// Relative jitter applied to resident attributes
    pub heterogeneity: f64,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            enterprises: 5,
            residents: 50,
            area_weights: [0.5, 0.3, 0.2],
            heterogeneity: 0.2,
        }
    }
}

/// Create the full roster for a city.
///
/// Fails when the area weights cannot form a distribution, or when the
/// heterogeneity, a city override, or a numeric template field is not finite.
pub fn create_agents<R: Rng>(
    templates: &AgentTemplates,
    overrides: &CityOverrides,
    params: &PopulationParams,
    rng: &mut R,
) -> Result<Roster, ConfigError> {
    check_finite(templates, overrides, params)?;
    let area_dist = WeightedIndex::new(params.area_weights)
        .map_err(|e| ConfigError::InvalidWeights(format!("{:?}: {}", params.area_weights, e)))?;

    let government = create_government(templates, overrides);

    let enterprises = (0..params.enterprises)
        .map(|i| {
            let mut attributes = templates.enterprise.attributes.clone();
            if let Some(t) = overrides.technology_type {
                attributes.technology_type = t;
            }
            if let Some(s) = overrides.data_collection_strategy {
                attributes.data_collection_strategy = s;
            }
            Enterprise::new(i, attributes, templates.enterprise.state.clone())
        })
        .collect();

    let residents = (0..params.residents)
        .map(|i| {
            let area = Area::all()[area_dist.sample(rng)];
            create_resident(i, area, templates, params.heterogeneity, rng)
        })
        .collect::<Vec<_>>();

    debug!(
        enterprises = params.enterprises,
        residents = residents.len(),
        "created agents"
    );

    Ok(Roster {
        government,
        enterprises,
        residents,
    })
}

fn check_finite(
    templates: &AgentTemplates,
    overrides: &CityOverrides,
    params: &PopulationParams,
) -> Result<(), ConfigError> {
    let government = &templates.government;
    let enterprise = &templates.enterprise;
    let resident = &templates.resident;
    let fields = [
        ("simulation.heterogeneity", Some(params.heterogeneity)),
        ("overrides.information_transparency", overrides.information_transparency),
        ("overrides.platform_regulation", overrides.platform_regulation),
        ("government.information_transparency", Some(government.attributes.information_transparency)),
        ("government.platform_regulation", Some(government.attributes.platform_regulation)),
        ("government.financial_resources", Some(government.attributes.financial_resources)),
        ("government.technical_capability", Some(government.attributes.technical_capability)),
        ("government.resource_utilization", Some(government.state.resource_utilization)),
        ("enterprise.data_usage_compliance", Some(enterprise.attributes.data_usage_compliance)),
        ("enterprise.data_sharing_willingness", Some(enterprise.attributes.data_sharing_willingness)),
        ("enterprise.innovation_level", Some(enterprise.state.innovation_level)),
        ("enterprise.market_share", Some(enterprise.state.market_share)),
        ("resident.information_literacy", Some(resident.attributes.information_literacy)),
        ("resident.income_level", Some(resident.attributes.income_level)),
        ("resident.technology_acceptance", Some(resident.attributes.technology_acceptance)),
        ("resident.trust_in_government", Some(resident.attributes.trust_in_government)),
        ("resident.satisfaction", Some(resident.state.satisfaction)),
        ("resident.service_usage_frequency", Some(resident.state.service_usage_frequency)),
    ];
    match fields.into_iter().find(|(_, value)| value.is_some_and(|v| !v.is_finite())) {
        Some((field, Some(value))) => Err(ConfigError::InvalidParameter {
            field: field.to_string(),
            value,
        }),
        _ => Ok(()),
    }
}

fn create_government(templates: &AgentTemplates, overrides: &CityOverrides) -> Government {
    let mut attributes = templates.government.attributes.clone();
    if let Some(preference) = overrides.governance_preference {
        attributes.governance_preference = preference;
    }
    if let Some(value) = overrides.information_transparency {
        attributes.information_transparency = bounds::PERCENT.clamp(value);
    }
    if let Some(value) = overrides.platform_regulation {
        attributes.platform_regulation = bounds::PERCENT.clamp(value);
    }
    Government::new(attributes, templates.government.state.clone())
}

/// Digital access is drawn with p = literacy/100 + 0.25, so low-literacy
/// residents may start without it.
fn create_resident<R: Rng>(
    index: usize,
    area: Area,
    templates: &AgentTemplates,
    heterogeneity: f64,
    rng: &mut R,
) -> Resident {
    let mut attributes = templates.resident.attributes.clone();
    match area {
        Area::CoreArea => {}
        Area::UrbanRuralFringe => {
            attributes.information_literacy =
                (attributes.information_literacy - FRINGE_LITERACY_DROP).max(FRINGE_LITERACY_FLOOR);
            attributes.income_level = (attributes.income_level - FRINGE_INCOME_DROP).max(FRINGE_INCOME_FLOOR);
        }
        Area::Rural => {
            attributes.information_literacy =
                (attributes.information_literacy - RURAL_LITERACY_DROP).max(RURAL_LITERACY_FLOOR);
            attributes.income_level = (attributes.income_level - RURAL_INCOME_DROP).max(RURAL_INCOME_FLOOR);
        }
    }

    let h = heterogeneity.abs();
    let mut jitter = |value: f64| {
        if h == 0.0 {
            value
        } else {
            value * (1.0 + rng.gen_range(-h..=h))
        }
    };
    attributes.information_literacy = bounds::PERCENT.clamp(jitter(attributes.information_literacy));
    attributes.income_level = bounds::INCOME.clamp(jitter(attributes.income_level));
    attributes.technology_acceptance = bounds::PERCENT.clamp(jitter(attributes.technology_acceptance));
    attributes.trust_in_government = bounds::PERCENT.clamp(jitter(attributes.trust_in_government));

    let mut state = templates.resident.state.clone();
    let access_chance = (attributes.information_literacy / 100.0 + ACCESS_BASELINE).clamp(0.0, 1.0);
    state.digital_access = rng.gen_bool(access_chance);

    Resident::new(index, area, attributes, state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn params(residents: usize) -> PopulationParams {
        PopulationParams {
            residents,
            ..PopulationParams::default()
        }
    }

    #[test]
    fn test_create_agents_counts_and_ids() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let roster = create_agents(&AgentTemplates::default(), &CityOverrides::default(), &params(30), &mut rng).unwrap();
        assert_eq!(roster.enterprises.len(), 5);
        assert_eq!(roster.residents.len(), 30);
        assert_eq!(roster.agent_count(), 36);
        assert_eq!(roster.government.id, "government");
        assert_eq!(roster.residents[29].id, "resident_29");
    }

    #[test]
    fn test_area_weights_respected() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let roster = create_agents(&AgentTemplates::default(), &CityOverrides::default(), &params(3000), &mut rng).unwrap();
        let core = roster.residents.iter().filter(|r| r.area == Area::CoreArea).count() as f64 / 3000.0;
        let rural = roster.residents.iter().filter(|r| r.area == Area::Rural).count() as f64 / 3000.0;
        assert!((core - 0.5).abs() < 0.05, "core share {}", core);
        assert!((rural - 0.2).abs() < 0.05, "rural share {}", rural);
    }

    #[test]
    fn test_rural_residents_have_lower_literacy() {
        let mut rng = SmallRng::seed_from_u64(7);
        let p = PopulationParams {
            residents: 200,
            heterogeneity: 0.0,
            ..PopulationParams::default()
        };
        let roster = create_agents(&AgentTemplates::default(), &CityOverrides::default(), &p, &mut rng).unwrap();
        for resident in &roster.residents {
            let expected = match resident.area {
                Area::CoreArea => 60.0,
                Area::UrbanRuralFringe => 40.0,
                Area::Rural => 30.0,
            };
            assert_eq!(resident.attributes.information_literacy, expected);
        }
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let p = PopulationParams {
            area_weights: [0.0, 0.0, 0.0],
            ..PopulationParams::default()
        };
        let result = create_agents(&AgentTemplates::default(), &CityOverrides::default(), &p, &mut rng);
        assert!(matches!(result, Err(ConfigError::InvalidWeights(_))));
    }

    #[test]
    fn test_non_finite_heterogeneity_rejected() {
        for heterogeneity in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let mut rng = SmallRng::seed_from_u64(1);
            let p = PopulationParams {
                heterogeneity,
                ..PopulationParams::default()
            };
            let result = create_agents(&AgentTemplates::default(), &CityOverrides::default(), &p, &mut rng);
            match result {
                Err(ConfigError::InvalidParameter { field, .. }) => assert_eq!(field, "simulation.heterogeneity"),
                other => panic!("expected InvalidParameter for {}, got {:?}", heterogeneity, other),
            }
        }
    }

    #[test]
    fn test_non_finite_template_rejected() {
        let mut templates = AgentTemplates::default();
        templates.resident.attributes.information_literacy = f64::NAN;
        let mut rng = SmallRng::seed_from_u64(1);
        let result = create_agents(&templates, &CityOverrides::default(), &params(10), &mut rng);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter { ref field, .. }) if field == "resident.information_literacy"
        ));

        let overrides = CityOverrides {
            platform_regulation: Some(f64::INFINITY),
            ..CityOverrides::default()
        };
        let result = create_agents(&AgentTemplates::default(), &overrides, &params(10), &mut rng);
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_low_literacy_residents_can_lack_access() {
        let mut templates = AgentTemplates::default();
        templates.resident.attributes.information_literacy = 20.0;
        let p = PopulationParams {
            residents: 400,
            heterogeneity: 0.0,
            area_weights: [1.0, 0.0, 0.0],
            ..PopulationParams::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let roster = create_agents(&templates, &CityOverrides::default(), &p, &mut rng).unwrap();
        let with_access = roster.residents.iter().filter(|r| r.state.digital_access).count() as f64 / 400.0;
        assert!((with_access - 0.45).abs() < 0.08, "access share {}", with_access);
    }

    #[test]
    fn test_city_overrides_apply() {
        let overrides = CityOverrides {
            governance_preference: Some(GovernancePreference::Efficiency),
            information_transparency: Some(85.0),
            data_collection_strategy: Some(DataCollectionStrategy::Flexible),
            ..CityOverrides::default()
        };
        let mut rng = SmallRng::seed_from_u64(1);
        let roster = create_agents(&AgentTemplates::default(), &overrides, &params(0), &mut rng).unwrap();
        assert_eq!(roster.government.attributes.governance_preference, GovernancePreference::Efficiency);
        assert_eq!(roster.government.attributes.information_transparency, 85.0);
        assert!(roster
            .enterprises
            .iter()
            .all(|e| e.attributes.data_collection_strategy == DataCollectionStrategy::Flexible));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let mut templates = AgentTemplates::default();
        templates.resident.attributes.trust_in_government = 99.0;
        let p = PopulationParams {
            residents: 500,
            heterogeneity: 0.5,
            ..PopulationParams::default()
        };
        let mut rng = SmallRng::seed_from_u64(99);
        let roster = create_agents(&templates, &CityOverrides::default(), &p, &mut rng).unwrap();
        assert!(roster
            .residents
            .iter()
            .all(|r| bounds::PERCENT.contains(r.attributes.trust_in_government)
                && bounds::PERCENT.contains(r.attributes.information_literacy)));
    }
}
