//! Environment Component
//!
//! Shared infrastructure and service state for one city. The driver owns the
//! single instance and updates it once per round from that round's
//! interactions.

use gov_events::{Area, AreaLevels, EnvironmentSnapshot, Interaction, ServiceType, Utilization};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::interventions::{ChangeValue, PolicyDefinition, PolicyTarget};

/// Constants for environment dynamics
pub mod environment_constants {
    /// Requests per round the shared systems are sized for
    pub const ASSUMED_CAPACITY: f64 = 50.0;
    /// Weight kept from the previous load each round
    pub const LOAD_SMOOTHING: f64 = 0.7;
    /// Load above which availability degrades
    pub const HIGH_LOAD: f64 = 0.8;
    /// Load below which availability recovers
    pub const LOW_LOAD: f64 = 0.3;
    pub const HIGH_LOAD_PENALTY: f64 = -0.05;
    pub const LOW_LOAD_RECOVERY: f64 = 0.02;
    /// Availability lost per system failure
    pub const SYSTEM_FAILURE_PENALTY: f64 = 0.1;

    /// Per-round chance of an emergency starting
    pub const P_EMERGENCY_ENTER: f64 = 0.02;
    /// Per-round chance of an active emergency ending
    pub const P_EMERGENCY_EXIT: f64 = 0.3;
    /// Availability multiplier when an emergency starts
    pub const EMERGENCY_AVAILABILITY_FACTOR: f64 = 0.7;
    /// Digital infrastructure multiplier per round during an emergency
    pub const EMERGENCY_DIGITAL_DECAY: f64 = 0.98;

    /// Weight kept from the previous utilization each round
    pub const UTILIZATION_SMOOTHING: f64 = 0.8;
    /// Success rate service quality is steered toward
    pub const QUALITY_TARGET_SUCCESS: f64 = 0.7;
    pub const QUALITY_RATE: f64 = 0.05;
    /// Maximum absolute random drift per infrastructure value per round
    pub const INFRASTRUCTURE_DRIFT: f64 = 1.0;

    pub const INITIAL_AVAILABILITY: f64 = 1.0;
    pub const INITIAL_LOAD: f64 = 0.5;
    pub const INITIAL_DIGITAL_UTILIZATION: f64 = 0.6;
    pub const INITIAL_PHYSICAL_UTILIZATION: f64 = 0.7;
}

use environment_constants::*;

/// Per-city environment parameters, as loaded from config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityEnvironment {
    pub digital_infrastructure: AreaLevels,
    pub physical_infrastructure: AreaLevels,
    #[serde(default)]
    pub policy_environment: BTreeMap<String, String>,
}

/// Read-only summary handed to the decision provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentContext {
    pub digital_infrastructure: AreaLevels,
    pub physical_infrastructure: AreaLevels,
    pub policy_environment: BTreeMap<String, String>,
    pub service_availability: f64,
    pub system_load: f64,
    pub emergency_status: bool,
    pub service_quality: AreaLevels,
    pub infrastructure_utilization: Utilization,
    pub environment_summary: String,
    /// Mean of the average digital and average physical levels
    pub infrastructure_level: f64,
    pub regulation_intensity: String,
    pub market_conditions: String,
}

/// Area-level view used when describing a resident's surroundings
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AreaContext {
    pub digital_infrastructure_level: f64,
    pub physical_infrastructure_level: f64,
    pub service_quality: f64,
    pub combined_infrastructure: f64,
}

/// Result of one step of the emergency chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyTransition {
    Calm,
    Triggered,
    Ongoing,
    Resolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub digital_infrastructure: AreaLevels,
    pub physical_infrastructure: AreaLevels,
    pub policy_environment: BTreeMap<String, String>,
    pub service_availability: f64,
    pub system_load: f64,
    pub emergency_status: bool,
    pub service_quality: AreaLevels,
    pub infrastructure_utilization: Utilization,
    pub update_count: u64,
}

impl Environment {
    pub fn new(city: &CityEnvironment) -> Self {
        let clamp = |levels: AreaLevels| AreaLevels {
            core_area: levels.core_area.clamp(0.0, 100.0),
            urban_rural_fringe: levels.urban_rural_fringe.clamp(0.0, 100.0),
            rural: levels.rural.clamp(0.0, 100.0),
        };
        Self {
            digital_infrastructure: clamp(city.digital_infrastructure),
            physical_infrastructure: clamp(city.physical_infrastructure),
            policy_environment: city.policy_environment.clone(),
            service_availability: INITIAL_AVAILABILITY,
            system_load: INITIAL_LOAD,
            emergency_status: false,
            service_quality: AreaLevels::new(0.9, 0.7, 0.6),
            infrastructure_utilization: Utilization {
                digital: INITIAL_DIGITAL_UTILIZATION,
                physical: INITIAL_PHYSICAL_UTILIZATION,
            },
            update_count: 0,
        }
    }

    /// Summarize current state for the decision provider. No side effects.
    pub fn context(&self) -> EnvironmentContext {
        let infrastructure_level =
            (self.digital_infrastructure.mean() + self.physical_infrastructure.mean()) / 2.0;

        EnvironmentContext {
            digital_infrastructure: self.digital_infrastructure,
            physical_infrastructure: self.physical_infrastructure,
            policy_environment: self.policy_environment.clone(),
            service_availability: self.service_availability,
            system_load: self.system_load,
            emergency_status: self.emergency_status,
            service_quality: self.service_quality,
            infrastructure_utilization: self.infrastructure_utilization,
            environment_summary: format!(
                "Service availability: {:.2}, System load: {:.2}",
                self.service_availability, self.system_load
            ),
            infrastructure_level,
            regulation_intensity: if self.system_load > 0.7 {
                "medium_to_high".to_string()
            } else {
                "medium".to_string()
            },
            market_conditions: if self.emergency_status {
                "challenging".to_string()
            } else {
                "stable".to_string()
            },
        }
    }

    /// Advance the environment by one round.
    pub fn update<R: Rng>(&mut self, interactions: &[Interaction], rng: &mut R) {
        self.update_count += 1;
        self.update_system_load(interactions);
        self.update_service_availability(interactions);
        self.step_emergency(rng);
        self.update_utilization(interactions);
        self.update_service_quality(interactions);
        self.apply_drift(rng);
    }

    fn update_system_load(&mut self, interactions: &[Interaction]) {
        let requests = interactions
            .iter()
            .filter(|i| i.interaction_type.is_load_bearing())
            .count();
        let load_factor = (requests as f64 / ASSUMED_CAPACITY).min(1.0);
        self.system_load =
            (LOAD_SMOOTHING * self.system_load + (1.0 - LOAD_SMOOTHING) * load_factor).clamp(0.0, 1.0);
    }

    fn update_service_availability(&mut self, interactions: &[Interaction]) {
        let mut delta = if self.system_load > HIGH_LOAD {
            HIGH_LOAD_PENALTY
        } else if self.system_load < LOW_LOAD {
            LOW_LOAD_RECOVERY
        } else {
            0.0
        };

        let failures = interactions
            .iter()
            .filter(|i| i.outcome == gov_events::Outcome::SystemFailure)
            .count();
        delta -= SYSTEM_FAILURE_PENALTY * failures as f64;

        self.service_availability = (self.service_availability + delta).clamp(0.0, 1.0);
    }

    /// One step of the two-state emergency chain.
    pub fn step_emergency<R: Rng>(&mut self, rng: &mut R) -> EmergencyTransition {
        if self.emergency_status {
            if rng.gen::<f64>() < P_EMERGENCY_EXIT {
                self.emergency_status = false;
                info!(round = self.update_count, "emergency resolved");
                EmergencyTransition::Resolved
            } else {
                EmergencyTransition::Ongoing
            }
        } else if rng.gen::<f64>() < P_EMERGENCY_ENTER {
            self.emergency_status = true;
            self.service_availability *= EMERGENCY_AVAILABILITY_FACTOR;
            info!(round = self.update_count, "emergency triggered");
            EmergencyTransition::Triggered
        } else {
            EmergencyTransition::Calm
        }
    }

    fn update_utilization(&mut self, interactions: &[Interaction]) {
        if interactions.is_empty() {
            return;
        }
        let total = interactions.len() as f64;
        let count = |kind: ServiceType| {
            interactions
                .iter()
                .filter(|i| i.service_type == Some(kind))
                .count() as f64
        };
        let digital_ratio = count(ServiceType::Digital) / total;
        let physical_ratio = count(ServiceType::Physical) / total;

        let u = &mut self.infrastructure_utilization;
        u.digital = UTILIZATION_SMOOTHING * u.digital + (1.0 - UTILIZATION_SMOOTHING) * digital_ratio;
        u.physical = UTILIZATION_SMOOTHING * u.physical + (1.0 - UTILIZATION_SMOOTHING) * physical_ratio;
    }

    fn update_service_quality(&mut self, interactions: &[Interaction]) {
        for area in Area::all() {
            let tagged: Vec<&Interaction> = interactions
                .iter()
                .filter(|i| i.area == Some(area))
                .collect();
            if tagged.is_empty() {
                continue;
            }
            let successes = tagged.iter().filter(|i| i.outcome.is_success()).count();
            let success_rate = successes as f64 / tagged.len() as f64;

            let quality = self.service_quality.get_mut(area);
            *quality = (*quality + (success_rate - QUALITY_TARGET_SUCCESS) * QUALITY_RATE).clamp(0.0, 1.0);
        }
    }

    fn apply_drift<R: Rng>(&mut self, rng: &mut R) {
        for area in Area::all() {
            let digital = self.digital_infrastructure.get_mut(area);
            *digital = (*digital + rng.gen_range(-INFRASTRUCTURE_DRIFT..=INFRASTRUCTURE_DRIFT)).clamp(0.0, 100.0);
            if self.emergency_status {
                *digital *= EMERGENCY_DIGITAL_DECAY;
            }

            let physical = self.physical_infrastructure.get_mut(area);
            *physical = (*physical + rng.gen_range(-INFRASTRUCTURE_DRIFT..=INFRASTRUCTURE_DRIFT)).clamp(0.0, 100.0);
        }
    }

    /// Apply an environment-targeted policy's infrastructure deltas.
    ///
    /// Returns the number of infrastructure values changed. Unknown areas,
    /// unknown tables, and unparsable deltas are skipped.
    pub fn apply_policy_intervention(&mut self, name: &str, policy: &PolicyDefinition) -> usize {
        if policy.target != PolicyTarget::Environment {
            warn!(policy = name, "policy does not target the environment; skipped");
            return 0;
        }

        let mut applied = 0;
        for (table, change) in &policy.attribute_change {
            let levels = match table.as_str() {
                "digital_infrastructure" => &mut self.digital_infrastructure,
                "physical_infrastructure" => &mut self.physical_infrastructure,
                other => {
                    warn!(policy = name, table = other, "unknown environment table; skipped");
                    continue;
                }
            };
            let ChangeValue::Table(per_area) = change else {
                warn!(policy = name, table = table.as_str(), "expected per-area deltas; skipped");
                continue;
            };

            for (area_name, spec) in per_area {
                let Ok(area) = area_name.parse::<Area>() else {
                    warn!(policy = name, area = area_name.as_str(), "unknown area; skipped");
                    continue;
                };
                let Some(delta) = spec.parse() else {
                    warn!(policy = name, area = area_name.as_str(), "unparsable delta; skipped");
                    continue;
                };
                let value = levels.get_mut(area);
                let old = *value;
                *value = (old + delta).clamp(0.0, 100.0);
                applied += 1;
                debug!(policy = name, table = table.as_str(), area = area.as_str(), old, new = *value, "infrastructure adjusted");
            }
        }
        applied
    }

    /// Combined infrastructure level for an area, weighted toward digital.
    pub fn infrastructure_level(&self, area: Area) -> f64 {
        0.6 * self.digital_infrastructure.get(area) + 0.4 * self.physical_infrastructure.get(area)
    }

    pub fn area_context(&self, area: Area) -> AreaContext {
        AreaContext {
            digital_infrastructure_level: self.digital_infrastructure.get(area),
            physical_infrastructure_level: self.physical_infrastructure.get(area),
            service_quality: self.service_quality.get(area),
            combined_infrastructure: self.infrastructure_level(area),
        }
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            digital_infrastructure: self.digital_infrastructure,
            physical_infrastructure: self.physical_infrastructure,
            service_availability: self.service_availability,
            system_load: self.system_load,
            emergency_status: self.emergency_status,
            service_quality: self.service_quality,
            infrastructure_utilization: self.infrastructure_utilization,
            update_count: self.update_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interventions::DeltaSpec;
    use gov_events::{InteractionType, Outcome};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn city() -> CityEnvironment {
        CityEnvironment {
            digital_infrastructure: AreaLevels::new(90.0, 70.0, 50.0),
            physical_infrastructure: AreaLevels::new(85.0, 65.0, 45.0),
            policy_environment: BTreeMap::new(),
        }
    }

    fn requests(n: usize) -> Vec<Interaction> {
        (0..n)
            .map(|i| {
                Interaction::between(
                    InteractionType::ServiceRequest,
                    format!("resident_{}", i),
                    "government",
                    Outcome::Success,
                )
                .with_service_type(ServiceType::Digital)
                .with_area(Area::Rural)
            })
            .collect()
    }

    #[test]
    fn test_context_infrastructure_level() {
        let env = Environment::new(&city());
        let ctx = env.context();
        let expected = ((90.0 + 70.0 + 50.0) / 3.0 + (85.0 + 65.0 + 45.0) / 3.0) / 2.0;
        assert!((ctx.infrastructure_level - expected).abs() < 1e-9);
        assert_eq!(ctx.market_conditions, "stable");
        assert_eq!(ctx.regulation_intensity, "medium");
        // context() must not mutate
        assert_eq!(env.update_count, 0);
    }

    #[test]
    fn test_load_smoothing_at_capacity() {
        let mut env = Environment::new(&city());
        env.update_system_load(&requests(50));
        assert!((env.system_load - (0.7 * 0.5 + 0.3 * 1.0)).abs() < 1e-12);

        // Over capacity saturates the load factor at 1
        let mut env2 = Environment::new(&city());
        env2.update_system_load(&requests(500));
        assert!((env2.system_load - env.system_load).abs() < 1e-12);
    }

    #[test]
    fn test_system_failures_reduce_availability() {
        let mut env = Environment::new(&city());
        env.service_availability = 0.9;
        let failures: Vec<Interaction> = (0..2)
            .map(|_| {
                Interaction::new(InteractionType::ServiceUse, vec!["resident_0".into()], Outcome::SystemFailure)
            })
            .collect();
        env.update_service_availability(&failures);
        // load 0.5 gives no load delta, two failures cost 0.2
        assert!((env.service_availability - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_quality_moves_only_tagged_areas() {
        let mut env = Environment::new(&city());
        env.update_service_quality(&requests(10));
        assert!((env.service_quality.rural - (0.6 + 0.3 * 0.05)).abs() < 1e-12);
        assert_eq!(env.service_quality.core_area, 0.9);
        assert_eq!(env.service_quality.urban_rural_fringe, 0.7);
    }

    #[test]
    fn test_utilization_untouched_without_interactions() {
        let mut env = Environment::new(&city());
        env.update_utilization(&[]);
        assert_eq!(env.infrastructure_utilization.digital, 0.6);

        env.update_utilization(&requests(4));
        assert!((env.infrastructure_utilization.digital - (0.8 * 0.6 + 0.2)).abs() < 1e-12);
        assert!((env.infrastructure_utilization.physical - 0.8 * 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_update_deterministic_with_seed() {
        let interactions = requests(30);
        let run = |seed: u64| {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut env = Environment::new(&city());
            for _ in 0..50 {
                env.update(&interactions, &mut rng);
            }
            env
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7).digital_infrastructure, run(8).digital_infrastructure);
    }

    #[test]
    fn test_repeated_updates_stay_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut env = Environment::new(&city());
        let heavy = requests(200);
        for round in 0..500 {
            let batch: &[Interaction] = if round % 2 == 0 { &heavy } else { &[] };
            env.update(batch, &mut rng);
            assert!((0.0..=1.0).contains(&env.service_availability));
            assert!((0.0..=1.0).contains(&env.system_load));
            for (_, v) in env.digital_infrastructure.iter().chain(env.physical_infrastructure.iter()) {
                assert!((0.0..=100.0).contains(&v));
            }
            for (_, q) in env.service_quality.iter() {
                assert!((0.0..=1.0).contains(&q));
            }
        }
        assert_eq!(env.update_count, 500);
    }

    #[test]
    fn test_emergency_entry_rate() {
        let mut rng = SmallRng::seed_from_u64(2024);
        let trials = 200_000;
        let mut entered = 0;
        for _ in 0..trials {
            let mut env = Environment::new(&city());
            if env.step_emergency(&mut rng) == EmergencyTransition::Triggered {
                entered += 1;
                assert!((env.service_availability - 0.7).abs() < 1e-12);
            }
        }
        let rate = entered as f64 / trials as f64;
        assert!((rate - P_EMERGENCY_ENTER).abs() < 0.002, "entry rate {}", rate);
    }

    #[test]
    fn test_emergency_exit_rate() {
        let mut rng = SmallRng::seed_from_u64(11);
        let trials = 50_000;
        let mut resolved = 0;
        for _ in 0..trials {
            let mut env = Environment::new(&city());
            env.emergency_status = true;
            if env.step_emergency(&mut rng) == EmergencyTransition::Resolved {
                resolved += 1;
            }
        }
        let rate = resolved as f64 / trials as f64;
        assert!((rate - P_EMERGENCY_EXIT).abs() < 0.01, "exit rate {}", rate);
    }

    #[test]
    fn test_policy_intervention_clamps_and_skips() {
        let mut env = Environment::new(&city());
        let mut digital = BTreeMap::new();
        digital.insert("rural".to_string(), DeltaSpec::Text("+20".to_string()));
        digital.insert("core_area".to_string(), DeltaSpec::Text("+20".to_string()));
        digital.insert("moon_base".to_string(), DeltaSpec::Text("+20".to_string()));
        digital.insert("urban_rural_fringe".to_string(), DeltaSpec::Text("lots".to_string()));

        let mut policy = PolicyDefinition::new(PolicyTarget::Environment);
        policy
            .attribute_change
            .insert("digital_infrastructure".to_string(), ChangeValue::Table(digital));

        let applied = env.apply_policy_intervention("inclusive_infrastructure", &policy);
        assert_eq!(applied, 2);
        assert_eq!(env.digital_infrastructure.rural, 70.0);
        assert_eq!(env.digital_infrastructure.core_area, 100.0);
        assert_eq!(env.digital_infrastructure.urban_rural_fringe, 70.0);
    }

    #[test]
    fn test_infrastructure_level_weights() {
        let env = Environment::new(&city());
        assert!((env.infrastructure_level(Area::Rural) - (0.6 * 50.0 + 0.4 * 45.0)).abs() < 1e-12);
        let ctx = env.area_context(Area::CoreArea);
        assert_eq!(ctx.service_quality, 0.9);
    }
}
