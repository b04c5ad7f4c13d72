//! Simulation Driver
//!
//! Owns the roster, the environment, both engines, the policy modifiers, and
//! the seeded RNG, and runs the round loop:
//!
//! 1. snapshot the environment context
//! 2. ask the decision provider for every agent (falling back on failure)
//! 3. generate interactions and fold their outcomes into agent state
//! 4. advance the environment
//! 5. append the round record
//!
//! Nothing inside a round is fatal. A failed decision becomes a default
//! decision, a failed round is logged and skipped, and a failed metrics
//! computation leaves the result without metrics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gov_events::{AgentKind, Decision, DecisionEntry, DecisionSample, RoundRecord};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::components::{Agent, AreaContext, Environment, EnvironmentContext, HistoryEntry, Roster};
use crate::config::SimConfig;
use crate::decision::{default_decision, DecisionContext, DecisionProvider};
use crate::error::{ConfigError, DecisionError, RoundError};
use crate::interventions::{PolicyEngine, PolicyImpact, PolicyModifiers};
use crate::metrics::compute_metrics;
use crate::output::{AgentCounts, LogEntry, RoundLogger, RunResult, RunStatus};
use crate::setup::create_agents;
use crate::systems::{InteractionEngine, RoundDecisions};

/// Rounds between progress messages
pub const PROGRESS_INTERVAL: u32 = 10;

/// Shared flag that stops a run before its next round
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decision entries for one round, before sampling
struct RoundEntries {
    government: DecisionEntry,
    enterprises: Vec<DecisionEntry>,
    residents: Vec<DecisionEntry>,
}

/// One city's simulation
pub struct Simulation {
    city: String,
    seed: u64,
    max_rounds: u32,
    round: u32,
    roster: Roster,
    environment: Environment,
    interactions: InteractionEngine,
    policies: PolicyEngine,
    modifiers: PolicyModifiers,
    rng: SmallRng,
    records: Vec<RoundRecord>,
    failed_rounds: usize,
    policy_interventions: Vec<String>,
}

impl Simulation {
    /// Build a simulation for `city` from the run parameters in `config`.
    pub fn new(config: &SimConfig, city: &str) -> Result<Self, ConfigError> {
        let city_config = config.city(city)?;
        let params = &config.simulation;
        let mut rng = SmallRng::seed_from_u64(params.seed);

        let roster = create_agents(&config.agents, &city_config.overrides, &params.population(), &mut rng)?;
        let environment = Environment::new(&city_config.environment);

        info!(
            city,
            enterprises = roster.enterprises.len(),
            residents = roster.residents.len(),
            seed = params.seed,
            "simulation initialized"
        );

        Ok(Self {
            city: city.to_lowercase(),
            seed: params.seed,
            max_rounds: params.rounds,
            round: 0,
            roster,
            environment,
            interactions: InteractionEngine::new(config.rules.clone()),
            policies: PolicyEngine::new(config.policies.clone()),
            modifiers: PolicyModifiers::new(),
            rng,
            records: Vec::new(),
            failed_rounds: 0,
            policy_interventions: Vec::new(),
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn modifiers(&self) -> &PolicyModifiers {
        &self.modifiers
    }

    pub fn policy_engine(&self) -> &PolicyEngine {
        &self.policies
    }

    pub fn interaction_engine(&self) -> &InteractionEngine {
        &self.interactions
    }

    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// Apply policy interventions. Unknown names are skipped with a warning.
    ///
    /// Returns how many were applied.
    pub fn apply_policies<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        self.policy_interventions
            .extend(names.iter().map(|n| n.as_ref().to_string()));
        self.policies
            .apply(names, &mut self.roster, &mut self.environment, &mut self.modifiers)
    }

    /// Estimate what a policy would touch on the current roster without
    /// applying it.
    pub fn preview_policy(&self, name: &str) -> Result<PolicyImpact, ConfigError> {
        self.policies.simulate_policy_impact(name, &self.roster)
    }

    fn agent_counts(&self) -> AgentCounts {
        AgentCounts {
            government: 1,
            enterprises: self.roster.enterprises.len(),
            residents: self.roster.residents.len(),
        }
    }

    fn check_state(&self, round: u32) -> Result<(), RoundError> {
        let env = &self.environment;
        if !env.system_load.is_finite() || !env.service_availability.is_finite() {
            return Err(RoundError::InvalidState {
                round,
                reason: "environment load or availability is not finite".to_string(),
            });
        }
        Ok(())
    }

    /// Run a single round. The round counter advances even if the round fails.
    pub fn step<P: DecisionProvider + ?Sized>(&mut self, provider: &mut P) -> Result<&RoundRecord, RoundError> {
        let round = self.round;
        self.round += 1;
        self.check_state(round)?;

        let context = self.environment.context();
        let (decisions, entries) = self.gather_decisions(round, &context, provider);

        if decisions.enterprises.len() != self.roster.enterprises.len()
            || decisions.residents.len() != self.roster.residents.len()
        {
            return Err(RoundError::InvalidState {
                round,
                reason: "decision count does not match roster".to_string(),
            });
        }

        let interactions = self.interactions.process(
            &mut self.roster,
            &decisions,
            &self.environment,
            &self.modifiers,
            &mut self.rng,
        );
        self.environment.update(&interactions, &mut self.rng);

        self.records.push(RoundRecord {
            round,
            interactions,
            environment: self.environment.snapshot(),
            agents: self.roster.snapshot(),
            decisions_sample: DecisionSample::from_entries(
                Some(&entries.government),
                &entries.enterprises,
                &entries.residents,
            ),
        });

        if (round + 1) % PROGRESS_INTERVAL == 0 {
            info!(round = round + 1, total = self.max_rounds, city = self.city.as_str(), "round progress");
        }

        self.records
            .last()
            .ok_or_else(|| RoundError::InvalidState {
                round,
                reason: "round record missing".to_string(),
            })
    }

    fn gather_decisions<P: DecisionProvider + ?Sized>(
        &mut self,
        round: u32,
        context: &EnvironmentContext,
        provider: &mut P,
    ) -> (RoundDecisions, RoundEntries) {
        let behaviors = &self.modifiers.behaviors;
        let rng = &mut self.rng;
        let ctx = |agent_id: &str, kind: AgentKind, area: Option<AreaContext>| DecisionContext {
            round,
            agent_id: agent_id.to_string(),
            kind,
            environment: context.clone(),
            area,
            behavior_modifiers: behaviors.clone(),
        };

        let government = &mut self.roster.government;
        let gov_entry = decide(provider, &ctx(&government.id, AgentKind::Government, None), government, rng);

        let mut ent_entries = Vec::with_capacity(self.roster.enterprises.len());
        for enterprise in &mut self.roster.enterprises {
            let c = ctx(&enterprise.id, AgentKind::Enterprise, None);
            ent_entries.push(decide(provider, &c, enterprise, rng));
        }

        let mut res_entries = Vec::with_capacity(self.roster.residents.len());
        for resident in &mut self.roster.residents {
            let area = Some(self.environment.area_context(resident.area));
            let c = ctx(&resident.id, AgentKind::Resident, area);
            res_entries.push(decide(provider, &c, resident, rng));
        }

        let decisions = RoundDecisions {
            government: gov_entry.decision.clone(),
            enterprises: ent_entries.iter().map(|e| e.decision.clone()).collect(),
            residents: res_entries.iter().map(|e| e.decision.clone()).collect(),
        };
        let entries = RoundEntries {
            government: gov_entry,
            enterprises: ent_entries,
            residents: res_entries,
        };
        (decisions, entries)
    }

    /// Run until the round limit or until `token` is cancelled, then compute
    /// metrics over whatever rounds were recorded.
    pub fn run<P: DecisionProvider + ?Sized>(
        mut self,
        provider: &mut P,
        token: &CancellationToken,
        logger: &mut RoundLogger,
    ) -> RunResult {
        log_entry(
            logger,
            LogEntry::RunStarted {
                city: self.city.clone(),
                seed: self.seed,
                rounds: self.max_rounds,
                agents: self.agent_counts(),
                policies: self.policy_interventions.clone(),
            },
        );

        let mut status = RunStatus::Completed;
        while self.round < self.max_rounds {
            if token.is_cancelled() {
                warn!(round = self.round, city = self.city.as_str(), "simulation interrupted");
                log_entry(
                    logger,
                    LogEntry::Interrupted {
                        round: self.round,
                        reason: "cancelled by user".to_string(),
                    },
                );
                status = RunStatus::Interrupted;
                break;
            }

            let round = self.round;
            match self.step(provider).map(|record| record.clone()) {
                Ok(record) => log_entry(logger, LogEntry::Round(record)),
                Err(e) => {
                    warn!(round, error = %e, "round failed; skipped");
                    self.failed_rounds += 1;
                    log_entry(
                        logger,
                        LogEntry::RoundFailed {
                            round,
                            error: e.to_string(),
                        },
                    );
                }
            }
        }

        let metrics = match compute_metrics(&self.records, &self.roster.snapshot()) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "metrics calculation failed");
                None
            }
        };
        let recommended_policies = metrics
            .as_ref()
            .map(|report| self.policies.recommend_policies(report, &[]))
            .unwrap_or_default();
        if !recommended_policies.is_empty() {
            info!(city = self.city.as_str(), policies = ?recommended_policies, "recommended policies");
        }

        log_entry(
            logger,
            LogEntry::Completed {
                rounds_completed: self.records.len(),
                metrics: metrics.clone(),
            },
        );
        if let Err(e) = logger.flush() {
            warn!(error = %e, "failed to flush round log");
        }

        info!(
            city = self.city.as_str(),
            rounds = self.records.len(),
            interactions = self.interactions.history().len(),
            "simulation finished"
        );

        RunResult {
            city: self.city,
            num_rounds: self.max_rounds,
            rounds_completed: self.records.len(),
            failed_rounds: self.failed_rounds,
            status,
            policy_interventions: self.policy_interventions,
            policy_effects: self.policies.effects(),
            metrics,
            recommended_policies,
            records: self.records,
        }
    }
}

/// Ask the provider for one agent's decision, falling back to the role
/// default on any failure, and record the outcome in the agent's history.
fn decide<P, A>(provider: &mut P, ctx: &DecisionContext, agent: &mut A, rng: &mut SmallRng) -> DecisionEntry
where
    P: DecisionProvider + ?Sized,
    A: Agent,
{
    let result = provider.decide(ctx).and_then(|decision| {
        if decision.is_well_formed() {
            Ok(decision)
        } else {
            Err(DecisionError::Malformed)
        }
    });

    let (decision, error): (Decision, Option<String>) = match result {
        Ok(decision) => (decision, None),
        Err(e) => {
            warn!(agent = agent.id(), provider = provider.name(), error = %e, "decision failed; using default");
            (default_decision(ctx.kind, rng.gen_range(0..3)), Some(e.to_string()))
        }
    };

    debug!(agent = agent.id(), action = decision.action.as_str(), "decided");
    agent.record_decision(HistoryEntry {
        round: ctx.round,
        context: ctx.environment.clone(),
        decision: decision.clone(),
        fallback: error.is_some(),
        error: error.clone(),
    });

    DecisionEntry {
        agent_id: agent.id().to_string(),
        kind: ctx.kind,
        decision,
        is_fallback: error.is_some(),
        error,
    }
}

fn log_entry(logger: &mut RoundLogger, entry: LogEntry) {
    if let Err(e) = logger.log(entry).map_err(RoundError::from) {
        warn!(error = %e, "failed to write round log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::OfflineProvider;
    use crate::interventions::ImpactEstimate;

    fn config(rounds: u32, residents: usize) -> SimConfig {
        let mut config = SimConfig::default();
        config.simulation.rounds = rounds;
        config.simulation.residents = residents;
        config.simulation.enterprises = 3;
        config
    }

    struct Failing;

    impl DecisionProvider for Failing {
        fn decide(&mut self, _ctx: &DecisionContext) -> Result<Decision, DecisionError> {
            Err(DecisionError::Timeout(500))
        }
    }

    struct Empty;

    impl DecisionProvider for Empty {
        fn decide(&mut self, _ctx: &DecisionContext) -> Result<Decision, DecisionError> {
            Ok(Decision::new("", "residents"))
        }
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_unknown_city_rejected() {
        assert!(matches!(
            Simulation::new(&config(1, 5), "atlantis"),
            Err(ConfigError::UnknownCity(_))
        ));
    }

    #[test]
    fn test_step_records_round() {
        let mut sim = Simulation::new(&config(3, 20), "beijing").unwrap();
        let mut provider = OfflineProvider::new(1);

        let record = sim.step(&mut provider).unwrap();
        assert_eq!(record.round, 0);
        assert_eq!(record.agents.residents.len(), 20);
        assert_eq!(record.decisions_sample.enterprises.len(), 3);
        assert_eq!(record.decisions_sample.residents.len(), 10);
        assert_eq!(sim.round(), 1);
        assert_eq!(sim.roster().government.history.len(), 1);
    }

    #[test]
    fn test_failed_decisions_fall_back() {
        let mut sim = Simulation::new(&config(1, 5), "shenzhen").unwrap();
        let record = sim.step(&mut Failing).unwrap().clone();

        for entry in record.decisions_sample.entries() {
            assert!(entry.is_fallback);
            assert!(entry.decision.is_well_formed());
            assert!(entry.error.as_deref().unwrap_or("").contains("timed out"));
        }
        assert!(sim.roster().residents.iter().all(|r| r.history[0].fallback));
    }

    #[test]
    fn test_malformed_decision_is_a_failure() {
        let mut sim = Simulation::new(&config(1, 5), "beijing").unwrap();
        let record = sim.step(&mut Empty).unwrap();
        let gov = record.decisions_sample.government.as_ref().unwrap();
        assert!(gov.is_fallback);
        assert_eq!(gov.decision.target, "residents");
    }

    #[test]
    fn test_invalid_state_skips_round() {
        let mut sim = Simulation::new(&config(2, 5), "beijing").unwrap();
        sim.environment.system_load = f64::NAN;
        let err = sim.step(&mut OfflineProvider::new(1)).unwrap_err();
        assert!(matches!(err, RoundError::InvalidState { round: 0, .. }));
        assert_eq!(sim.round(), 1);
        assert!(sim.records().is_empty());
    }

    #[test]
    fn test_run_completes_with_metrics() {
        let sim = Simulation::new(&config(4, 15), "beijing").unwrap();
        let result = sim.run(&mut OfflineProvider::new(2), &CancellationToken::new(), &mut RoundLogger::null());
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.rounds_completed, 4);
        assert_eq!(result.records.len(), 4);
        assert!(result.metrics.is_some());
    }

    #[test]
    fn test_cancelled_run_still_has_metrics() {
        let token = CancellationToken::new();
        token.cancel();
        let sim = Simulation::new(&config(10, 10), "shenzhen").unwrap();
        let result = sim.run(&mut OfflineProvider::new(2), &token, &mut RoundLogger::null());
        assert_eq!(result.status, RunStatus::Interrupted);
        assert_eq!(result.rounds_completed, 0);
        assert!(result.metrics.is_some());
    }

    #[test]
    fn test_non_finite_heterogeneity_from_toml_rejected() {
        for value in ["inf", "nan"] {
            let config: SimConfig = toml::from_str(&format!("[simulation]\nheterogeneity = {}\n", value)).unwrap();
            let result = Simulation::new(&config, "beijing");
            assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })), "heterogeneity = {}", value);
        }
    }

    #[test]
    fn test_preview_policy_leaves_roster_unchanged() {
        let sim = Simulation::new(&config(1, 12), "beijing").unwrap();
        let before = sim.roster().clone();
        let impact = sim.preview_policy("digital_literacy_training").unwrap();
        assert_eq!(impact.policy_name, "digital_literacy_training");
        assert!(matches!(impact.estimated_effects, ImpactEstimate::Residents { .. }));
        assert_eq!(sim.roster(), &before);
        assert!(sim.policy_engine().applied_policies().is_empty());
        assert!(matches!(sim.preview_policy("no_such_policy"), Err(ConfigError::UnknownPolicy(_))));
    }

    #[test]
    fn test_apply_policies_tracks_names() {
        let mut sim = Simulation::new(&config(1, 10), "beijing").unwrap();
        let applied = sim.apply_policies(&["data_open_sharing", "no_such_policy"]);
        assert_eq!(applied, 1);
        assert_eq!(sim.policy_engine().applied_policies(), ["data_open_sharing".to_string()]);
        assert!(!sim.modifiers().is_empty());
    }
}
