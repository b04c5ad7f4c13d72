//! Digital Governance Simulation CLI
//!
//! Runs one city, compares two cities, lists policies, or writes the default
//! configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use gov_core::config::DEFAULT_CONFIG_PATH;
use gov_core::interventions::PolicyEngine;
use gov_core::output::{compare_runs, write_json, write_results, ComparisonReport, DEFAULT_OUTPUT_DIR};
use gov_core::{CancellationToken, OfflineProvider, RoundLogger, RunResult, SimConfig, SimError, Simulation};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "govsim")]
#[command(about = "Agent-based simulation of digital city governance")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate one city
    Run {
        /// City to simulate
        #[arg(long, default_value = "beijing")]
        city: String,

        #[command(flatten)]
        common: RunArgs,
    },
    /// Simulate two cities with the same parameters and compare them
    Compare {
        /// The two cities to compare
        #[arg(long, num_args = 2, default_values = ["beijing", "shenzhen"])]
        cities: Vec<String>,

        #[command(flatten)]
        common: RunArgs,
    },
    /// List the configured policy interventions
    Policies {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also estimate each policy's reach on this city's initial population
        #[arg(long)]
        city: Option<String>,
    },
    /// Write the default configuration as TOML
    InitConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `run` and `compare`
#[derive(Args, Debug)]
struct RunArgs {
    /// Number of rounds
    #[arg(long)]
    rounds: Option<u32>,

    /// Number of enterprise agents
    #[arg(long)]
    enterprises: Option<usize>,

    /// Number of resident agents
    #[arg(long)]
    residents: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Policy intervention to apply before the first round (repeatable)
    #[arg(long = "policy")]
    policies: Vec<String>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for result files and round logs
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Do not write the JSONL round log
    #[arg(long)]
    no_log: bool,
}

fn load_config(path: Option<&Path>) -> Result<SimConfig, SimError> {
    match path {
        Some(path) => Ok(SimConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Ok(SimConfig::load_or_default()),
        None => Ok(SimConfig::default()),
    }
}

impl RunArgs {
    fn config(&self) -> Result<SimConfig, SimError> {
        let mut config = load_config(self.config.as_deref())?;
        let sim = &mut config.simulation;
        if let Some(rounds) = self.rounds {
            sim.rounds = rounds;
        }
        if let Some(enterprises) = self.enterprises {
            sim.enterprises = enterprises;
        }
        if let Some(residents) = self.residents {
            sim.residents = residents;
        }
        if let Some(seed) = self.seed {
            sim.seed = seed;
        }
        Ok(config)
    }

    fn logger(&self, city: &str) -> Result<RoundLogger, SimError> {
        if self.no_log {
            return Ok(RoundLogger::null());
        }
        let dir = self.output_dir.join("logs");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}_rounds.jsonl", city));
        info!(path = %path.display(), "writing round log");
        Ok(RoundLogger::new(path)?)
    }
}

/// Stop the run on Ctrl-C. The signal is awaited on a helper thread so the
/// round loop itself stays synchronous.
fn install_interrupt_handler(token: CancellationToken) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "could not start signal handler; Ctrl-C will not stop cleanly");
                return;
            }
        };
        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; stopping after the current round");
                token.cancel();
            }
        });
    });
}

fn run_city(city: &str, args: &RunArgs, token: &CancellationToken) -> Result<RunResult, SimError> {
    let config = args.config()?;
    let mut simulation = Simulation::new(&config, city)?;
    if !args.policies.is_empty() {
        simulation.apply_policies(args.policies.as_slice());
    }

    let mut provider = OfflineProvider::new(config.simulation.seed);
    let mut logger = args.logger(simulation.city())?;
    Ok(simulation.run(&mut provider, token, &mut logger))
}

fn print_summary(result: &RunResult) {
    println!();
    println!("{} ({:?}, {}/{} rounds)", result.city, result.status, result.rounds_completed, result.num_rounds);
    if !result.policy_interventions.is_empty() {
        println!("  Policies: {}", result.policy_interventions.join(", "));
    }
    if !result.recommended_policies.is_empty() {
        println!("  Recommended: {}", result.recommended_policies.join(", "));
    }
    match &result.metrics {
        Some(m) => {
            println!("  Avg response time:   {:.3}", m.efficiency.avg_response_time);
            println!("  Resolution rate:     {:.3}", m.efficiency.resolution_rate);
            println!("  Service access gini: {:.3}", m.fairness.service_access_gini);
            println!("  Digital divide:      {:.3}", m.fairness.digital_divide_index);
            println!("  Recovery speed:      {:.3}", m.resilience.system_recovery_speed);
            println!("  Cooperation index:   {:.3}", m.collaboration.cooperation_index);
            println!("  System health:       {:.3}", m.agent_status.overall_status.system_health);
        }
        None => println!("  Metrics unavailable"),
    }
}

fn execute(command: Command) -> Result<(), SimError> {
    match command {
        Command::Run { city, common } => {
            let token = CancellationToken::new();
            install_interrupt_handler(token.clone());

            let result = run_city(&city, &common, &token)?;
            print_summary(&result);
            let path = write_results(&result, &common.output_dir)?;
            println!("  Results written to {}", path.display());
        }
        Command::Compare { cities, common } => {
            let token = CancellationToken::new();
            install_interrupt_handler(token.clone());

            let mut runs = Vec::with_capacity(cities.len());
            for city in &cities {
                if token.is_cancelled() {
                    break;
                }
                let result = run_city(city, &common, &token)?;
                print_summary(&result);
                runs.push(result);
            }

            let comparison_summary = match runs.as_slice() {
                [a, b, ..] => compare_runs(a, b),
                _ => None,
            };
            if let Some(summary) = &comparison_summary {
                println!();
                println!("Efficiency winner: {}", summary.efficiency_comparison.winner);
                println!("Fairness winner:   {}", summary.fairness_comparison.winner);
            }

            let report = ComparisonReport {
                runs,
                comparison_summary,
            };
            let path = write_json(&report, &common.output_dir, "city_comparison.json")?;
            println!("Comparison written to {}", path.display());
        }
        Command::Policies { config, city } => {
            let config = load_config(config.as_deref())?;
            let preview = city.as_deref().map(|c| Simulation::new(&config, c)).transpose()?;
            let engine = PolicyEngine::new(config.policies);
            for name in engine.policy_names() {
                if let Some(policy) = engine.policy(name) {
                    println!(
                        "{:<34} {:<22} {}",
                        name,
                        policy.target,
                        policy.description.as_deref().unwrap_or("")
                    );
                }
                if let Some(sim) = &preview {
                    let impact = sim.preview_policy(name)?;
                    println!("    {}", serde_json::to_string(&impact.estimated_effects)?);
                }
            }
        }
        Command::InitConfig { path, force } => {
            if path.exists() && !force {
                eprintln!("Error: {} already exists (use --force to overwrite)", path.display());
                std::process::exit(1);
            }
            fs::write(&path, SimConfig::default().to_toml()?)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = execute(cli.command) {
        error!("{}", e);
        std::process::exit(1);
    }
}
