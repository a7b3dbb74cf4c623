//! TokenSwarm simulator CLI
//!
//! Run seeded swarm scenarios, optionally with a faulty-agent classifier.

use clap::Parser;
use std::num::{NonZeroU64, NonZeroUsize};
use std::path::PathBuf;
use tokenswarm_sim::{ClassifierSpec, ScenarioId, ScenarioResult, ScenarioRunner, SimError, SimExport};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// TokenSwarm simulation CLI
#[derive(Parser, Debug)]
#[command(name = "tokenswarm-sim")]
#[command(about = "Run seeded Byzantine token-search simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Scenario to run (baseline, honest_swarm, byzantine_majority, center_start, sparse_field, crowd, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Run length in logical seconds
    #[arg(short, long, default_value = "100")]
    duration: u64,

    /// Seconds between communication rounds
    #[arg(long, default_value = "10")]
    comm_interval: NonZeroU64,

    /// Classifier kind (per_sample / random_forest, sequential / lstm)
    #[arg(long, requires = "classifier_path")]
    classifier_kind: Option<String>,

    /// Path to the classifier's JSON artifact
    #[arg(long, requires = "classifier_kind")]
    classifier_path: Option<PathBuf>,

    /// Sequence length for sequential classifiers
    #[arg(long, default_value = "5")]
    window: NonZeroUsize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the communication log and results to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), SimError> {
    if !args.json {
        info!("TokenSwarm Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                error!("{}", e);
                let names: Vec<_> = ScenarioId::all().iter().map(|s| s.name()).collect();
                error!("Available scenarios: {}, all", names.join(", "));
                std::process::exit(1);
            }
        }
    };

    // Unknown kinds are rejected here, before any run starts
    let classifier = match (&args.classifier_kind, &args.classifier_path) {
        (Some(kind), Some(path)) => Some(ClassifierSpec::parse(kind, path, args.window)?),
        _ => None,
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        error!("--export only supports a single scenario and a single seed");
        std::process::exit(1);
    }

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let mut runner = ScenarioRunner::new(seed)
            .with_duration(args.duration)
            .with_comm_interval(args.comm_interval);
        if let Some(spec) = &classifier {
            runner = runner.with_classifier(spec.clone());
        }

        for scenario in &scenarios {
            let result = runner.run(*scenario)?;

            if !args.json {
                report(&result);
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    if let Some(path) = &args.export {
        if let Some(result) = all_results.first() {
            let export = SimExport::from_result(result);
            export.write_to_file(path)?;
            info!("Exported {} communications to {}", export.communications.len(), path.display());
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "rounds": r.rounds,
                    "active_agents": r.active_agents,
                    "tokens": r.tokens.len(),
                    "evaluation": r.evaluation,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("All {} scenario runs passed", total);
        } else {
            error!("{}/{} scenario runs failed", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn report(result: &ScenarioResult) {
    let eval = &result.evaluation;
    if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario.name(), result.seed);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }

    info!(
        "  {} tokens accepted | precision {:.2} | recall {:.2} | {} rounds | {} agents active",
        result.tokens.len(),
        eval.tokens.precision,
        eval.tokens.recall,
        result.rounds,
        result.active_agents
    );

    if let Some(detection) = &eval.detection {
        info!(
            "  excluded {} ({} byzantine of {}) | detection precision {:.2} | recall {:.2}",
            detection.excluded,
            detection.excluded_byzantine,
            detection.total_byzantine,
            detection.precision,
            detection.recall
        );
    }

    let mut tokens: Vec<_> = result.tokens.iter().collect();
    tokens.sort();
    for token in tokens {
        debug!("    {}", token);
    }
}
