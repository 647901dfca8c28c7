use std::io;

use serde::Serialize;

use crate::config::{load_input, AppConfig};
use crate::optimizer::monte_carlo::run_monte_carlo_parallel;
use crate::optimizer::report::{radio_message, summarize};
use crate::optimizer::strategy_generator::GenerationStrategy;
use crate::optimizer::{optimize_scenario, RankingScenario};
use crate::parallel::WorkerPool;
use crate::race::compound::Compound;
use crate::race::model::{EvaluatedPlan, StrategyInput, StrategyPlan, Stint};
use crate::race::rng::entropy_seed;
use crate::server;

const USAGE: &str = "usage: pitwall <serve|generate|simulate|rank|validate>";

/// Positional placeholder meaning "use PITWALL_CONFIG or built-in defaults".
const DEFAULT_CONFIG_ARG: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Generate,
    Simulate,
    Rank,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("generate") => Some(Command::Generate),
        Some("simulate") => Some(Command::Simulate),
        Some("rank") => Some(Command::Rank),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(args),
        Some(Command::Generate) => handle_generate(args),
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Rank) => handle_rank(args),
        Some(Command::Validate) => handle_validate(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn handle_serve(args: &[String]) -> i32 {
    let Some(config) = load_app_config(positional(args).first().copied()) else {
        return 1;
    };
    match server::run_server(config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_generate(args: &[String]) -> i32 {
    let positional = positional(args);
    let Some(config) = load_app_config(positional.first().copied()) else {
        return 1;
    };
    let seed = resolve_seed(positional.get(1).copied(), config.seed);

    let scenario = RankingScenario {
        seed,
        generation: GenerationStrategy {
            max_stops: config.max_stops,
            ..GenerationStrategy::default()
        },
        ..RankingScenario::new(&config.input)
    };
    print_json(&scenario.candidates(), "candidate plans")
}

fn handle_simulate(args: &[String]) -> i32 {
    let positional = positional(args);
    let Some(config) = load_app_config(positional.first().copied()) else {
        return 1;
    };
    let samples = parse_usize_arg(positional.get(1).copied(), "samples", config.samples).max(1);
    let seed = resolve_seed(positional.get(2).copied(), config.seed);
    let as_table = args.iter().any(|arg| arg == "--table");

    let plans = match flag_value(args, "--plan") {
        Some(key) => match parse_plan(key, &config.input) {
            Ok(plan) => vec![plan],
            Err(message) => {
                eprintln!("{message}");
                return 2;
            }
        },
        None => canonical_plans(&config.input),
    };
    if plans.is_empty() {
        eprintln!("no canonical plan fits this race; pass --plan SOFT:20,HARD:38");
        return 1;
    }

    let evaluated = run_monte_carlo_parallel(&config.input, &plans, samples, seed);

    if as_table {
        println!("plan\tsamples\tseed\tmean_ms\tp95_ms");
        for result in &evaluated {
            println!(
                "{}\t{}\t{}\t{:.3}\t{:.3}",
                result.plan.key(),
                samples,
                seed,
                result.mean,
                result.p95
            );
        }
        0
    } else {
        print_json(&evaluated, "simulation result")
    }
}

fn handle_rank(args: &[String]) -> i32 {
    let positional = positional(args);
    let Some(config) = load_app_config(positional.first().copied()) else {
        return 1;
    };
    let samples = parse_usize_arg(positional.get(1).copied(), "samples", config.samples);
    let seed = resolve_seed(positional.get(2).copied(), config.seed);
    let as_csv = args.iter().any(|arg| arg == "--csv");

    let ranked = optimize_scenario(&RankingScenario {
        samples,
        top_k: config.top_k,
        seed,
        generation: GenerationStrategy {
            max_stops: config.max_stops,
            ..GenerationStrategy::default()
        },
        pool: WorkerPool::with_workers(config.workers),
        ..RankingScenario::new(&config.input)
    });

    if as_csv {
        return match write_rank_csv(&ranked, io::stdout()) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("failed to write csv: {err}");
                1
            }
        };
    }

    if let Some(best) = ranked.first() {
        eprintln!("radio: {}", radio_message(best));
    }
    print_json(&ranked, "ranking")
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = positional(args).first().copied() else {
        eprintln!("usage: pitwall validate <input.json|input.yaml>");
        return 2;
    };

    match load_input(path) {
        Ok(input) => {
            println!(
                "validation passed: {path} ({} laps, {} compounds)",
                input.race.laps,
                input.race.compounds.len()
            );
            0
        }
        Err(err) => {
            eprintln!("{path}: {err}");
            1
        }
    }
}

#[derive(Debug, Serialize)]
struct RankCsvRow {
    rank: usize,
    stints: String,
    mean_ms: f64,
    p95_ms: f64,
    spread_ms: f64,
}

pub fn write_rank_csv<W: io::Write>(ranked: &[EvaluatedPlan], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for (index, result) in ranked.iter().enumerate() {
        writer.serialize(RankCsvRow {
            rank: index + 1,
            stints: result.plan.key(),
            mean_ms: result.mean,
            p95_ms: result.p95,
            spread_ms: summarize(result).spread_ms,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// One-stop MEDIUM to HARD at half distance and a three-way SOFT/MEDIUM/HARD split.
/// Plans using a compound the race does not allow are left out.
pub fn canonical_plans(input: &StrategyInput) -> Vec<StrategyPlan> {
    let laps = input.race.laps;
    let mut plans = Vec::with_capacity(2);

    if laps >= 2 {
        let first = laps / 2;
        plans.push(StrategyPlan::new(vec![
            Stint::new(Compound::Medium, first),
            Stint::new(Compound::Hard, laps - first),
        ]));
    }
    if laps >= 3 {
        let third = laps / 3;
        plans.push(StrategyPlan::new(vec![
            Stint::new(Compound::Soft, third),
            Stint::new(Compound::Medium, third),
            Stint::new(Compound::Hard, laps - 2 * third),
        ]));
    }

    plans.retain(|plan| plan.check_compounds(&input.race.compounds).is_ok());
    plans
}

fn parse_plan(key: &str, input: &StrategyInput) -> Result<StrategyPlan, String> {
    let plan: StrategyPlan = key
        .parse()
        .map_err(|err| format!("invalid --plan '{key}': {err}"))?;
    plan.check_fits(input)
        .map_err(|err| format!("invalid --plan '{key}': {err}"))?;
    Ok(plan)
}

fn load_app_config(raw: Option<&str>) -> Option<AppConfig> {
    let loaded = match raw {
        Some(path) if path != DEFAULT_CONFIG_ARG => AppConfig::load(path).map(|mut config| {
            config.apply_env_overrides();
            config
        }),
        _ => AppConfig::from_env(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(err) => {
            eprintln!("config error: {err}");
            None
        }
    }
}

/// Arguments after the command, minus `--flags` and the value following `--plan`.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(2) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--plan" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn print_json<T: Serialize + ?Sized>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

fn resolve_seed(raw: Option<&str>, configured: Option<u64>) -> u64 {
    match raw {
        Some(_) => parse_u64_arg(raw, "seed", configured.unwrap_or_else(entropy_seed)),
        None => configured.unwrap_or_else(entropy_seed),
    }
}

fn parse_usize_arg(raw: Option<&str>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_u64_arg(raw: Option<&str>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
