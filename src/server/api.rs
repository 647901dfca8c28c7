use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;
use crate::error::{ValidationError, ValidationIssue};
use crate::live::ConfigStore;
use crate::optimizer::monte_carlo::evaluate_plan;
use crate::optimizer::report::{summarize, StrategySummary};
use crate::optimizer::strategy_generator::GenerationStrategy;
use crate::optimizer::{optimize_scenario, RankingScenario};
use crate::parallel::WorkerPool;
use crate::race::model::{EvaluatedPlan, Stint, StrategyInput, StrategyPlan};
use crate::race::rng::entropy_seed;

pub const MAX_SAMPLES: usize = 20_000;
pub const MAX_TOP_K: usize = 40;
pub const MAX_STOPS: u32 = 5;

/// Server-wide fallbacks for fields a request leaves out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApiDefaults {
    pub samples: usize,
    pub top_k: usize,
    pub max_stops: u32,
    pub workers: usize,
    pub seed: Option<u64>,
}

impl From<&AppConfig> for ApiDefaults {
    fn from(config: &AppConfig) -> Self {
        Self {
            samples: config.samples,
            top_k: config.top_k,
            max_stops: config.max_stops,
            workers: config.workers,
            seed: config.seed,
        }
    }
}

impl Default for ApiDefaults {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankRequest {
    pub input: Option<StrategyInput>,
    pub samples: Option<usize>,
    pub top_k: Option<usize>,
    pub max_stops: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlanSpec {
    Key(String),
    Plan(StrategyPlan),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub input: Option<StrategyInput>,
    pub plan: PlanSpec,
    pub samples: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub laps: u32,
    pub samples: usize,
    pub top_k: usize,
    pub max_stops: u32,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedStrategy {
    pub rank: usize,
    pub key: String,
    pub stints: Vec<Stint>,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub summary: StrategySummary,
}

impl RankedStrategy {
    fn from_evaluated(rank: usize, evaluated: EvaluatedPlan) -> Self {
        let summary = summarize(&evaluated);
        Self {
            rank,
            key: evaluated.plan.key(),
            stints: evaluated.plan.stints,
            mean_ms: evaluated.mean,
            p95_ms: evaluated.p95,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankResponse {
    pub status: &'static str,
    pub engine: &'static str,
    pub scenario: ScenarioSummary,
    pub results: Vec<RankedStrategy>,
    pub notes: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    pub status: &'static str,
    pub samples: usize,
    pub seed: u64,
    pub result: RankedStrategy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

impl From<ValidationError> for ValidationErrorResponse {
    fn from(err: ValidationError) -> Self {
        Self {
            status: "error",
            message: "Validation failed",
            errors: err.issues,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("internal error: {0}")]
    Internal(String),
}

pub fn health_payload() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "service": "pitwall-api",
        "version": env!("CARGO_PKG_VERSION")
    })
}

pub fn config_put_payload(body: &str, store: &ConfigStore) -> Result<StrategyInput, ApiError> {
    let input: StrategyInput = serde_json::from_str(body)?;
    let stored = store.replace(input)?;
    Ok((*stored).clone())
}

pub fn rank_payload(
    body: &str,
    store: &ConfigStore,
    defaults: &ApiDefaults,
) -> Result<RankResponse, ApiError> {
    let request: RankRequest = parse_body(body)?;
    let samples = request.samples.unwrap_or(defaults.samples);
    let top_k = request.top_k.unwrap_or(defaults.top_k);
    let max_stops = request.max_stops.unwrap_or(defaults.max_stops);
    validate_rank_request(samples, top_k, max_stops)?;

    let input = resolve_input(request.input, store)?;
    let seed = request.seed.or(defaults.seed).unwrap_or_else(entropy_seed);

    let scenario = RankingScenario {
        samples,
        top_k,
        seed,
        generation: GenerationStrategy {
            max_stops,
            ..GenerationStrategy::default()
        },
        pool: WorkerPool::with_workers(defaults.workers),
        ..RankingScenario::new(&input)
    };
    let ranked = optimize_scenario(&scenario);

    Ok(RankResponse {
        status: "ok",
        engine: "monte_carlo_v1",
        scenario: ScenarioSummary {
            laps: input.race.laps,
            samples,
            top_k,
            max_stops,
            seed,
        },
        results: ranked
            .into_iter()
            .enumerate()
            .map(|(index, evaluated)| RankedStrategy::from_evaluated(index + 1, evaluated))
            .collect(),
        notes: vec![
            "Results are ranked by mean total race time; p95 is the nearest-rank tail.",
            "Results are deterministic for the same input, sample count, stop cap and seed.",
        ],
    })
}

pub fn evaluate_payload(
    body: &str,
    store: &ConfigStore,
    defaults: &ApiDefaults,
) -> Result<EvaluateResponse, ApiError> {
    let request: EvaluateRequest = serde_json::from_str(body)?;
    let samples = request.samples.unwrap_or(defaults.samples);
    if !(1..=MAX_SAMPLES).contains(&samples) {
        return Err(ValidationError::single("samples", format!("must be between 1 and {MAX_SAMPLES}")).into());
    }

    let input = resolve_input(request.input, store)?;
    let plan = match request.plan {
        PlanSpec::Key(key) => key.parse::<StrategyPlan>()?,
        PlanSpec::Plan(plan) => plan,
    };
    plan.check_fits(&input)?;
    let seed = request.seed.or(defaults.seed).unwrap_or_else(entropy_seed);

    let evaluated = evaluate_plan(&input, &plan, samples, seed);
    Ok(EvaluateResponse {
        status: "ok",
        samples,
        seed,
        result: RankedStrategy::from_evaluated(1, evaluated),
    })
}

/// Blank bodies mean "all defaults".
fn parse_body<T>(body: &str) -> Result<T, ApiError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(body)?)
}

fn resolve_input(
    supplied: Option<StrategyInput>,
    store: &ConfigStore,
) -> Result<StrategyInput, ApiError> {
    match supplied {
        Some(input) => {
            input.validate()?;
            Ok(input)
        }
        None => Ok((*store.snapshot()).clone()),
    }
}

fn validate_rank_request(samples: usize, top_k: usize, max_stops: u32) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if !(1..=MAX_SAMPLES).contains(&samples) {
        errors.push(ValidationIssue::new(
            "samples",
            format!("must be between 1 and {MAX_SAMPLES}"),
        ));
    }
    if !(1..=MAX_TOP_K).contains(&top_k) {
        errors.push(ValidationIssue::new(
            "top_k",
            format!("must be between 1 and {MAX_TOP_K}"),
        ));
    }
    if max_stops > MAX_STOPS {
        errors.push(ValidationIssue::new(
            "max_stops",
            format!("must be between 0 and {MAX_STOPS}"),
        ));
    }

    ValidationError::from_issues(errors).map_err(ApiError::from)
}
