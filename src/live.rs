//! Process-wide current input and the periodic re-ranking loop that feeds live listeners.
//!
//! The store swaps whole immutable snapshots; a pass that is already running keeps the
//! `Arc` it started with, so replacing the input never disturbs it.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::optimizer::strategy_generator::GenerationStrategy;
use crate::optimizer::{optimize_scenario, RankingScenario};
use crate::parallel::WorkerPool;
use crate::race::model::{EvaluatedPlan, StrategyInput};
use crate::race::rng::entropy_seed;

#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<StrategyInput>>,
}

impl ConfigStore {
    pub fn new(input: StrategyInput) -> Result<Self, ValidationError> {
        input.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(input)),
        })
    }

    pub fn snapshot(&self) -> Arc<StrategyInput> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Validate and swap in a new input. The previous snapshot stays alive for any holder.
    pub fn replace(&self, input: StrategyInput) -> Result<Arc<StrategyInput>, ValidationError> {
        input.validate()?;
        let next = Arc::new(input);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        Ok(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSettings {
    pub samples: usize,
    pub top_k: usize,
    pub max_stops: u32,
    pub refresh_interval: Duration,
    pub workers: usize,
    pub seed: Option<u64>,
}

impl From<&AppConfig> for LiveSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            samples: config.samples,
            top_k: config.top_k,
            max_stops: config.max_stops,
            refresh_interval: config.refresh_interval(),
            workers: config.workers,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveSnapshot {
    pub pass_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub input: StrategyInput,
    pub results: Vec<EvaluatedPlan>,
}

/// One self-contained generate-and-rank pass over `input`.
pub fn run_pass(input: &StrategyInput, settings: &LiveSettings) -> LiveSnapshot {
    let seed = settings.seed.unwrap_or_else(entropy_seed);
    let scenario = RankingScenario {
        samples: settings.samples,
        top_k: settings.top_k,
        seed,
        generation: GenerationStrategy {
            max_stops: settings.max_stops,
            ..GenerationStrategy::default()
        },
        pool: WorkerPool::with_workers(settings.workers),
        ..RankingScenario::new(input)
    };
    LiveSnapshot {
        pass_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        seed,
        input: input.clone(),
        results: optimize_scenario(&scenario),
    }
}

pub type LiveReceiver = watch::Receiver<Option<Arc<LiveSnapshot>>>;

/// Handle to a running refresh loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct LiveRanker {
    receiver: LiveReceiver,
    task: JoinHandle<()>,
}

impl LiveRanker {
    /// Start ticking on the current tokio runtime. The first pass runs immediately.
    pub fn spawn(store: Arc<ConfigStore>, settings: LiveSettings) -> Self {
        let (sender, receiver) = watch::channel(None);
        let task = tokio::spawn(refresh_loop(store, settings, sender));
        Self { receiver, task }
    }

    pub fn subscribe(&self) -> LiveReceiver {
        self.receiver.clone()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for LiveRanker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh_loop(
    store: Arc<ConfigStore>,
    settings: LiveSettings,
    sender: watch::Sender<Option<Arc<LiveSnapshot>>>,
) {
    let mut ticker = tokio::time::interval(settings.refresh_interval);
    // A pass that overruns the interval swallows the ticks it missed.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let input = store.snapshot();
        let pass = tokio::task::spawn_blocking(move || run_pass(&input, &settings)).await;
        match pass {
            Ok(snapshot) => {
                debug!(pass_id = %snapshot.pass_id, results = snapshot.results.len(), "live pass complete");
                sender.send_replace(Some(Arc::new(snapshot)));
            }
            Err(err) => warn!("live pass discarded: {err}"),
        }
    }
}
