pub mod compound;
pub mod model;
pub mod rng;
pub mod simulator;

pub use compound::{Compound, CompoundModel, UnknownCompound};
pub use model::{
    CarParams, EvaluatedPlan, RaceConfig, Stint, StrategyInput, StrategyPlan, TrackConditions,
    DEFAULT_LAP_LENGTH_KM, MAX_DEGRADATION_FACTOR, MAX_RACE_LAPS, MIN_DEGRADATION_FACTOR,
};
pub use rng::{entropy_seed, RandomStream, ScriptedStream, SplitMix64};
pub use simulator::{
    simulate_once, simulate_traced, LapRecord, LapSimulator, PitStopRecord, RaceTrace,
    SimConstants, TraceMode,
};
