//! Race, track and car inputs plus the plan value types that flow through the optimizer.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationIssue};
use crate::race::compound::Compound;

pub const MIN_DEGRADATION_FACTOR: f64 = 0.5;
pub const MAX_DEGRADATION_FACTOR: f64 = 2.0;
/// Upper bound on race distance. Every lap costs two draws per sample per plan.
pub const MAX_RACE_LAPS: u32 = 500;
pub const DEFAULT_LAP_LENGTH_KM: f64 = 5.412;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    pub laps: u32,
    /// Informational only; the simulator works in laps.
    #[serde(default = "default_lap_length_km")]
    pub lap_length_km: f64,
    pub compounds: BTreeSet<Compound>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConditions {
    /// Informational only.
    #[serde(default)]
    pub ambient_temp_c: f64,
    pub sc_probability_per_10_min: f64,
    #[serde(default = "default_degradation_factor")]
    pub degradation_factor: f64,
}

fn default_lap_length_km() -> f64 {
    DEFAULT_LAP_LENGTH_KM
}

fn default_degradation_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarParams {
    pub base_lap_time_ms: f64,
    pub pit_stop_loss_ms: f64,
    pub fuel_per_lap_kg: f64,
    pub fuel_weight_penalty_ms_per_kg: f64,
}

/// Everything one evaluation pass reads. Never mutated while a pass is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInput {
    pub race: RaceConfig,
    pub track: TrackConditions,
    pub car: CarParams,
}

impl Default for StrategyInput {
    fn default() -> Self {
        Self {
            race: RaceConfig {
                laps: 58,
                lap_length_km: DEFAULT_LAP_LENGTH_KM,
                compounds: Compound::ALL.into_iter().collect(),
            },
            track: TrackConditions {
                ambient_temp_c: 30.0,
                sc_probability_per_10_min: 0.2,
                degradation_factor: 1.0,
            },
            car: CarParams {
                base_lap_time_ms: 82_000.0,
                pit_stop_loss_ms: 21_000.0,
                fuel_per_lap_kg: 1.6,
                fuel_weight_penalty_ms_per_kg: 1.6,
            },
        }
    }
}

impl StrategyInput {
    /// Boundary validation. The core assumes inputs that pass this.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if !(1..=MAX_RACE_LAPS).contains(&self.race.laps) {
            issues.push(ValidationIssue::new(
                "race.laps",
                format!("must be between 1 and {MAX_RACE_LAPS}"),
            ));
        }
        if self.race.compounds.is_empty() {
            issues.push(ValidationIssue::new(
                "race.compounds",
                "must contain at least one compound",
            ));
        }
        if !self.race.lap_length_km.is_finite() || self.race.lap_length_km <= 0.0 {
            issues.push(ValidationIssue::new(
                "race.lap_length_km",
                "must be a positive number",
            ));
        }
        if !self.track.ambient_temp_c.is_finite() {
            issues.push(ValidationIssue::new("track.ambient_temp_c", "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.track.sc_probability_per_10_min) {
            issues.push(ValidationIssue::new(
                "track.sc_probability_per_10_min",
                "must be within [0, 1]",
            ));
        }
        if !(MIN_DEGRADATION_FACTOR..=MAX_DEGRADATION_FACTOR)
            .contains(&self.track.degradation_factor)
        {
            issues.push(ValidationIssue::new(
                "track.degradation_factor",
                format!("must be within [{MIN_DEGRADATION_FACTOR}, {MAX_DEGRADATION_FACTOR}]"),
            ));
        }
        for (field, value) in [
            ("car.base_lap_time_ms", self.car.base_lap_time_ms),
            ("car.pit_stop_loss_ms", self.car.pit_stop_loss_ms),
            ("car.fuel_per_lap_kg", self.car.fuel_per_lap_kg),
            (
                "car.fuel_weight_penalty_ms_per_kg",
                self.car.fuel_weight_penalty_ms_per_kg,
            ),
        ] {
            if !value.is_finite() || value <= 0.0 {
                issues.push(ValidationIssue::new(field, "must be a positive number"));
            }
        }

        ValidationError::from_issues(issues)
    }

    pub fn starting_fuel_kg(&self) -> f64 {
        f64::from(self.race.laps) * self.car.fuel_per_lap_kg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stint {
    pub compound: Compound,
    pub laps: u32,
}

impl Stint {
    pub fn new(compound: Compound, laps: u32) -> Self {
        Self { compound, laps }
    }
}

/// Ordered stints covering the whole race. N stints means N - 1 pit stops.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub stints: Vec<Stint>,
}

impl StrategyPlan {
    pub fn new(stints: Vec<Stint>) -> Self {
        Self { stints }
    }

    pub fn single(compound: Compound, laps: u32) -> Self {
        Self::new(vec![Stint::new(compound, laps)])
    }

    pub fn total_laps(&self) -> u32 {
        self.stints.iter().map(|stint| stint.laps).sum()
    }

    pub fn pit_stops(&self) -> usize {
        self.stints.len().saturating_sub(1)
    }

    /// Laps after which the car pits, 1-based and cumulative.
    pub fn pit_laps(&self) -> Vec<u32> {
        let mut lap = 0;
        let mut out = Vec::with_capacity(self.pit_stops());
        for stint in self.stints.iter().take(self.pit_stops()) {
            lap += stint.laps;
            out.push(lap);
        }
        out
    }

    /// Canonical identity, e.g. `SOFT:20,HARD:38`. Two plans are the same plan iff keys match.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Check the plan covers exactly `race_laps` with no empty stint.
    pub fn check_covers(&self, race_laps: u32) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if self.stints.is_empty() {
            issues.push(ValidationIssue::new("plan.stints", "must contain at least one stint"));
        }
        for (index, stint) in self.stints.iter().enumerate() {
            if stint.laps == 0 {
                issues.push(ValidationIssue::new(
                    format!("plan.stints[{index}].laps"),
                    "must be at least 1",
                ));
            }
        }
        let total = self.total_laps();
        if !self.stints.is_empty() && total != race_laps {
            issues.push(ValidationIssue::new(
                "plan.stints",
                format!("lap counts sum to {total}, race is {race_laps} laps"),
            ));
        }
        ValidationError::from_issues(issues)
    }

    /// Check every stint runs a compound the race allows.
    pub fn check_compounds(&self, allowed: &BTreeSet<Compound>) -> Result<(), ValidationError> {
        let issues = self
            .stints
            .iter()
            .enumerate()
            .filter(|(_, stint)| !allowed.contains(&stint.compound))
            .map(|(index, stint)| {
                ValidationIssue::new(
                    format!("plan.stints[{index}].compound"),
                    format!("{} is not allowed in this race", stint.compound),
                )
            })
            .collect();
        ValidationError::from_issues(issues)
    }

    /// [StrategyPlan::check_covers] and [StrategyPlan::check_compounds] against one input.
    pub fn check_fits(&self, input: &StrategyInput) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if let Err(err) = self.check_covers(input.race.laps) {
            issues.extend(err.issues);
        }
        if let Err(err) = self.check_compounds(&input.race.compounds) {
            issues.extend(err.issues);
        }
        ValidationError::from_issues(issues)
    }
}

impl fmt::Display for StrategyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, stint) in self.stints.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", stint.compound, stint.laps)?;
        }
        Ok(())
    }
}

impl FromStr for StrategyPlan {
    type Err = ValidationError;

    /// Parses the canonical key form, `SOFT:20,HARD:38`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stints = Vec::new();
        for (index, part) in s.split(',').filter(|p| !p.trim().is_empty()).enumerate() {
            let field = format!("plan.stints[{index}]");
            let Some((compound, laps)) = part.split_once(':') else {
                return Err(ValidationError::single(field, "expected COMPOUND:LAPS"));
            };
            let compound = compound
                .parse::<Compound>()
                .map_err(|err| ValidationError::single(field.clone(), err.to_string()))?;
            let laps = laps
                .trim()
                .parse::<u32>()
                .map_err(|_| ValidationError::single(field, format!("invalid lap count '{}'", laps.trim())))?;
            stints.push(Stint::new(compound, laps));
        }
        if stints.is_empty() {
            return Err(ValidationError::single("plan.stints", "must contain at least one stint"));
        }
        Ok(Self::new(stints))
    }
}

/// One plan's Monte Carlo summary, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedPlan {
    pub plan: StrategyPlan,
    #[serde(rename = "mean_ms")]
    pub mean: f64,
    #[serde(rename = "p95_ms")]
    pub p95: f64,
}
