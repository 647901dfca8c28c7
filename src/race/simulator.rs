//! Single-race lap simulation: tyre wear, fuel burn, safety-car state and pit losses.
//!
//! Each lap consumes exactly two draws from the stream, in order: the safety-car
//! transition, then lap-time jitter. A simulation reads only its arguments, so any
//! number can run concurrently without synchronization.

use serde::Serialize;

use crate::race::compound::Compound;
use crate::race::model::{StrategyInput, StrategyPlan};
use crate::race::rng::RandomStream;

/// Tunable physics for the stochastic parts of a race.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConstants {
    /// Per-lap caution hazard = per-10-minute probability * this scale.
    pub caution_hazard_scale: f64,
    /// Upper bound on the per-lap caution hazard.
    pub caution_hazard_cap: f64,
    /// Per-lap probability of leaving caution once under it.
    pub caution_exit_probability: f64,
    /// Half-width of the uniform multiplicative lap-time jitter.
    pub jitter_half_width: f64,
    /// Lap-time multiplier while under caution.
    pub caution_slowdown: f64,
    /// Pit loss multiplier when the stop happens under caution.
    pub caution_pit_discount: f64,
}

impl Default for SimConstants {
    fn default() -> Self {
        Self {
            caution_hazard_scale: 0.1,
            caution_hazard_cap: 0.5,
            caution_exit_probability: 0.15,
            jitter_half_width: 0.005,
            caution_slowdown: 1.10,
            caution_pit_discount: 0.65,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    Off,
    Laps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    /// 1-based race lap.
    pub lap: u32,
    pub stint: usize,
    pub compound: Compound,
    /// 0-based laps already run on this set of tyres.
    pub tyre_age: u32,
    pub fuel_kg: f64,
    pub under_caution: bool,
    pub lap_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitStopRecord {
    pub after_lap: u32,
    pub from: Compound,
    pub to: Compound,
    pub loss_ms: f64,
    pub under_caution: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RaceTrace {
    pub total_ms: f64,
    pub laps: Vec<LapRecord>,
    pub pit_stops: Vec<PitStopRecord>,
}

impl RaceTrace {
    pub fn caution_laps(&self) -> usize {
        self.laps.iter().filter(|lap| lap.under_caution).count()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LapSimulator {
    constants: SimConstants,
}

impl LapSimulator {
    pub fn new(constants: SimConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &SimConstants {
        &self.constants
    }

    /// Per-lap probability of a safety car appearing.
    pub fn caution_entry_probability(&self, input: &StrategyInput) -> f64 {
        (input.track.sc_probability_per_10_min * self.constants.caution_hazard_scale)
            .min(self.constants.caution_hazard_cap)
    }

    /// Total race time in milliseconds for one draw of `rng`.
    pub fn simulate_once<R>(&self, input: &StrategyInput, plan: &StrategyPlan, rng: &mut R) -> f64
    where
        R: RandomStream + ?Sized,
    {
        self.run(input, plan, rng, TraceMode::Off).total_ms
    }

    /// Like [LapSimulator::simulate_once] but records every lap and stop.
    pub fn simulate_traced<R>(
        &self,
        input: &StrategyInput,
        plan: &StrategyPlan,
        rng: &mut R,
    ) -> RaceTrace
    where
        R: RandomStream + ?Sized,
    {
        self.run(input, plan, rng, TraceMode::Laps)
    }

    fn run<R>(
        &self,
        input: &StrategyInput,
        plan: &StrategyPlan,
        rng: &mut R,
        trace_mode: TraceMode,
    ) -> RaceTrace
    where
        R: RandomStream + ?Sized,
    {
        assert_plan_fits(input, plan);

        let c = &self.constants;
        let car = &input.car;
        let degradation = input.track.degradation_factor;
        let entry_probability = self.caution_entry_probability(input);
        let tracing_laps = trace_mode == TraceMode::Laps;

        let mut trace = RaceTrace::default();
        if tracing_laps {
            trace.laps.reserve(input.race.laps as usize);
        }
        let mut total = 0.0;
        let mut fuel = input.starting_fuel_kg();
        let mut under_caution = false;
        let mut race_lap = 0u32;
        let last_stint = plan.stints.len() - 1;

        for (stint_index, stint) in plan.stints.iter().enumerate() {
            let model = stint.compound.model();
            for age in 0..stint.laps {
                race_lap += 1;

                let transition = rng.next_unit();
                if under_caution {
                    if transition < c.caution_exit_probability {
                        under_caution = false;
                    }
                } else if transition < entry_probability {
                    under_caution = true;
                }

                let fuel_penalty = fuel * car.fuel_weight_penalty_ms_per_kg;
                let wear_penalty = model.wear_ms_per_lap * degradation * f64::from(age);
                let mut lap_time =
                    car.base_lap_time_ms + model.lap_delta_ms + fuel_penalty + wear_penalty;

                let jitter = (2.0 * rng.next_unit() - 1.0) * c.jitter_half_width;
                lap_time *= 1.0 + jitter;
                if under_caution {
                    lap_time *= c.caution_slowdown;
                }

                if tracing_laps {
                    trace.laps.push(LapRecord {
                        lap: race_lap,
                        stint: stint_index,
                        compound: stint.compound,
                        tyre_age: age,
                        fuel_kg: fuel,
                        under_caution,
                        lap_time_ms: lap_time,
                    });
                }

                total += lap_time;
                fuel = (fuel - car.fuel_per_lap_kg).max(0.0);
            }

            if stint_index < last_stint {
                let loss = if under_caution {
                    car.pit_stop_loss_ms * c.caution_pit_discount
                } else {
                    car.pit_stop_loss_ms
                };
                total += loss;
                if tracing_laps {
                    trace.pit_stops.push(PitStopRecord {
                        after_lap: race_lap,
                        from: stint.compound,
                        to: plan.stints[stint_index + 1].compound,
                        loss_ms: loss,
                        under_caution,
                    });
                }
            }
        }

        trace.total_ms = total;
        trace
    }
}

/// [LapSimulator::simulate_once] with the default constants.
pub fn simulate_once<R>(input: &StrategyInput, plan: &StrategyPlan, rng: &mut R) -> f64
where
    R: RandomStream + ?Sized,
{
    LapSimulator::default().simulate_once(input, plan, rng)
}

/// [LapSimulator::simulate_traced] with the default constants.
pub fn simulate_traced<R>(input: &StrategyInput, plan: &StrategyPlan, rng: &mut R) -> RaceTrace
where
    R: RandomStream + ?Sized,
{
    LapSimulator::default().simulate_traced(input, plan, rng)
}

fn assert_plan_fits(input: &StrategyInput, plan: &StrategyPlan) {
    assert!(!plan.stints.is_empty(), "precondition failed: plan has no stints");
    assert!(
        plan.stints.iter().all(|stint| stint.laps >= 1),
        "precondition failed: plan {plan} has an empty stint"
    );
    assert_eq!(
        plan.total_laps(),
        input.race.laps,
        "precondition failed: plan {plan} does not cover a {}-lap race",
        input.race.laps
    );
}
