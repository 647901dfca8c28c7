//! Human-readable view of a ranked plan: stop count, pit laps, formatted times and a
//! one-line driver call.

use serde::Serialize;

use crate::race::compound::Compound;
use crate::race::model::EvaluatedPlan;

/// Tail spread (p95 - mean) above this fraction of the mean marks a volatile plan.
pub const VOLATILE_SPREAD_RATIO: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySummary {
    pub stops: usize,
    pub label: String,
    pub pit_laps: Vec<u32>,
    pub compounds: Vec<Compound>,
    pub mean: String,
    pub p95: String,
    pub spread_ms: f64,
    pub volatile: bool,
}

pub fn stop_label(stops: usize) -> String {
    match stops {
        0 => "NO-STOP".to_string(),
        1 => "ONE-STOP".to_string(),
        2 => "TWO-STOP".to_string(),
        3 => "THREE-STOP".to_string(),
        n => format!("{n}-STOP"),
    }
}

/// `M:SS.mmm`, minutes unbounded.
pub fn format_race_time(ms: f64) -> String {
    let total_ms = ms.max(0.0).round() as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

pub fn summarize(evaluated: &EvaluatedPlan) -> StrategySummary {
    let plan = &evaluated.plan;
    let spread_ms = evaluated.p95 - evaluated.mean;
    StrategySummary {
        stops: plan.pit_stops(),
        label: stop_label(plan.pit_stops()),
        pit_laps: plan.pit_laps(),
        compounds: plan.stints.iter().map(|stint| stint.compound).collect(),
        mean: format_race_time(evaluated.mean),
        p95: format_race_time(evaluated.p95),
        spread_ms,
        volatile: evaluated.mean > 0.0 && spread_ms / evaluated.mean > VOLATILE_SPREAD_RATIO,
    }
}

pub fn radio_message(evaluated: &EvaluatedPlan) -> String {
    let summary = summarize(evaluated);
    let mut parts = Vec::with_capacity(2);
    match (summary.pit_laps.first(), summary.compounds.get(1)) {
        (Some(lap), Some(next)) if summary.stops == 1 => {
            parts.push(format!("Plan to box on lap {lap} for {next}."));
        }
        (Some(lap), Some(next)) => {
            parts.push(format!(
                "{} strategy. First box on lap {lap} for {next}.",
                sentence_case(&summary.label)
            ));
        }
        _ => parts.push("Box negative. Stay out and push.".to_string()),
    }
    if summary.volatile {
        parts.push("Wide spread, watch for a safety car window.".to_string());
    }
    parts.join(" ")
}

fn sentence_case(label: &str) -> String {
    let lower = label.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
