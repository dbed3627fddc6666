// src/analysis/indicators.rs
//
// Merges the per-detector event streams into one time-ordered indicator
// summary with derived counts. Hyperextension events are gated by
// config: they stay out of the summary unless explicitly enabled.

use itertools::Itertools;

use crate::types::{
    CollapseEvent, HyperextensionEvent, IndicatorEvent, InjurySummary, Severity, StillnessEvent,
};

pub fn summarize_indicators(
    collapses: &[CollapseEvent],
    stillness: &[StillnessEvent],
    hyperextension: &[HyperextensionEvent],
    include_hyperextension: bool,
) -> InjurySummary {
    let hyper: &[HyperextensionEvent] = if include_hyperextension {
        hyperextension
    } else {
        &[]
    };

    let indicators: Vec<IndicatorEvent> = collapses
        .iter()
        .cloned()
        .map(IndicatorEvent::Collapse)
        .chain(stillness.iter().cloned().map(IndicatorEvent::PostImpactStillness))
        .chain(hyper.iter().cloned().map(IndicatorEvent::Hyperextension))
        .sorted_by(|a, b| a.timestamp().total_cmp(&b.timestamp()))
        .collect();

    let critical_count = indicators
        .iter()
        .filter(|e| e.severity() == Severity::Critical)
        .count();
    let high_count = indicators
        .iter()
        .filter(|e| e.severity() == Severity::High)
        .count();

    InjurySummary {
        collapse_count: collapses.len(),
        stillness_count: stillness.len(),
        critical_count,
        high_count,
        total_count: indicators.len(),
        has_serious_flags: critical_count > 0 || high_count >= 2,
        indicators,
    }
}
