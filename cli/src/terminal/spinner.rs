use colored::*;
use indicatif::ProgressStyle;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_core::scanner::Phase;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::colors;

const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁", "▁▂▂▂▁", "▁▄▂▄▁", "▂▄▆▄▂", "▄▆█▆▄", "▂▄▆▄▂", "▁▄▂▄▁", "▁▂▂▂▁",
];

fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICK_STRINGS)
}

/// A span whose progress bar is the discovery spinner. Entering it shows
/// the spinner; dropping it clears the line.
pub fn discovery_span(tip: Option<&str>) -> Span {
    let span = info_span!("discovery", indicatif.pb_show = true);
    span.pb_set_style(&style());
    span.pb_set_message(&match tip {
        Some(tip) => tip.italic().white().to_string(),
        None => "Starting discovery...".to_string(),
    });
    span
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::LastKnown => "last known host",
        Phase::Common => "likely addresses",
        Phase::Sweep => "full sweep",
    }
}

pub fn report_progress(span: &Span, phase: Option<Phase>, percent: u8, found: usize) {
    let phase: String = phase.map(phase_label).unwrap_or("preparing").to_string();
    let message = format!(
        "{} {} {}",
        format!("{percent:>3}%").color(colors::ACCENT).bold(),
        phase.color(colors::TEXT_DEFAULT),
        format!("({} found)", found.to_string().green().bold()).color(colors::SEPARATOR),
    );
    span.pb_set_message(&message);
}

pub fn report_found(span: &Span, endpoint: Endpoint, found: usize) {
    span.pb_set_message(&format!(
        "Found {} ({} so far)...",
        endpoint.to_string().color(colors::IPV4_ADDR).bold(),
        found.to_string().green().bold()
    ));
}
