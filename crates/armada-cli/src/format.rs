//! Terminal rendering for reports, ids and validation results.

use armada_cluster::{
    ClusterEvent, ClusterReport, ClusterStatus, ConfigValidation, CoordinationStatus,
    EventSeverity, ParsedClusterId, ParsedNodeId,
};
use colored::{ColoredString, Colorize};

/// Width of the label column in aligned key/value output.
const LABEL_WIDTH: usize = 14;

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("  {} {value}", format!("{label:<LABEL_WIDTH$}").dimmed())
}

fn status_color(status: ClusterStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ClusterStatus::Active => text.green(),
        ClusterStatus::Degraded | ClusterStatus::Initializing => text.yellow(),
        ClusterStatus::Maintenance | ClusterStatus::Offline | ClusterStatus::Decommissioning => {
            text.red()
        }
    }
}

fn coordination_color(status: CoordinationStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        CoordinationStatus::Healthy => text.green(),
        CoordinationStatus::Degraded => text.yellow(),
        CoordinationStatus::Critical => text.red(),
    }
}

fn severity_color(severity: EventSeverity) -> ColoredString {
    let text = format!("[{severity}]");
    match severity {
        EventSeverity::Info => text.dimmed(),
        EventSeverity::Warning => text.yellow(),
        EventSeverity::Error | EventSeverity::Critical => text.red(),
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn format_cluster_id(parsed: &ParsedClusterId) -> String {
    [
        row("kind", "cluster"),
        row("random1", &parsed.random1),
        row("random2", &parsed.random2),
        row("created_at", parsed.created_at.to_rfc3339()),
    ]
    .join("\n")
}

pub fn format_node_id(parsed: &ParsedNodeId) -> String {
    [
        row("kind", "node"),
        row("cluster", &parsed.cluster_suffix),
        row("number", parsed.node_number),
        row("random", &parsed.random),
    ]
    .join("\n")
}

pub fn format_validation(validation: &ConfigValidation) -> String {
    if validation.is_valid {
        return "configuration is valid".green().to_string();
    }
    let mut lines = vec![format!(
        "{} ({} violation(s))",
        "configuration is invalid".red(),
        validation.errors.len()
    )];
    lines.extend(validation.errors.iter().map(|v| format!("  - {v}")));
    lines.join("\n")
}

pub fn format_event(event: &ClusterEvent) -> String {
    let node = event
        .node_id
        .as_deref()
        .map(|n| format!(" ({n})"))
        .unwrap_or_default();
    format!(
        "{} {}: {}{node}",
        severity_color(event.severity),
        event.event_type,
        event.title
    )
}

/// Renders a full evaluation as an aligned text report.
pub fn format_report(report: &ClusterReport) -> String {
    let health = &report.health;
    let counts = &health.counts;
    let coordination = &report.coordination;
    let dash = || "-".to_string();

    let mut lines = vec![format!(
        "cluster {} ({})",
        report.cluster_id.bold(),
        status_color(report.current_status)
    )];

    lines.push(row(
        "health score",
        format!("{:.2} -> {}", health.score, status_color(health.suggested_status)),
    ));
    lines.push(row(
        "nodes",
        format!(
            "{} total, {} online, {} offline",
            counts.total, counts.online, counts.offline
        ),
    ));
    lines.push(row(
        "node health",
        format!(
            "{} healthy, {} warning, {} critical, {} unknown",
            counts.online_healthy, counts.online_warning, counts.online_critical, counts.online_unknown
        ),
    ));
    lines.push(row("coordination", coordination_color(coordination.status)));
    for issue in &coordination.issues {
        lines.push(format!("  {:<LABEL_WIDTH$}   - {issue}", ""));
    }
    lines.push(row(
        "primary",
        coordination.primary_node.clone().unwrap_or_else(dash),
    ));
    lines.push(row(
        "coordinator",
        coordination.coordinator_node.clone().unwrap_or_else(dash),
    ));

    let order: Vec<&str> = report
        .failover
        .order
        .iter()
        .map(|c| c.node_id.as_str())
        .collect();
    lines.push(row(
        "failover",
        if order.is_empty() {
            dash()
        } else {
            order.join(" > ")
        },
    ));

    if let Some(plan) = &report.role_assignment {
        lines.push(row(
            "planned roles",
            format!(
                "primary {}, coordinator {}",
                plan.primary.clone().unwrap_or_else(dash),
                plan.coordinator.clone().unwrap_or_else(dash)
            )
            .cyan(),
        ));
    }
    for conflict in &report.role_conflicts {
        lines.push(row(
            "conflict",
            format!("{} held by {}", conflict.role, conflict.node_ids.join(", ")).red(),
        ));
    }

    let perf = &report.performance;
    lines.push(row(
        "utilization",
        format!(
            "{} cluster, {} nodes online",
            percent(perf.cluster_utilization),
            percent(perf.node_utilization)
        ),
    ));
    lines.push(row(
        "performance",
        format!("{:.2} score, {:.2} efficiency", perf.performance_score, perf.efficiency),
    ));

    if !health.recommendations.is_empty() {
        lines.push("recommendations".bold().to_string());
        for (i, rec) in health.recommendations.iter().enumerate() {
            lines.push(format!("  {}) {rec}", i + 1));
        }
    }

    if !report.events.is_empty() {
        lines.push("events".bold().to_string());
        for event in &report.events {
            lines.push(format!("  {}", format_event(event)));
        }
    }

    lines.join("\n")
}
