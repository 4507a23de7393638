//! Audit events and metric samples handed to the append-only sink.
//!
//! Events are immutable apart from acknowledgement and resolution.
//! Metric samples are never modified once built.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NodeStatusChanged,
    HealthDegraded,
    HealthRecovered,
    PrimaryElected,
    CoordinatorElected,
    RoleConflict,
    CoordinationIssue,
}

impl EventType {
    pub fn category(self) -> EventCategory {
        match self {
            EventType::NodeStatusChanged => EventCategory::Lifecycle,
            EventType::HealthDegraded | EventType::HealthRecovered => EventCategory::Health,
            EventType::PrimaryElected
            | EventType::CoordinatorElected
            | EventType::RoleConflict
            | EventType::CoordinationIssue => EventCategory::Coordination,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::NodeStatusChanged => "node_status_changed",
            EventType::HealthDegraded => "health_degraded",
            EventType::HealthRecovered => "health_recovered",
            EventType::PrimaryElected => "primary_elected",
            EventType::CoordinatorElected => "coordinator_elected",
            EventType::RoleConflict => "role_conflict",
            EventType::CoordinationIssue => "coordination_issue",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Health,
    Coordination,
    Lifecycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSeverity::Info => write!(f, "info"),
            EventSeverity::Warning => write!(f, "warning"),
            EventSeverity::Error => write!(f, "error"),
            EventSeverity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    New,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Audit record for a state change or an observed anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvent {
    pub id: Uuid,
    pub cluster_id: String,
    pub node_id: Option<String>,
    pub event_type: EventType,
    pub category: EventCategory,
    pub severity: EventSeverity,
    pub title: String,
    pub description: String,
    pub details: Metadata,
    pub correlation_id: Option<Uuid>,
    pub parent_event_id: Option<Uuid>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl ClusterEvent {
    pub fn new(
        cluster_id: impl Into<String>,
        event_type: EventType,
        severity: EventSeverity,
        title: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster_id: cluster_id.into(),
            node_id: None,
            event_type,
            category: event_type.category(),
            severity,
            title: title.into(),
            description: String::new(),
            details: Metadata::default(),
            correlation_id: None,
            parent_event_id: None,
            status: EventStatus::New,
            created_at: at,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            tags: Vec::new(),
        }
    }

    pub fn for_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key, value.to_string());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Groups this event with others from the same refresh cycle.
    pub fn correlated_with(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Marks this event as a consequence of `parent`, inheriting its correlation.
    pub fn caused_by(mut self, parent: &ClusterEvent) -> Self {
        self.parent_event_id = Some(parent.id);
        self.correlation_id = parent.correlation_id.or(Some(parent.id));
        self
    }

    pub fn acknowledge(&mut self, by: impl Into<String>, at: DateTime<Utc>) {
        self.acknowledged_at = Some(at);
        self.acknowledged_by = Some(by.into());
        if self.status == EventStatus::New {
            self.status = EventStatus::Processing;
        }
    }

    pub fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved_at = Some(at);
        self.status = EventStatus::Completed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, EventStatus::New | EventStatus::Processing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    #[default]
    Resource,
    Performance,
    Health,
}

/// One time-series sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetric {
    pub cluster_id: String,
    pub node_id: Option<String>,
    pub name: String,
    pub category: MetricCategory,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: String,
    pub dimensions: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub collected_at: DateTime<Utc>,
}

impl ClusterMetric {
    pub fn new(
        cluster_id: impl Into<String>,
        name: impl Into<String>,
        metric_type: MetricType,
        value: f64,
        unit: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            node_id: None,
            name: name.into(),
            category: MetricCategory::default(),
            metric_type,
            value,
            unit: unit.into(),
            dimensions: BTreeMap::new(),
            labels: BTreeMap::new(),
            collected_at: at,
        }
    }

    pub fn gauge(
        cluster_id: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(cluster_id, name, MetricType::Gauge, value, unit, at)
    }

    pub fn with_category(mut self, category: MetricCategory) -> Self {
        self.category = category;
        self
    }

    pub fn for_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}
