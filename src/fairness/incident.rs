//! Incidents raised by the fairness auditor

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which test raised an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestName {
    StatisticalParity,
    Drift,
}

impl TestName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestName::StatisticalParity => "statistical_parity",
            TestName::Drift => "drift",
        }
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "LOW",
            IncidentSeverity::Medium => "MEDIUM",
            IncidentSeverity::High => "HIGH",
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted threshold breach. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub test_name: TestName,
    pub value: f64,
    pub severity: IncidentSeverity,
    pub created_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(test_name: TestName, value: f64, severity: IncidentSeverity) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_name,
            value,
            severity,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let incident = Incident::new(TestName::StatisticalParity, 0.4, IncidentSeverity::High);
        let json = serde_json::to_value(&incident).unwrap();
        assert_eq!(json["test_name"], "statistical_parity");
        assert_eq!(json["severity"], "HIGH");
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Incident::new(TestName::Drift, 0.9, IncidentSeverity::Medium);
        let b = Incident::new(TestName::Drift, 0.9, IncidentSeverity::Medium);
        assert_ne!(a.id, b.id);
    }
}
