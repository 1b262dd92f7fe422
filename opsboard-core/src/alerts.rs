//! Threshold alerts evaluated on every recomputation.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DashboardConfig, Department, PatientEpisode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
}

impl Alert {
    fn new(id: &str, level: AlertLevel, title: &str, message: String) -> Self {
        Self {
            id: id.to_string(),
            level,
            title: title.to_string(),
            message,
        }
    }
}

/// Run the four independent rules. Stateless: identical input gives
/// identical alerts.
pub fn evaluate_alerts(
    episodes: &[PatientEpisode],
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let today = now.date_naive();
    let mut alerts = Vec::new();

    let active: Vec<&PatientEpisode> = episodes.iter().filter(|e| e.is_active()).collect();

    if config.total_bed_capacity > 0 {
        let occupancy = active.len() as f64 / config.total_bed_capacity as f64 * 100.0;
        if occupancy > config.bed_alert_pct {
            alerts.push(Alert::new(
                "bed-occupancy",
                AlertLevel::Critical,
                "Critical Bed Occupancy",
                format!("Current bed occupancy is at {occupancy:.1}%. Immediate action required."),
            ));
        }
    }

    let emergency_today = episodes
        .iter()
        .filter(|e| e.department == Department::Emergency && e.admitted_on(today))
        .count();
    if emergency_today > config.emergency_spike_threshold {
        alerts.push(Alert::new(
            "emergency-spike",
            AlertLevel::Warning,
            "Emergency Admission Spike",
            format!("Unusual spike detected: {emergency_today} emergency cases admitted today."),
        ));
    }

    let mut per_doctor: HashMap<&str, usize> = HashMap::new();
    let mut per_department: BTreeMap<Department, usize> = BTreeMap::new();
    for episode in &active {
        *per_doctor.entry(episode.doctor_name.as_str()).or_default() += 1;
        *per_department.entry(episode.department).or_default() += 1;
    }

    let overloaded_doctors = per_doctor
        .values()
        .filter(|&&count| count > config.overload_active_cases)
        .count();
    if overloaded_doctors > 0 {
        alerts.push(Alert::new(
            "doctor-workload",
            AlertLevel::Warning,
            "High Doctor Workload",
            format!(
                "{overloaded_doctors} doctors are currently exceeding safe active case thresholds."
            ),
        ));
    }

    let overloaded_departments: Vec<&str> = per_department
        .iter()
        .filter(|(_, &count)| count > config.department_overload_active_cases)
        .map(|(department, _)| department.as_str())
        .collect();
    if !overloaded_departments.is_empty() {
        alerts.push(Alert::new(
            "dept-capacity",
            AlertLevel::Warning,
            "Department Capacity Alert",
            format!(
                "{} operating above optimal capacity.",
                overloaded_departments.join(", ")
            ),
        ));
    }

    if !alerts.is_empty() {
        tracing::debug!(count = alerts.len(), "alerts raised");
    }
    alerts
}
