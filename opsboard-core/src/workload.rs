//! Doctor workload classification and reassignment suggestions.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{rounded_percent, Mean};
use crate::{DashboardConfig, PatientEpisode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkloadStatus {
    Overloaded,
    Optimal,
    Underutilized,
}

impl WorkloadStatus {
    /// Overloaded is checked first, then underutilized; everything else is optimal.
    pub fn classify(active_cases: usize, config: &DashboardConfig) -> Self {
        if active_cases > config.overload_active_cases {
            WorkloadStatus::Overloaded
        } else if active_cases < config.underutilized_active_cases {
            WorkloadStatus::Underutilized
        } else {
            WorkloadStatus::Optimal
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    Reassign { excess_pct: u32, target: String },
    PauseAdmissions { excess_pct: u32 },
    RouteAdmissions,
    Balanced,
}

impl Recommendation {
    pub fn message(&self, doctor: &str) -> String {
        match self {
            Recommendation::Reassign { excess_pct, target } => format!(
                "{doctor} exceeds optimal capacity by {excess_pct}%. Suggest reassigning new cases to {target}."
            ),
            Recommendation::PauseAdmissions { excess_pct } => format!(
                "{doctor} exceeds optimal capacity by {excess_pct}%. No underutilized doctors available. Pause new admissions."
            ),
            Recommendation::RouteAdmissions => {
                format!("{doctor} has available capacity. Route new admissions here.")
            }
            Recommendation::Balanced => {
                "Workload is balanced. Maintain current assignment rate.".to_string()
            }
        }
    }

    pub fn excess_pct(&self) -> Option<u32> {
        match self {
            Recommendation::Reassign { excess_pct, .. }
            | Recommendation::PauseAdmissions { excess_pct } => Some(*excess_pct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorLoad {
    pub name: String,
    pub active_cases: usize,
    pub daily_cases: usize,
    pub weekly_cases: usize,
    pub resolved_cases: usize,
    pub avg_consultation_hours: f64,
    pub status: WorkloadStatus,
    pub recommendation: Recommendation,
    pub suggestion: String,
}

#[derive(Default)]
struct DoctorTally {
    active: usize,
    daily: usize,
    weekly: usize,
    consultation: Mean,
}

/// Per-doctor workload, sorted by active cases (descending, stable on first
/// appearance), with a suggestion derived from the whole team's state.
pub fn doctor_workload(
    episodes: &[PatientEpisode],
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Vec<DoctorLoad> {
    let today = now.date_naive();
    let week_start = now - Duration::days(7);

    let mut order: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, DoctorTally> = HashMap::new();

    for episode in episodes {
        let name = episode.doctor_name.as_str();
        let tally = tallies.entry(name).or_insert_with(|| {
            order.push(name);
            DoctorTally::default()
        });

        if episode.is_active() {
            tally.active += 1;
        }
        if episode.admitted_at >= week_start {
            tally.weekly += 1;
        }
        if episode.admitted_on(today) {
            tally.daily += 1;
        }
        if let Some(hours) = episode.resolution_hours {
            tally.consultation.push(hours);
        }
    }

    let mut loads: Vec<DoctorLoad> = order
        .into_iter()
        .filter_map(|name| {
            let tally = tallies.remove(name)?;
            Some(DoctorLoad {
                name: name.to_string(),
                active_cases: tally.active,
                daily_cases: tally.daily,
                weekly_cases: tally.weekly,
                resolved_cases: tally.consultation.count(),
                avg_consultation_hours: tally.consultation.value(),
                status: WorkloadStatus::classify(tally.active, config),
                recommendation: Recommendation::Balanced,
                suggestion: String::new(),
            })
        })
        .collect();

    loads.sort_by(|a, b| b.active_cases.cmp(&a.active_cases));

    let relief = loads
        .iter()
        .find(|load| load.status == WorkloadStatus::Underutilized)
        .map(|load| load.name.clone());

    for load in &mut loads {
        load.recommendation = match load.status {
            WorkloadStatus::Overloaded => {
                let threshold = config.overload_active_cases;
                let excess_pct = rounded_percent(load.active_cases - threshold, threshold);
                match &relief {
                    Some(target) => Recommendation::Reassign {
                        excess_pct,
                        target: target.clone(),
                    },
                    None => Recommendation::PauseAdmissions { excess_pct },
                }
            }
            WorkloadStatus::Underutilized => Recommendation::RouteAdmissions,
            WorkloadStatus::Optimal => Recommendation::Balanced,
        };
        load.suggestion = load.recommendation.message(&load.name);
    }

    tracing::debug!(doctors = loads.len(), "computed doctor workload");
    loads
}
