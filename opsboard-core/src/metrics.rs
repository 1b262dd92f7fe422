//! Headline KPIs for the dashboard cards.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{capped_percent, Mean};
use crate::{DashboardConfig, Department, PatientEpisode};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Kpis {
    pub total_patients: usize,
    pub active_cases: usize,
    /// Mean resolution time over resolved episodes, rounded to the hour.
    pub avg_resolution_hours: u32,
    pub bed_occupancy_pct: u32,
    pub emergency_cases_today: usize,
    /// Distinct doctors with at least one active case.
    pub staff_on_duty: usize,
    pub total_revenue: f64,
    pub discharges_today: usize,
}

/// Compute the KPI cards. "Today" is the UTC calendar date of `now`.
pub fn compute_kpis(
    episodes: &[PatientEpisode],
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> Kpis {
    let today = now.date_naive();
    let mut resolution = Mean::default();
    let mut on_duty = HashSet::new();
    let mut kpis = Kpis {
        total_patients: episodes.len(),
        ..Kpis::default()
    };

    for episode in episodes {
        if episode.is_active() {
            kpis.active_cases += 1;
            on_duty.insert(episode.doctor_name.as_str());
        }
        if let Some(hours) = episode.resolution_hours {
            resolution.push(hours);
        }
        if episode.department == Department::Emergency && episode.admitted_on(today) {
            kpis.emergency_cases_today += 1;
        }
        if episode.discharged_on(today) {
            kpis.discharges_today += 1;
        }
        kpis.total_revenue += episode.revenue;
    }

    kpis.avg_resolution_hours = resolution.rounded();
    kpis.bed_occupancy_pct = capped_percent(kpis.active_cases, config.total_bed_capacity);
    kpis.staff_on_duty = on_duty.len();
    kpis
}
