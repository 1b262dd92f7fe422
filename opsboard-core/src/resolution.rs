//! Resolution-time trends, per-department comparison and case aging.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{elapsed_hours, round_hours, short_label, Mean};
use crate::{DashboardConfig, Department, PatientEpisode, Priority};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionPoint {
    pub date: NaiveDate,
    pub label: String,
    pub avg_hours: u32,
    pub critical_avg_hours: u32,
    pub non_critical_avg_hours: u32,
    /// Trailing mean of `avg_hours` over `window` dates, this one included.
    pub moving_avg_hours: u32,
    pub window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentResolution {
    pub department: Department,
    pub avg_hours: u32,
    pub resolved_cases: usize,
}

/// Active cases bucketed by time since admission. Each case lands in exactly
/// one bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseAging {
    pub within_24h: usize,
    pub over_24h: usize,
    pub over_48h: usize,
    pub over_72h: usize,
}

impl CaseAging {
    fn record(&mut self, hours: f64) {
        if hours > 72.0 {
            self.over_72h += 1;
        } else if hours > 48.0 {
            self.over_48h += 1;
        } else if hours > 24.0 {
            self.over_24h += 1;
        } else {
            self.within_24h += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.within_24h + self.over_24h + self.over_48h + self.over_72h
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResolutionTrends {
    pub series: Vec<ResolutionPoint>,
    pub by_department: Vec<DepartmentResolution>,
    pub aging: CaseAging,
    pub backlog_warning: bool,
}

#[derive(Default)]
struct DayBucket {
    overall: Mean,
    critical: Mean,
    non_critical: Mean,
}

pub fn resolution_trends(
    episodes: &[PatientEpisode],
    config: &DashboardConfig,
    now: DateTime<Utc>,
) -> ResolutionTrends {
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    let mut departments: BTreeMap<Department, Mean> = BTreeMap::new();
    let mut aging = CaseAging::default();

    for episode in episodes {
        if episode.is_active() {
            aging.record(elapsed_hours(episode.admitted_at, now));
        }

        let (Some(hours), Some(discharged)) = (episode.resolution_hours, episode.discharged_at)
        else {
            continue;
        };

        let bucket = days.entry(discharged.date_naive()).or_default();
        bucket.overall.push(hours);
        if episode.priority == Priority::Critical {
            bucket.critical.push(hours);
        } else {
            bucket.non_critical.push(hours);
        }

        departments.entry(episode.department).or_default().push(hours);
    }

    let series = smooth(days, config);

    let mut by_department: Vec<DepartmentResolution> = departments
        .into_iter()
        .map(|(department, mean)| DepartmentResolution {
            department,
            avg_hours: mean.rounded(),
            resolved_cases: mean.count(),
        })
        .collect();
    by_department.sort_by(|a, b| b.avg_hours.cmp(&a.avg_hours));

    let backlog_warning = is_rising(&series) && aging.over_72h > config.backlog_aged_threshold;
    if backlog_warning {
        tracing::warn!(
            aged = aging.over_72h,
            "resolution time rising with an aged backlog"
        );
    }

    ResolutionTrends {
        series,
        by_department,
        aging,
        backlog_warning,
    }
}

/// Date-ascending series with a trailing moving average, cut to the newest
/// `series_length` dates.
fn smooth(days: BTreeMap<NaiveDate, DayBucket>, config: &DashboardConfig) -> Vec<ResolutionPoint> {
    let window = config.moving_average_window.max(1);
    let daily: Vec<(NaiveDate, u32, u32, u32)> = days
        .into_iter()
        .map(|(date, bucket)| {
            (
                date,
                bucket.overall.rounded(),
                bucket.critical.rounded(),
                bucket.non_critical.rounded(),
            )
        })
        .collect();

    let mut series: Vec<ResolutionPoint> = daily
        .iter()
        .enumerate()
        .map(|(index, &(date, avg, critical, non_critical))| {
            let start = (index + 1).saturating_sub(window);
            let trailing = &daily[start..=index];
            let sum: u32 = trailing.iter().map(|day| day.1).sum();
            ResolutionPoint {
                date,
                label: short_label(date),
                avg_hours: avg,
                critical_avg_hours: critical,
                non_critical_avg_hours: non_critical,
                moving_avg_hours: round_hours(sum as f64 / trailing.len() as f64),
                window: trailing.len(),
            }
        })
        .collect();

    let excess = series.len().saturating_sub(config.series_length);
    series.drain(..excess);
    series
}

/// The newest of the last three moving-average points exceeds the oldest.
fn is_rising(series: &[ResolutionPoint]) -> bool {
    match series {
        [.., first, _, last] => last.moving_avg_hours > first.moving_avg_hours,
        _ => false,
    }
}
