use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::util::short_label;
use crate::{DashboardConfig, PatientEpisode};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdmissionsPoint {
    pub date: NaiveDate,
    pub label: String,
    pub admissions: usize,
    pub discharges: usize,
}

/// Admissions and discharges per UTC date, newest `series_length` dates.
///
/// A record adds to its admission date and, independently, to its discharge
/// date when it has one.
pub fn admissions_timeline(
    episodes: &[PatientEpisode],
    config: &DashboardConfig,
) -> Vec<AdmissionsPoint> {
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();

    for episode in episodes {
        days.entry(episode.admitted_at.date_naive()).or_default().0 += 1;
        if let Some(discharged) = episode.discharged_at {
            days.entry(discharged.date_naive()).or_default().1 += 1;
        }
    }

    let skip = days.len().saturating_sub(config.series_length);
    days.into_iter()
        .skip(skip)
        .map(|(date, (admissions, discharges))| AdmissionsPoint {
            date,
            label: short_label(date),
            admissions,
            discharges,
        })
        .collect()
}
