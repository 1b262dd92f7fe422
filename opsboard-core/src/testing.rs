//! Builders for unit-test fixtures.

use chrono::{DateTime, TimeZone, Utc};

use crate::{elapsed_hours, Department, EpisodeStatus, PatientEpisode, Priority, Shift};

/// Fixed "now" used across aggregator tests: 2024-06-15 12:00 UTC.
pub(crate) fn reference_now() -> DateTime<Utc> {
    at(2024, 6, 15, 12)
}

pub(crate) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) fn open(
    id: &str,
    department: Department,
    doctor: &str,
    priority: Priority,
    admitted_at: DateTime<Utc>,
) -> PatientEpisode {
    PatientEpisode {
        id: id.to_string(),
        department,
        doctor_name: doctor.to_string(),
        admitted_at,
        discharged_at: None,
        priority,
        status: EpisodeStatus::Admitted,
        shift: Shift::Morning,
        resolution_hours: None,
        revenue: 15_000.0,
    }
}

pub(crate) fn closed(
    id: &str,
    department: Department,
    doctor: &str,
    priority: Priority,
    admitted_at: DateTime<Utc>,
    discharged_at: DateTime<Utc>,
) -> PatientEpisode {
    PatientEpisode {
        discharged_at: Some(discharged_at),
        status: EpisodeStatus::Discharged,
        resolution_hours: Some(elapsed_hours(admitted_at, discharged_at)),
        ..open(id, department, doctor, priority, admitted_at)
    }
}

/// `count` open cases for one doctor, all admitted at `admitted_at`.
pub(crate) fn open_cases(
    prefix: &str,
    count: usize,
    department: Department,
    doctor: &str,
    admitted_at: DateTime<Utc>,
) -> Vec<PatientEpisode> {
    (0..count)
        .map(|i| {
            open(
                &format!("{prefix}-{i}"),
                department,
                doctor,
                Priority::Medium,
                admitted_at,
            )
        })
        .collect()
}
