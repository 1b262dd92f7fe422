//! Record filtering and the option lists behind the filter controls.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::{Department, PatientEpisode, Priority};

/// Inclusive admission window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Active filter clauses. `None` means "All".
///
/// On the wire a clause may also be the literal `"All"`, `null`, or missing;
/// all three read as `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    #[serde(deserialize_with = "all_as_none")]
    pub department: Option<Department>,
    #[serde(deserialize_with = "all_as_none")]
    pub doctor: Option<String>,
    #[serde(deserialize_with = "all_as_none")]
    pub priority: Option<Priority>,
}

const ALL_SENTINEL: &str = "All";

struct AllSentinel;

impl<'de> Deserialize<'de> for AllSentinel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == ALL_SENTINEL {
            Ok(AllSentinel)
        } else {
            Err(de::Error::custom(format!("expected \"{ALL_SENTINEL}\"")))
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Selection<T> {
    All(AllSentinel),
    One(T),
}

fn all_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let selection = Option::<Selection<T>>::deserialize(deserializer)?;
    Ok(match selection {
        Some(Selection::One(value)) => Some(value),
        Some(Selection::All(_)) | None => None,
    })
}

impl FilterSpec {
    pub fn matches(&self, episode: &PatientEpisode) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(episode.admitted_at) {
                return false;
            }
        }

        if let Some(department) = self.department {
            if episode.department != department {
                return false;
            }
        }

        if let Some(doctor) = &self.doctor {
            if &episode.doctor_name != doctor {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if episode.priority != priority {
                return false;
            }
        }

        true
    }

    pub fn is_unfiltered(&self) -> bool {
        self == &FilterSpec::default()
    }
}

/// Retain the episodes passing every active clause, in input order.
pub fn filter_episodes(episodes: &[PatientEpisode], spec: &FilterSpec) -> Vec<PatientEpisode> {
    episodes
        .iter()
        .filter(|episode| spec.matches(episode))
        .cloned()
        .collect()
}

/// Distinct values present in a record set, in order of first appearance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    pub departments: Vec<Department>,
    pub doctors: Vec<String>,
    pub priorities: Vec<Priority>,
}

impl FilterOptions {
    pub fn from_episodes(episodes: &[PatientEpisode]) -> Self {
        let mut options = FilterOptions::default();
        let mut seen_departments = HashSet::new();
        let mut seen_doctors = HashSet::new();
        let mut seen_priorities = HashSet::new();

        for episode in episodes {
            if seen_departments.insert(episode.department) {
                options.departments.push(episode.department);
            }
            if seen_doctors.insert(episode.doctor_name.as_str()) {
                options.doctors.push(episode.doctor_name.clone());
            }
            if seen_priorities.insert(episode.priority) {
                options.priorities.push(episode.priority);
            }
        }

        options
    }
}
