use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Department, PatientEpisode, Priority};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepartmentCount {
    pub department: Department,
    pub count: usize,
}

/// Count per priority present, Low through Critical.
pub fn priority_distribution(episodes: &[PatientEpisode]) -> Vec<PriorityCount> {
    let mut counts: BTreeMap<Priority, usize> = BTreeMap::new();
    for episode in episodes {
        *counts.entry(episode.priority).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(priority, count)| PriorityCount { priority, count })
        .collect()
}

/// Count per department present, busiest first.
pub fn department_workload(episodes: &[PatientEpisode]) -> Vec<DepartmentCount> {
    let mut counts: BTreeMap<Department, usize> = BTreeMap::new();
    for episode in episodes {
        *counts.entry(episode.department).or_default() += 1;
    }
    let mut workload: Vec<DepartmentCount> = counts
        .into_iter()
        .map(|(department, count)| DepartmentCount { department, count })
        .collect();
    workload.sort_by(|a, b| b.count.cmp(&a.count));
    workload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{open, reference_now};

    #[test]
    fn counts_only_present_values() {
        let now = reference_now();
        let episodes = vec![
            open("PT-1", Department::Oncology, "Dr. Kumar", Priority::Critical, now),
            open("PT-2", Department::Neurology, "Dr. Reddy", Priority::Low, now),
            open("PT-3", Department::Oncology, "Dr. Kumar", Priority::Low, now),
            open("PT-4", Department::Cardiology, "Dr. Patel", Priority::Low, now),
        ];

        assert_eq!(
            priority_distribution(&episodes),
            vec![
                PriorityCount { priority: Priority::Low, count: 3 },
                PriorityCount { priority: Priority::Critical, count: 1 },
            ]
        );

        let departments: Vec<(Department, usize)> = department_workload(&episodes)
            .into_iter()
            .map(|d| (d.department, d.count))
            .collect();
        assert_eq!(
            departments,
            vec![
                (Department::Oncology, 2),
                (Department::Cardiology, 1),
                (Department::Neurology, 1),
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_lists() {
        assert!(priority_distribution(&[]).is_empty());
        assert!(department_workload(&[]).is_empty());
    }
}
