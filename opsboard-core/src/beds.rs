//! Bed utilization per capacity pool.

use serde::{Deserialize, Serialize};

use crate::util::{capped_percent, Mean};
use crate::{DashboardConfig, Department, PatientEpisode, Priority};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BedPool {
    Icu,
    General,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolOccupancy {
    pub pool: BedPool,
    pub active: usize,
    pub capacity: u32,
    pub occupancy_pct: u32,
    /// Occupancy above `occupancy_warning_pct`.
    pub warning: bool,
}

impl PoolOccupancy {
    fn new(pool: BedPool, active: usize, capacity: u32, warning_pct: u32) -> Self {
        let occupancy_pct = capped_percent(active, capacity);
        Self {
            pool,
            active,
            capacity,
            occupancy_pct,
            warning: occupancy_pct > warning_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BedUtilization {
    pub icu: PoolOccupancy,
    pub general: PoolOccupancy,
    pub emergency: PoolOccupancy,
    pub avg_length_of_stay_days: f64,
    /// Resolved episodes per pooled bed.
    pub turnover_rate: f64,
}

impl BedUtilization {
    pub fn pools(&self) -> [&PoolOccupancy; 3] {
        [&self.icu, &self.general, &self.emergency]
    }
}

/// Split active cases across the ICU, emergency and general pools.
///
/// Critical cases occupy ICU and emergency cases occupy the emergency pool, so
/// a critical emergency case is counted in both. General holds the rest.
pub fn bed_utilization(episodes: &[PatientEpisode], config: &DashboardConfig) -> BedUtilization {
    let mut icu = 0;
    let mut emergency = 0;
    let mut general = 0;
    let mut stay = Mean::default();

    for episode in episodes {
        if episode.is_active() {
            let critical = episode.priority == Priority::Critical;
            let in_emergency = episode.department == Department::Emergency;
            if critical {
                icu += 1;
            }
            if in_emergency {
                emergency += 1;
            }
            if !critical && !in_emergency {
                general += 1;
            }
        }
        if let Some(hours) = episode.resolution_hours {
            stay.push(hours / 24.0);
        }
    }

    let pooled = config.pooled_capacity();
    let turnover_rate = if pooled == 0 {
        0.0
    } else {
        stay.count() as f64 / pooled as f64
    };

    let warning_pct = config.occupancy_warning_pct;
    BedUtilization {
        icu: PoolOccupancy::new(BedPool::Icu, icu, config.icu_capacity, warning_pct),
        general: PoolOccupancy::new(BedPool::General, general, config.general_capacity, warning_pct),
        emergency: PoolOccupancy::new(
            BedPool::Emergency,
            emergency,
            config.emergency_capacity,
            warning_pct,
        ),
        avg_length_of_stay_days: stay.value(),
        turnover_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, closed, open, open_cases, reference_now};

    #[test]
    fn critical_emergency_cases_count_in_both_pools() {
        let now = reference_now();
        let episodes = vec![
            open("PT-1", Department::Emergency, "Dr. Desai", Priority::Critical, now),
            open("PT-2", Department::Emergency, "Dr. Joshi", Priority::Low, now),
            open("PT-3", Department::Cardiology, "Dr. Patel", Priority::Critical, now),
            open("PT-4", Department::Cardiology, "Dr. Patel", Priority::High, now),
        ];

        let beds = bed_utilization(&episodes, &DashboardConfig::default());
        assert_eq!(beds.icu.active, 2);
        assert_eq!(beds.emergency.active, 2);
        assert_eq!(beds.general.active, 1);
        assert_eq!(beds.icu.occupancy_pct, 7);
        assert_eq!(beds.emergency.occupancy_pct, 4);
        assert_eq!(beds.general.occupancy_pct, 1);
    }

    #[test]
    fn warning_flag_trips_above_threshold() {
        let now = reference_now();
        let mut episodes = Vec::new();
        for i in 0..26 {
            episodes.push(open(
                &format!("ICU-{i}"),
                Department::Oncology,
                "Dr. Kumar",
                Priority::Critical,
                now,
            ));
        }
        episodes.extend(open_cases("G", 102, Department::Neurology, "Dr. Reddy", now));

        let beds = bed_utilization(&episodes, &DashboardConfig::default());
        // 26 / 30 = 87%
        assert_eq!(beds.icu.occupancy_pct, 87);
        assert!(beds.icu.warning);
        // 102 / 120 = 85%, not above.
        assert_eq!(beds.general.occupancy_pct, 85);
        assert!(!beds.general.warning);
    }

    #[test]
    fn stay_and_turnover_use_resolved_episodes() {
        let episodes = vec![
            closed(
                "PT-1",
                Department::Orthopedics,
                "Dr. Iyer",
                Priority::Low,
                at(2024, 6, 1, 0),
                at(2024, 6, 3, 0),
            ),
            closed(
                "PT-2",
                Department::Orthopedics,
                "Dr. Singh",
                Priority::Low,
                at(2024, 6, 1, 0),
                at(2024, 6, 5, 0),
            ),
        ];

        let beds = bed_utilization(&episodes, &DashboardConfig::default());
        assert_eq!(beds.avg_length_of_stay_days, 3.0);
        assert_eq!(beds.turnover_rate, 0.01);
        assert!(beds.pools().iter().all(|pool| pool.active == 0));
    }

    #[test]
    fn empty_input_is_zero_state() {
        let beds = bed_utilization(&[], &DashboardConfig::default());
        assert_eq!(beds.avg_length_of_stay_days, 0.0);
        assert_eq!(beds.turnover_rate, 0.0);
        assert!(beds.pools().iter().all(|pool| pool.occupancy_pct == 0 && !pool.warning));
    }
}
