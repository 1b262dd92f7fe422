use serde::{Deserialize, Serialize};

use crate::util::{rounded_percent, Mean};
use crate::{PatientEpisode, Shift};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftEfficiency {
    pub shift: Shift,
    pub total: usize,
    pub resolved: usize,
    pub resolution_rate_pct: u32,
    pub avg_handling_hours: u32,
}

/// Efficiency for every shift, Morning through Night, over all episodes.
pub fn shift_efficiency(episodes: &[PatientEpisode]) -> Vec<ShiftEfficiency> {
    Shift::ALL
        .into_iter()
        .map(|shift| {
            let mut total = 0;
            let mut handling = Mean::default();
            for episode in episodes.iter().filter(|e| e.shift == shift) {
                total += 1;
                if let Some(hours) = episode.resolution_hours {
                    handling.push(hours);
                }
            }
            ShiftEfficiency {
                shift,
                total,
                resolved: handling.count(),
                resolution_rate_pct: rounded_percent(handling.count(), total),
                avg_handling_hours: handling.rounded(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, closed, open, reference_now};
    use crate::{Department, Priority};

    #[test]
    fn rates_and_handling_per_shift() {
        let now = reference_now();
        let mut night_open = open("PT-1", Department::Emergency, "Dr. Desai", Priority::High, now);
        night_open.shift = Shift::Night;
        let mut night_closed = closed(
            "PT-2",
            Department::Emergency,
            "Dr. Desai",
            Priority::High,
            at(2024, 6, 1, 0),
            at(2024, 6, 1, 9),
        );
        night_closed.shift = Shift::Night;
        let mut night_closed_long = closed(
            "PT-3",
            Department::Emergency,
            "Dr. Joshi",
            Priority::High,
            at(2024, 6, 1, 0),
            at(2024, 6, 1, 20),
        );
        night_closed_long.shift = Shift::Night;
        let morning = open("PT-4", Department::Pediatrics, "Dr. Gupta", Priority::Low, now);

        let stats = shift_efficiency(&[night_open, night_closed, night_closed_long, morning]);
        let shifts: Vec<Shift> = stats.iter().map(|s| s.shift).collect();
        assert_eq!(shifts, Shift::ALL.to_vec());

        let morning = &stats[0];
        assert_eq!((morning.total, morning.resolved), (1, 0));
        assert_eq!(morning.resolution_rate_pct, 0);
        assert_eq!(morning.avg_handling_hours, 0);

        assert_eq!(stats[1].total, 0);

        let night = &stats[2];
        assert_eq!(night.total, 3);
        assert_eq!(night.resolution_rate_pct, 67);
        // (9 + 20) / 2 = 14.5
        assert_eq!(night.avg_handling_hours, 15);
    }
}
