//! Synthetic episode population for demos and load testing.

use chrono::{DateTime, Duration, DurationRound, Utc};
use opsboard_core::{elapsed_hours, Department, EpisodeStatus, PatientEpisode, Priority, Shift};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

/// Anything that can hand over a fresh batch of episodes on request.
pub trait RecordSource: Send + Sync {
    fn fetch(&self) -> Vec<PatientEpisode>;
}

/// Generates `batch_size` synthetic episodes on every fetch.
#[derive(Debug, Clone)]
pub struct MockSource {
    pub batch_size: usize,
}

impl Default for MockSource {
    fn default() -> Self {
        Self { batch_size: 500 }
    }
}

impl RecordSource for MockSource {
    fn fetch(&self) -> Vec<PatientEpisode> {
        generate_mock_episodes(self.batch_size)
    }
}

const DEPARTMENT_WEIGHTS: [(Department, u32); 7] = [
    (Department::Cardiology, 15),
    (Department::Neurology, 10),
    (Department::Orthopedics, 15),
    (Department::Pediatrics, 15),
    (Department::Emergency, 15),
    (Department::Oncology, 10),
    (Department::GeneralSurgery, 20),
];

const STATUS_WEIGHTS: [(EpisodeStatus, u32); 4] = [
    (EpisodeStatus::Admitted, 5),
    (EpisodeStatus::InTreatment, 15),
    (EpisodeStatus::Discharged, 70),
    (EpisodeStatus::Transferred, 10),
];

fn priority_weights(department: Department) -> [u32; 4] {
    match department {
        Department::Emergency => [10, 20, 40, 30],
        Department::Oncology => [10, 30, 40, 20],
        _ => [30, 40, 20, 10],
    }
}

fn doctors_for(department: Department) -> &'static [&'static str] {
    match department {
        Department::Cardiology => &["Dr. Sharma", "Dr. Patel"],
        Department::Neurology => &["Dr. Reddy"],
        Department::Orthopedics => &["Dr. Iyer", "Dr. Singh"],
        Department::Pediatrics => &["Dr. Gupta"],
        Department::Emergency => &["Dr. Desai", "Dr. Joshi"],
        Department::Oncology => &["Dr. Kumar"],
        Department::GeneralSurgery => &["Dr. Verma", "Dr. Sharma"],
    }
}

/// Days between admission and `now`, by status: fresh admissions are at most
/// two days old, treatment runs one to ten days, closed episodes five to 24.
fn days_since_admission<R: Rng + ?Sized>(status: EpisodeStatus, rng: &mut R) -> i64 {
    match status {
        EpisodeStatus::Admitted => rng.gen_range(0..3),
        EpisodeStatus::InTreatment => rng.gen_range(1..=10),
        EpisodeStatus::Discharged | EpisodeStatus::Transferred => rng.gen_range(5..25),
    }
}

fn max_stay_days(priority: Priority) -> i64 {
    match priority {
        Priority::Critical => 15,
        Priority::High => 10,
        Priority::Medium => 7,
        Priority::Low => 5,
    }
}

fn base_revenue(department: Department, priority: Priority) -> f64 {
    let by_priority = match priority {
        Priority::Critical => 50_000.0,
        Priority::High => 25_000.0,
        _ => 0.0,
    };
    let by_department = match department {
        Department::Cardiology | Department::Oncology => 30_000.0,
        Department::Neurology | Department::Orthopedics => 20_000.0,
        _ => 0.0,
    };
    15_000.0 + by_priority + by_department
}

fn weighted<T: Copy, R: Rng + ?Sized>(items: &[(T, u32)], rng: &mut R) -> T {
    let weights = items.iter().map(|(_, weight)| *weight);
    match WeightedIndex::new(weights) {
        Ok(index) => items[index.sample(rng)].0,
        Err(_) => items[0].0,
    }
}

/// Generate `count` episodes relative to `now`, sorted by admission time.
///
/// Every record satisfies the episode invariants: closed episodes carry a
/// discharge no later than `now` and a matching resolution time. `now` is
/// truncated to whole milliseconds so timestamps survive a CSV round trip.
pub fn generate_episodes<R: Rng + ?Sized>(
    count: usize,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<PatientEpisode> {
    let now = now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now);
    let mut episodes: Vec<PatientEpisode> = (0..count)
        .map(|i| {
            let department = weighted(&DEPARTMENT_WEIGHTS, rng);
            let priority_table: Vec<(Priority, u32)> = Priority::ALL
                .into_iter()
                .zip(priority_weights(department))
                .collect();
            let priority = weighted(&priority_table, rng);
            let status = weighted(&STATUS_WEIGHTS, rng);
            let shift = Shift::ALL.choose(rng).copied().unwrap_or(Shift::Morning);
            let doctor = doctors_for(department)
                .choose(rng)
                .copied()
                .unwrap_or("Dr. Verma");

            let admitted_at = now - Duration::days(days_since_admission(status, rng));

            let (discharged_at, resolution_hours) = if status.is_active() {
                (None, None)
            } else {
                let stay = Duration::days(rng.gen_range(1..=max_stay_days(priority)));
                let discharged = (admitted_at + stay).min(now);
                (Some(discharged), Some(elapsed_hours(admitted_at, discharged)))
            };

            let revenue = base_revenue(department, priority) + rng.gen_range(0..10_000) as f64;

            PatientEpisode {
                id: format!("PT-{}", 1000 + i),
                department,
                doctor_name: doctor.to_string(),
                admitted_at,
                discharged_at,
                priority,
                status,
                shift,
                resolution_hours,
                revenue,
            }
        })
        .collect();

    episodes.sort_by_key(|episode| episode.admitted_at);
    episodes
}

/// Generate against the wall clock with the thread-local RNG.
pub fn generate_mock_episodes(count: usize) -> Vec<PatientEpisode> {
    generate_episodes(count, Utc::now(), &mut rand::thread_rng())
}
