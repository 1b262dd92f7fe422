//! Logic lõi tổng hợp chỉ số vận hành bệnh viện từ danh sách lượt điều trị.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

mod admissions;
mod alerts;
mod beds;
mod distribution;
mod filter;
mod metrics;
mod resolution;
mod shifts;
mod store;
mod util;
mod workload;

#[cfg(test)]
pub(crate) mod testing;

pub use admissions::{admissions_timeline, AdmissionsPoint};
pub use alerts::{evaluate_alerts, Alert, AlertLevel};
pub use beds::{bed_utilization, BedPool, BedUtilization, PoolOccupancy};
pub use distribution::{department_workload, priority_distribution, DepartmentCount, PriorityCount};
pub use filter::{filter_episodes, DateRange, FilterOptions, FilterSpec};
pub use metrics::{compute_kpis, Kpis};
pub use resolution::{
    resolution_trends, CaseAging, DepartmentResolution, ResolutionPoint, ResolutionTrends,
};
pub use shifts::{shift_efficiency, ShiftEfficiency};
pub use store::{RecordStore, StoreSnapshot, SubscriptionId};
pub use util::elapsed_hours;
pub use workload::{doctor_workload, DoctorLoad, Recommendation, WorkloadStatus};

/// Sai số cho phép (giờ) khi đối chiếu `Resolution_Time` với mốc nhập/xuất viện.
pub const RESOLUTION_TOLERANCE_HOURS: f64 = 0.01;

/// Cấu hình sức chứa và các ngưỡng cảnh báo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Tổng số giường dùng cho KPI công suất và cảnh báo.
    pub total_bed_capacity: u32,
    pub icu_capacity: u32,
    pub general_capacity: u32,
    pub emergency_capacity: u32,
    /// Ngưỡng (%) đánh dấu một khu giường sắp đầy.
    pub occupancy_warning_pct: u32,
    /// Số ca đang điều trị vượt mức này thì bác sĩ bị coi là quá tải.
    pub overload_active_cases: usize,
    /// Số ca đang điều trị dưới mức này thì bác sĩ còn dư công suất.
    pub underutilized_active_cases: usize,
    pub bed_alert_pct: f64,
    pub emergency_spike_threshold: usize,
    pub department_overload_active_cases: usize,
    /// Số điểm (ngày) của cửa sổ trung bình trượt.
    pub moving_average_window: usize,
    /// Số điểm tối đa giữ lại trên các chuỗi theo ngày.
    pub series_length: usize,
    /// Số ca tồn đọng >72h tối thiểu để bật cảnh báo backlog.
    pub backlog_aged_threshold: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            total_bed_capacity: 230,
            icu_capacity: 30,
            general_capacity: 120,
            emergency_capacity: 50,
            occupancy_warning_pct: 85,
            overload_active_cases: 18,
            underutilized_active_cases: 12,
            bed_alert_pct: 90.0,
            emergency_spike_threshold: 25,
            department_overload_active_cases: 45,
            moving_average_window: 7,
            series_length: 14,
            backlog_aged_threshold: 10,
        }
    }
}

impl DashboardConfig {
    /// Tổng sức chứa của ba khu giường (ICU, thường, cấp cứu).
    pub fn pooled_capacity(&self) -> u32 {
        self.icu_capacity + self.general_capacity + self.emergency_capacity
    }
}

/// Khoa tiếp nhận.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Department {
    Cardiology,
    Neurology,
    Orthopedics,
    Pediatrics,
    Emergency,
    Oncology,
    #[serde(rename = "General Surgery")]
    GeneralSurgery,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Department::Cardiology,
        Department::Neurology,
        Department::Orthopedics,
        Department::Pediatrics,
        Department::Emergency,
        Department::Oncology,
        Department::GeneralSurgery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Cardiology => "Cardiology",
            Department::Neurology => "Neurology",
            Department::Orthopedics => "Orthopedics",
            Department::Pediatrics => "Pediatrics",
            Department::Emergency => "Emergency",
            Department::Oncology => "Oncology",
            Department::GeneralSurgery => "General Surgery",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mức độ ưu tiên, sắp theo thứ tự tăng dần về độ nặng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trạng thái lượt điều trị.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EpisodeStatus {
    Admitted,
    #[serde(rename = "In Treatment")]
    InTreatment,
    Discharged,
    Transferred,
}

impl EpisodeStatus {
    /// `Admitted` và `In Treatment` là ca đang mở.
    pub fn is_active(&self) -> bool {
        matches!(self, EpisodeStatus::Admitted | EpisodeStatus::InTreatment)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Admitted => "Admitted",
            EpisodeStatus::InTreatment => "In Treatment",
            EpisodeStatus::Discharged => "Discharged",
            EpisodeStatus::Transferred => "Transferred",
        }
    }
}

impl fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ca trực ghi nhận lượt điều trị.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Afternoon, Shift::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "Morning",
            Shift::Afternoon => "Afternoon",
            Shift::Night => "Night",
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Một lượt điều trị: từ lúc nhập viện tới khi xuất viện (hoặc còn mở).
///
/// Tên trường khi serialize khớp với file xuất của hệ thống nguồn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientEpisode {
    #[serde(rename = "Patient_ID")]
    pub id: String,
    #[serde(rename = "Department")]
    pub department: Department,
    #[serde(rename = "Doctor_Name")]
    pub doctor_name: String,
    #[serde(rename = "Admission_Date")]
    pub admitted_at: DateTime<Utc>,
    #[serde(rename = "Discharge_Date")]
    pub discharged_at: Option<DateTime<Utc>>,
    #[serde(rename = "Priority")]
    pub priority: Priority,
    #[serde(rename = "Status")]
    pub status: EpisodeStatus,
    #[serde(rename = "Shift")]
    pub shift: Shift,
    #[serde(rename = "Resolution_Time")]
    pub resolution_hours: Option<f64>,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
}

impl PatientEpisode {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Nhập viện trong ngày `day` (so khớp theo ngày dương lịch UTC).
    pub fn admitted_on(&self, day: NaiveDate) -> bool {
        self.admitted_at.date_naive() == day
    }

    pub fn discharged_on(&self, day: NaiveDate) -> bool {
        self.discharged_at
            .map(|discharged| discharged.date_naive() == day)
            .unwrap_or(false)
    }

    /// Kiểm tra các bất biến của bản ghi tại biên nhập dữ liệu.
    pub fn validate(&self) -> Result<(), DashboardError> {
        let invalid = |reason: String| DashboardError::InvalidEpisode {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("Patient_ID is empty".to_string()));
        }

        if !self.revenue.is_finite() || self.revenue < 0.0 {
            return Err(invalid(format!("revenue {} is not a non-negative amount", self.revenue)));
        }

        if self.status.is_active() == self.discharged_at.is_some() {
            return Err(invalid(format!(
                "status {} does not agree with the discharge date",
                self.status
            )));
        }

        match (self.discharged_at, self.resolution_hours) {
            (None, None) => Ok(()),
            (Some(discharged), Some(hours)) => {
                if discharged < self.admitted_at {
                    return Err(invalid("discharge precedes admission".to_string()));
                }
                let expected = elapsed_hours(self.admitted_at, discharged);
                if !hours.is_finite() || (expected - hours).abs() > RESOLUTION_TOLERANCE_HOURS {
                    return Err(invalid(format!(
                        "Resolution_Time {hours} differs from the {expected:.2}h stay"
                    )));
                }
                Ok(())
            }
            (Some(_), None) => Err(invalid("discharged episode has no Resolution_Time".to_string())),
            (None, Some(_)) => Err(invalid("open episode carries a Resolution_Time".to_string())),
        }
    }
}

/// Toàn bộ dữ liệu dẫn xuất cho một lần dựng dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub filter: FilterSpec,
    /// Giá trị cho các bộ lọc, lấy từ tập chưa lọc.
    pub options: FilterOptions,
    pub kpis: Kpis,
    pub beds: BedUtilization,
    pub doctors: Vec<DoctorLoad>,
    pub resolution: ResolutionTrends,
    pub shifts: Vec<ShiftEfficiency>,
    pub admissions: Vec<AdmissionsPoint>,
    pub priorities: Vec<PriorityCount>,
    pub departments: Vec<DepartmentCount>,
    pub alerts: Vec<Alert>,
}

impl DashboardSnapshot {
    /// Dựng snapshot theo đồng hồ hệ thống.
    pub fn new(episodes: &[PatientEpisode], filter: &FilterSpec, config: &DashboardConfig) -> Self {
        Self::build(episodes, filter, config, Utc::now())
    }

    /// Lọc một lần rồi chạy mọi bộ tổng hợp trên cùng tập đã lọc.
    pub fn build(
        episodes: &[PatientEpisode],
        filter: &FilterSpec,
        config: &DashboardConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let filtered = filter_episodes(episodes, filter);
        tracing::debug!(
            total = episodes.len(),
            retained = filtered.len(),
            "building dashboard snapshot"
        );

        Self {
            generated_at: now,
            filter: filter.clone(),
            options: FilterOptions::from_episodes(episodes),
            kpis: compute_kpis(&filtered, config, now),
            beds: bed_utilization(&filtered, config),
            doctors: doctor_workload(&filtered, config, now),
            resolution: resolution_trends(&filtered, config, now),
            shifts: shift_efficiency(&filtered),
            admissions: admissions_timeline(&filtered, config),
            priorities: priority_distribution(&filtered),
            departments: department_workload(&filtered),
            alerts: evaluate_alerts(&filtered, config, now),
        }
    }

    /// Truy cập danh sách cảnh báo.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }
}

/// Lỗi chung của dashboard.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Lượt điều trị {id} không hợp lệ: {reason}")]
    InvalidEpisode { id: String, reason: String },
    #[error("Không có dữ liệu để xuất")]
    EmptyExport,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Lỗi khác: {0}")]
    Other(String),
}

/// Tiện ích dựng snapshot rỗng (dùng cho mock/testing).
pub fn empty_snapshot() -> DashboardSnapshot {
    DashboardSnapshot::build(
        &[],
        &FilterSpec::default(),
        &DashboardConfig::default(),
        Utc::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, closed, open, reference_now};

    #[test]
    fn three_record_example() {
        let now = reference_now();
        let episodes = vec![
            open("PT-1", Department::Emergency, "Dr. Desai", Priority::Critical, now),
            closed(
                "PT-2",
                Department::GeneralSurgery,
                "Dr. Verma",
                Priority::Low,
                at(2024, 6, 13, 12),
                at(2024, 6, 15, 12),
            ),
            closed(
                "PT-3",
                Department::Cardiology,
                "Dr. Patel",
                Priority::High,
                at(2024, 6, 5, 8),
                at(2024, 6, 6, 8),
            ),
        ];

        let snapshot = DashboardSnapshot::build(
            &episodes,
            &FilterSpec::default(),
            &DashboardConfig::default(),
            now,
        );

        assert_eq!(snapshot.kpis.total_patients, 3);
        assert_eq!(snapshot.kpis.active_cases, 1);
        assert_eq!(snapshot.kpis.discharges_today, 1);
        assert_eq!(snapshot.kpis.avg_resolution_hours, 36);
        assert_eq!(snapshot.options.doctors.len(), 3);
    }

    #[test]
    fn empty_snapshot_is_zero_state() {
        let snapshot = empty_snapshot();
        assert_eq!(snapshot.kpis, Kpis::default());
        assert!(snapshot.doctors.is_empty());
        assert!(snapshot.alerts.is_empty());
        assert!(snapshot.admissions.is_empty());
        assert!(snapshot.resolution.series.is_empty());
        assert_eq!(snapshot.shifts.len(), 3);
        assert!(snapshot.shifts.iter().all(|s| s.total == 0));
    }

    #[test]
    fn validate_accepts_consistent_episodes() {
        let now = reference_now();
        let open_case = open("PT-1", Department::Neurology, "Dr. Reddy", Priority::Medium, now);
        let closed_case = closed(
            "PT-2",
            Department::Neurology,
            "Dr. Reddy",
            Priority::Medium,
            at(2024, 6, 1, 0),
            at(2024, 6, 3, 6),
        );
        assert!(open_case.validate().is_ok());
        assert!(closed_case.validate().is_ok());
    }

    #[test]
    fn validate_rejects_broken_invariants() {
        let now = reference_now();
        let mut reversed = closed(
            "PT-1",
            Department::Oncology,
            "Dr. Kumar",
            Priority::High,
            at(2024, 6, 3, 0),
            at(2024, 6, 4, 0),
        );
        reversed.discharged_at = Some(at(2024, 6, 2, 0));
        assert!(matches!(
            reversed.validate(),
            Err(DashboardError::InvalidEpisode { .. })
        ));

        let mut active_with_discharge =
            open("PT-2", Department::Oncology, "Dr. Kumar", Priority::High, now);
        active_with_discharge.discharged_at = Some(now);
        active_with_discharge.resolution_hours = Some(0.0);
        assert!(active_with_discharge.validate().is_err());

        let mut wrong_hours = closed(
            "PT-3",
            Department::Oncology,
            "Dr. Kumar",
            Priority::Low,
            at(2024, 6, 1, 0),
            at(2024, 6, 2, 0),
        );
        wrong_hours.resolution_hours = Some(30.0);
        assert!(wrong_hours.validate().is_err());

        let mut negative_revenue =
            open("PT-4", Department::Oncology, "Dr. Kumar", Priority::Low, now);
        negative_revenue.revenue = -1.0;
        assert!(negative_revenue.validate().is_err());
    }

    #[test]
    fn episode_uses_source_field_names() {
        let now = reference_now();
        let episode = open("PT-7", Department::GeneralSurgery, "Dr. Verma", Priority::Low, now);
        let value = serde_json::to_value(&episode).expect("serialize episode");

        assert_eq!(value["Patient_ID"], "PT-7");
        assert_eq!(value["Department"], "General Surgery");
        assert_eq!(value["Status"], "Admitted");
        assert!(value["Discharge_Date"].is_null());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{ "total_bed_capacity": 100 }"#).expect("parse config");
        assert_eq!(config.total_bed_capacity, 100);
        assert_eq!(config.overload_active_cases, 18);
        assert_eq!(config.pooled_capacity(), 200);
    }
}
