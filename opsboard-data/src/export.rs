//! CSV export in the source system's column layout.

use std::io;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use opsboard_core::{DashboardError, PatientEpisode};

pub const CSV_HEADER: [&str; 10] = [
    "Patient_ID",
    "Department",
    "Doctor_Name",
    "Admission_Date",
    "Discharge_Date",
    "Priority",
    "Status",
    "Shift",
    "Resolution_Time",
    "Revenue",
];

/// Whether the export covers the whole working set or the filtered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    All,
    Filtered,
}

impl ExportScope {
    fn as_str(&self) -> &'static str {
        match self {
            ExportScope::All => "all",
            ExportScope::Filtered => "filtered",
        }
    }
}

/// `hospital_data_{all|filtered}_{YYYY-MM-DD}.csv`
pub fn export_file_name(scope: ExportScope, day: NaiveDate) -> String {
    format!("hospital_data_{}_{}.csv", scope.as_str(), day.format("%Y-%m-%d"))
}

/// Write one header row plus one row per episode. Absent values are empty
/// fields; values containing a comma, quote or newline are double-quoted.
///
/// An empty episode list is refused with [`DashboardError::EmptyExport`] and
/// nothing is written.
pub fn write_episodes_csv<W: io::Write>(
    episodes: &[PatientEpisode],
    out: W,
) -> Result<(), DashboardError> {
    if episodes.is_empty() {
        return Err(DashboardError::EmptyExport);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(out);

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for episode in episodes {
        writer.write_record(episode_row(episode)).map_err(csv_error)?;
    }
    writer
        .flush()
        .map_err(|err| DashboardError::Other(format!("csv flush: {err}")))?;

    tracing::info!(rows = episodes.len(), "exported episodes to csv");
    Ok(())
}

fn episode_row(episode: &PatientEpisode) -> [String; 10] {
    [
        episode.id.clone(),
        episode.department.to_string(),
        episode.doctor_name.clone(),
        format_instant(episode.admitted_at),
        episode.discharged_at.map(format_instant).unwrap_or_default(),
        episode.priority.to_string(),
        episode.status.to_string(),
        episode.shift.to_string(),
        episode
            .resolution_hours
            .map(|hours| hours.to_string())
            .unwrap_or_default(),
        episode.revenue.to_string(),
    ]
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn csv_error(err: csv::Error) -> DashboardError {
    DashboardError::Other(format!("csv export: {err}"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use opsboard_core::{Department, EpisodeStatus, Priority, Shift};

    use super::*;

    fn episode(doctor: &str) -> PatientEpisode {
        let admitted_at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).single().expect("valid");
        PatientEpisode {
            id: "PT-1001".to_string(),
            department: Department::GeneralSurgery,
            doctor_name: doctor.to_string(),
            admitted_at,
            discharged_at: None,
            priority: Priority::Medium,
            status: EpisodeStatus::InTreatment,
            shift: Shift::Night,
            resolution_hours: None,
            revenue: 17250.0,
        }
    }

    fn export(episodes: &[PatientEpisode]) -> String {
        let mut buffer = Vec::new();
        write_episodes_csv(episodes, &mut buffer).expect("export succeeds");
        String::from_utf8(buffer).expect("utf-8 csv")
    }

    #[test]
    fn header_and_row_layout() {
        let csv = export(&[episode("Dr. Verma")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("PT-1001,General Surgery,Dr. Verma,2024-06-01T08:00:00.000Z,,Medium,In Treatment,Night,,17250")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn closed_episode_exports_discharge_and_hours() {
        let mut closed = episode("Dr. Verma");
        closed.status = EpisodeStatus::Discharged;
        closed.discharged_at = Some(closed.admitted_at + chrono::Duration::minutes(90));
        closed.resolution_hours = Some(1.5);

        let csv = export(&[closed]);
        assert!(csv.contains(",2024-06-01T09:30:00.000Z,Medium,Discharged,Night,1.5,17250"));
    }

    #[test]
    fn values_with_commas_are_quoted() {
        let csv = export(&[episode("Verma, A.")]);
        assert!(csv.contains(r#",General Surgery,"Verma, A.",2024"#));
    }

    #[test]
    fn exported_rows_read_back_with_every_field() {
        let csv = export(&[episode("Verma, A."), episode("Dr. Iyer")]);
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("readable csv");
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "Verma, A.");
        assert!(rows.iter().all(|row| row.len() == CSV_HEADER.len()));
    }

    #[test]
    fn generated_episodes_survive_export_and_read_back() {
        let episodes = crate::generate_mock_episodes(60);
        let csv = export(&episodes);
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("readable csv");
        assert_eq!(rows.len(), episodes.len());

        let instant = |field: &str| -> Option<DateTime<Utc>> {
            (!field.is_empty()).then(|| {
                DateTime::parse_from_rfc3339(field)
                    .expect("rfc3339 timestamp")
                    .with_timezone(&Utc)
            })
        };
        let number = |field: &str| -> Option<f64> {
            (!field.is_empty()).then(|| field.parse().expect("numeric field"))
        };

        for (episode, row) in episodes.iter().zip(&rows) {
            assert_eq!(&row[0], episode.id);
            assert_eq!(&row[1], episode.department.as_str());
            assert_eq!(&row[2], episode.doctor_name);
            assert_eq!(instant(&row[3]), Some(episode.admitted_at));
            assert_eq!(instant(&row[4]), episode.discharged_at);
            assert_eq!(&row[5], episode.priority.as_str());
            assert_eq!(&row[6], episode.status.as_str());
            assert_eq!(&row[7], episode.shift.as_str());
            assert_eq!(number(&row[8]), episode.resolution_hours);
            assert_eq!(number(&row[9]), Some(episode.revenue));
        }
    }

    #[test]
    fn empty_export_is_refused() {
        let mut buffer = Vec::new();
        let err = write_episodes_csv(&[], &mut buffer).expect_err("nothing to export");
        assert!(matches!(err, DashboardError::EmptyExport));
        assert!(buffer.is_empty());
    }

    #[test]
    fn file_name_carries_scope_and_date() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date");
        assert_eq!(
            export_file_name(ExportScope::Filtered, day),
            "hospital_data_filtered_2024-06-15.csv"
        );
        assert_eq!(export_file_name(ExportScope::All, day), "hospital_data_all_2024-06-15.csv");
    }
}
