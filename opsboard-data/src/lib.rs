//! Episode ingestion, CSV export, synthetic data and auto-refresh for the
//! operations dashboard.

use opsboard_core::{DashboardConfig, DashboardError, DashboardSnapshot, FilterSpec, PatientEpisode};
use serde::Deserialize;
use serde_json::Value;

mod export;
mod mock;
#[cfg(feature = "refresh")]
mod refresh;

pub use export::{export_file_name, write_episodes_csv, ExportScope, CSV_HEADER};
pub use mock::{generate_episodes, generate_mock_episodes, MockSource, RecordSource};
#[cfg(feature = "refresh")]
pub use refresh::{AutoRefresh, RefreshConfig, RefreshHandle};

/// Parse a JSON array of episodes and validate every record.
pub fn parse_episodes_str(json: &str) -> Result<Vec<PatientEpisode>, DashboardError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| DashboardError::Parse(err.to_string()))?;
    parse_episodes_value(&value)
}

/// Parse episodes from a `serde_json::Value`.
///
/// Accepts either a bare array or an object with an `episodes` array.
pub fn parse_episodes_value(value: &Value) -> Result<Vec<PatientEpisode>, DashboardError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(map) => map
            .get("episodes")
            .and_then(Value::as_array)
            .ok_or_else(|| DashboardError::Parse("expected an `episodes` array".to_string()))?,
        other => {
            return Err(DashboardError::Parse(format!(
                "expected an array of episodes, received {}",
                json_kind(other)
            )))
        }
    };

    let mut episodes = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let episode = PatientEpisode::deserialize(entry)
            .map_err(|err| DashboardError::Parse(format!("entry {index}: {err}")))?;
        episode.validate()?;
        episodes.push(episode);
    }

    tracing::debug!(count = episodes.len(), "parsed episodes");
    Ok(episodes)
}

/// Parse, validate and summarize in one step.
pub fn summarize_episodes_str(
    json: &str,
    filter: &FilterSpec,
    config: &DashboardConfig,
) -> Result<DashboardSnapshot, DashboardError> {
    let episodes = parse_episodes_str(json)?;
    Ok(DashboardSnapshot::new(&episodes, filter, config))
}

/// Summarize an already-parsed JSON value.
pub fn summarize_episodes_value(
    value: &Value,
    filter: &FilterSpec,
    config: &DashboardConfig,
) -> Result<DashboardSnapshot, DashboardError> {
    let episodes = parse_episodes_value(value)?;
    Ok(DashboardSnapshot::new(&episodes, filter, config))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
