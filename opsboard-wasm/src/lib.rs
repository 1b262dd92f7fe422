//! Bridge WASM <-> JavaScript cho dashboard vận hành bệnh viện, trung lập framework.

use chrono::{NaiveDate, Utc};
use opsboard_core::{DashboardConfig, DashboardError, FilterSpec, PatientEpisode};
use opsboard_data::ExportScope;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Config từ phía JS: mọi trường đều tùy chọn, thiếu thì dùng mặc định.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsDashboardConfig {
    #[serde(default)]
    total_bed_capacity: Option<u32>,
    #[serde(default)]
    icu_capacity: Option<u32>,
    #[serde(default)]
    general_capacity: Option<u32>,
    #[serde(default)]
    emergency_capacity: Option<u32>,
    #[serde(default)]
    occupancy_warning_pct: Option<u32>,
    #[serde(default)]
    overload_active_cases: Option<usize>,
    #[serde(default)]
    underutilized_active_cases: Option<usize>,
    #[serde(default)]
    bed_alert_pct: Option<f64>,
    #[serde(default)]
    emergency_spike_threshold: Option<usize>,
    #[serde(default)]
    department_overload_active_cases: Option<usize>,
    #[serde(default)]
    moving_average_window: Option<usize>,
    #[serde(default)]
    series_length: Option<usize>,
    #[serde(default)]
    backlog_aged_threshold: Option<usize>,
}

impl From<JsDashboardConfig> for DashboardConfig {
    fn from(cfg: JsDashboardConfig) -> Self {
        let mut base = DashboardConfig::default();
        if let Some(beds) = cfg.total_bed_capacity {
            base.total_bed_capacity = beds;
        }
        if let Some(beds) = cfg.icu_capacity {
            base.icu_capacity = beds;
        }
        if let Some(beds) = cfg.general_capacity {
            base.general_capacity = beds;
        }
        if let Some(beds) = cfg.emergency_capacity {
            base.emergency_capacity = beds;
        }
        if let Some(pct) = cfg.occupancy_warning_pct {
            base.occupancy_warning_pct = pct;
        }
        if let Some(cases) = cfg.overload_active_cases {
            base.overload_active_cases = cases;
        }
        if let Some(cases) = cfg.underutilized_active_cases {
            base.underutilized_active_cases = cases;
        }
        if let Some(pct) = cfg.bed_alert_pct {
            base.bed_alert_pct = pct;
        }
        if let Some(cases) = cfg.emergency_spike_threshold {
            base.emergency_spike_threshold = cases;
        }
        if let Some(cases) = cfg.department_overload_active_cases {
            base.department_overload_active_cases = cases;
        }
        if let Some(window) = cfg.moving_average_window {
            base.moving_average_window = window;
        }
        if let Some(days) = cfg.series_length {
            base.series_length = days;
        }
        if let Some(cases) = cfg.backlog_aged_threshold {
            base.backlog_aged_threshold = cases;
        }
        base
    }
}

fn read_config(config: Option<JsValue>) -> Result<DashboardConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsDashboardConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(DashboardConfig::from(cfg))
        }
        _ => Ok(DashboardConfig::default()),
    }
}

fn read_filter(filter: Option<JsValue>) -> Result<FilterSpec, JsValue> {
    match filter {
        Some(js_filter) if !js_filter.is_undefined() && !js_filter.is_null() => from_value(js_filter)
            .map_err(|err| JsValue::from_str(&format!("Không đọc được bộ lọc: {err}"))),
        _ => Ok(FilterSpec::default()),
    }
}

fn read_records(records: JsValue) -> Result<serde_json::Value, JsValue> {
    from_value::<serde_json::Value>(records)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách hồ sơ: {err}")))
}

/// Lọc và tổng hợp toàn bộ các panel của dashboard từ danh sách hồ sơ JSON.
#[wasm_bindgen]
pub fn summarize_episodes(
    records: JsValue,
    filter: Option<JsValue>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let records = read_records(records)?;
    let filter = read_filter(filter)?;
    let cfg = read_config(config)?;

    let snapshot = opsboard_data::summarize_episodes_value(&records, &filter, &cfg)
        .map_err(|err| JsValue::from_str(&format_dashboard_error(err)))?;

    to_value(&snapshot)
        .map_err(|err| JsValue::from_str(&format!("Không serialize snapshot: {err}")))
}

/// Sinh dữ liệu giả lập cho chế độ demo.
#[wasm_bindgen]
pub fn generate_mock_episodes(count: usize) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let episodes = opsboard_data::generate_mock_episodes(count);
    to_value(&episodes)
        .map_err(|err| JsValue::from_str(&format!("Không serialize dữ liệu giả lập: {err}")))
}

/// Xuất CSV. Trả về `{ fileName, content }`; danh sách rỗng trả về lỗi.
#[wasm_bindgen]
pub fn export_episodes_csv(records: JsValue, filtered: bool) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let records = read_records(records)?;
    let episodes = opsboard_data::parse_episodes_value(&records)
        .map_err(|err| JsValue::from_str(&format_dashboard_error(err)))?;

    let export = build_csv_export(&episodes, filtered, Utc::now().date_naive())
        .map_err(|err| JsValue::from_str(&format_dashboard_error(err)))?;

    to_value(&export).map_err(|err| JsValue::from_str(&format!("Không serialize CSV: {err}")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvExport {
    file_name: String,
    content: String,
}

fn build_csv_export(
    episodes: &[PatientEpisode],
    filtered: bool,
    day: NaiveDate,
) -> Result<CsvExport, DashboardError> {
    let scope = if filtered {
        ExportScope::Filtered
    } else {
        ExportScope::All
    };

    let mut buffer = Vec::new();
    opsboard_data::write_episodes_csv(episodes, &mut buffer)?;
    let content = String::from_utf8(buffer)
        .map_err(|err| DashboardError::Other(format!("CSV không phải UTF-8: {err}")))?;

    Ok(CsvExport {
        file_name: opsboard_data::export_file_name(scope, day),
        content,
    })
}

fn format_dashboard_error(err: DashboardError) -> String {
    format!("Dashboard error: {err}")
}
