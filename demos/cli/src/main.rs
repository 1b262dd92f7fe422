use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use opsboard_core::{
    filter_episodes, DashboardConfig, DashboardSnapshot, DateRange, Department, FilterSpec,
    PatientEpisode, Priority, RecordStore,
};
use opsboard_data::{
    export_file_name, generate_mock_episodes, parse_episodes_str, write_episodes_csv,
    AutoRefresh, ExportScope, MockSource, RecordSource,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "opsboard-cli",
    about = "Tổng hợp chỉ số vận hành bệnh viện từ danh sách hồ sơ bệnh nhân."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// In snapshot dashboard dạng JSON.
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// File JSON ghi đè ngưỡng và sức chứa giường.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Chỉ in các chỉ số chính thay vì toàn bộ snapshot.
        #[arg(long)]
        brief: bool,
    },
    /// Sinh dữ liệu giả lập và in ra JSON.
    Generate {
        #[arg(short, long, default_value_t = 500)]
        count: usize,
        /// Ghi ra file thay vì stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Xuất hồ sơ ra CSV. Có bộ lọc thì chỉ xuất phần đã lọc.
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Làm mới dữ liệu giả lập theo chu kỳ và in KPI sau mỗi lần thay thế.
    Watch {
        #[arg(long, value_enum, default_value_t = RefreshInterval::Thirty)]
        interval: RefreshInterval,
        #[arg(short, long, default_value_t = 500)]
        count: usize,
        #[arg(long, default_value_t = 800)]
        fetch_delay_ms: u64,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Đường dẫn tới file JSON hồ sơ bệnh nhân.
    #[arg(short, long, conflicts_with = "mock")]
    input: Option<PathBuf>,
    /// Dùng N hồ sơ giả lập thay cho file.
    #[arg(long)]
    mock: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    #[arg(long, value_parser = parse_department)]
    department: Option<Department>,
    #[arg(long)]
    doctor: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    /// Ngày bắt đầu (YYYY-MM-DD), tính theo UTC.
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,
    /// Ngày kết thúc (YYYY-MM-DD), bao gồm cả ngày này.
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RefreshInterval {
    Off,
    #[value(name = "10s")]
    Ten,
    #[value(name = "30s")]
    Thirty,
    #[value(name = "60s")]
    Sixty,
}

impl RefreshInterval {
    fn duration(self) -> Option<Duration> {
        match self {
            RefreshInterval::Off => None,
            RefreshInterval::Ten => Some(Duration::from_secs(10)),
            RefreshInterval::Thirty => Some(Duration::from_secs(30)),
            RefreshInterval::Sixty => Some(Duration::from_secs(60)),
        }
    }
}

fn parse_department(raw: &str) -> Result<Department, String> {
    Department::ALL
        .into_iter()
        .find(|department| department.as_str().eq_ignore_ascii_case(raw))
        .ok_or_else(|| format!("khoa không hợp lệ: {raw}"))
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    Priority::ALL
        .into_iter()
        .find(|priority| priority.as_str().eq_ignore_ascii_case(raw))
        .ok_or_else(|| format!("mức ưu tiên không hợp lệ: {raw}"))
}

impl FilterArgs {
    fn to_spec(&self) -> anyhow::Result<FilterSpec> {
        let date_range = match (self.from, self.to) {
            (Some(from), Some(to)) => {
                anyhow::ensure!(from <= to, "Ngày bắt đầu phải trước ngày kết thúc");
                let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                    .context("Không dựng được mốc cuối ngày")?;
                Some(DateRange {
                    start: from.and_time(NaiveTime::MIN).and_utc(),
                    end: to.and_time(end_of_day).and_utc(),
                })
            }
            _ => None,
        };

        Ok(FilterSpec {
            date_range,
            department: self.department,
            doctor: self.doctor.clone(),
            priority: self.priority,
        })
    }
}

impl SourceArgs {
    fn load(&self) -> anyhow::Result<Vec<PatientEpisode>> {
        match (&self.input, self.mock) {
            (Some(path), _) => {
                let data = std::fs::read_to_string(path)
                    .with_context(|| format!("Không đọc được file {path:?}"))?;
                parse_episodes_str(&data)
                    .with_context(|| format!("Dữ liệu trong {path:?} không hợp lệ"))
            }
            (None, Some(count)) => Ok(generate_mock_episodes(count)),
            (None, None) => anyhow::bail!("Cần --input <FILE> hoặc --mock <N>"),
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<DashboardConfig> {
    let Some(path) = path else {
        return Ok(DashboardConfig::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file config {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Config {path:?} không hợp lệ"))
}

fn print_brief(snapshot: &DashboardSnapshot) {
    let kpis = &snapshot.kpis;
    println!(
        "Generated at: {}\nPatients: {} (active {})\nBed occupancy: {}%\nAvg resolution: {}h\nEmergency today: {}\nDischarges today: {}\nStaff on duty: {}\nRevenue: {:.0}\nAlerts: {}",
        snapshot.generated_at,
        kpis.total_patients,
        kpis.active_cases,
        kpis.bed_occupancy_pct,
        kpis.avg_resolution_hours,
        kpis.emergency_cases_today,
        kpis.discharges_today,
        kpis.staff_on_duty,
        kpis.total_revenue,
        snapshot.alerts.len()
    );
    for alert in snapshot.alerts() {
        println!("  [{:?}] {}: {}", alert.level, alert.title, alert.message);
    }
}

fn summary(
    source: &SourceArgs,
    filter: &FilterArgs,
    config: Option<&Path>,
    brief: bool,
) -> anyhow::Result<()> {
    let episodes = source.load()?;
    let spec = filter.to_spec()?;
    let config = load_config(config)?;
    let snapshot = DashboardSnapshot::new(&episodes, &spec, &config);

    if brief {
        print_brief(&snapshot);
    } else {
        let json = serde_json::to_string_pretty(&snapshot).context("Không serialize snapshot")?;
        println!("{json}");
    }
    Ok(())
}

/// Buffered pretty JSON. The explicit flush surfaces write errors that a
/// dropped `BufWriter` would swallow.
fn write_episodes_json<W: Write>(out: W, episodes: &[PatientEpisode]) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut writer, episodes).context("Không serialize dữ liệu giả lập")?;
    writer.flush().context("Không flush được dữ liệu")?;
    Ok(())
}

fn generate(count: usize, output: Option<&Path>) -> anyhow::Result<()> {
    let episodes = generate_mock_episodes(count);
    match output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Không tạo được file {path:?}"))?;
            write_episodes_json(file, &episodes)
                .with_context(|| format!("Không ghi được file {path:?}"))?;
            tracing::info!(count, path = %path.display(), "wrote mock episodes");
        }
        None => {
            let json =
                serde_json::to_string_pretty(&episodes).context("Không serialize dữ liệu giả lập")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn export(source: &SourceArgs, filter: &FilterArgs, output_dir: &Path) -> anyhow::Result<()> {
    let episodes = source.load()?;
    let spec = filter.to_spec()?;
    let (scope, rows) = if spec.is_unfiltered() {
        (ExportScope::All, episodes)
    } else {
        (ExportScope::Filtered, filter_episodes(&episodes, &spec))
    };

    if rows.is_empty() {
        eprintln!("No data available to export.");
        return Ok(());
    }

    let path = output_dir.join(export_file_name(scope, Utc::now().date_naive()));
    let file = File::create(&path).with_context(|| format!("Không tạo được file {path:?}"))?;
    write_episodes_csv(&rows, BufWriter::new(file))
        .with_context(|| format!("Không ghi được CSV {path:?}"))?;

    println!("{}", path.display());
    Ok(())
}

async fn watch(
    interval: RefreshInterval,
    count: usize,
    fetch_delay: Duration,
    filter: &FilterArgs,
) -> anyhow::Result<()> {
    let source = Arc::new(MockSource { batch_size: count });
    let store = RecordStore::new(source.fetch());
    let spec = filter.to_spec()?;
    let config = DashboardConfig::default();

    print_brief(&DashboardSnapshot::new(&store.snapshot().episodes, &spec, &config));
    store.subscribe(move |current| {
        println!("--- generation {} ---", current.generation);
        print_brief(&DashboardSnapshot::new(&current.episodes, &spec, &config));
    });

    let mut refresh = AutoRefresh::new(store, source).with_fetch_delay(fetch_delay);
    refresh.set_interval(interval.duration());

    tokio::signal::ctrl_c()
        .await
        .context("Không lắng nghe được tín hiệu Ctrl-C")?;
    refresh.stop().await;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Summary {
            source,
            filter,
            config,
            brief,
        } => summary(&source, &filter, config.as_deref(), brief),
        Command::Generate { count, output } => generate(count, output.as_deref()),
        Command::Export {
            source,
            filter,
            output_dir,
        } => export(&source, &filter, &output_dir),
        Command::Watch {
            interval,
            count,
            fetch_delay_ms,
            filter,
        } => {
            let runtime = tokio::runtime::Runtime::new().context("Không khởi tạo được tokio runtime")?;
            runtime.block_on(watch(
                interval,
                count,
                Duration::from_millis(fetch_delay_ms),
                &filter,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_write_reports_failed_flush() {
        let episodes = generate_mock_episodes(3);
        let err = write_episodes_json(FullDisk, &episodes).expect_err("write must fail");
        assert!(format!("{err:#}").contains("no space left on device"));
    }

    #[test]
    fn json_write_produces_parseable_records() {
        let episodes = generate_mock_episodes(3);
        let mut buffer = Vec::new();
        write_episodes_json(&mut buffer, &episodes).expect("Không ghi được JSON");
        let parsed = parse_episodes_str(&String::from_utf8(buffer).expect("utf-8"))
            .expect("Không parse được JSON");
        assert_eq!(parsed.len(), episodes.len());
        for (read, written) in parsed.iter().zip(&episodes) {
            assert_eq!(read.id, written.id);
            assert_eq!(read.admitted_at, written.admitted_at);
            assert_eq!(read.discharged_at, written.discharged_at);
        }
    }

    #[test]
    fn filter_flags_build_inclusive_utc_days() {
        let args = FilterArgs {
            from: NaiveDate::from_ymd_opt(2024, 6, 1),
            to: NaiveDate::from_ymd_opt(2024, 6, 3),
            department: parse_department("general surgery").ok(),
            ..FilterArgs::default()
        };
        let spec = args.to_spec().expect("valid filter");
        let range = spec.date_range.expect("date range");
        assert_eq!(range.start.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert!(range.end.to_rfc3339().starts_with("2024-06-03T23:59:59.999"));
        assert_eq!(spec.department, Some(Department::GeneralSurgery));
    }
}
