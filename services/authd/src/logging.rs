//! 日志系统模块职责：
//! 1. 初始化 stdout + 文件双通道 tracing 日志。
//! 2. 将运行日志按天落在 `logs/raw` 目录。
//! 3. 定期清理超过保留天数的历史日志文件。

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// 默认日志根目录（相对当前工作目录）。
const DEFAULT_LOG_DIR: &str = "logs";
/// 日志原始文件目录名。
const RAW_DIR_NAME: &str = "raw";
/// 默认日志保留天数。
const DEFAULT_RETENTION_DAYS: i64 = 14;
/// 清理任务轮询周期（秒）。
const PRUNE_INTERVAL_SEC: u64 = 3600;
/// stdout 未设置 `RUST_LOG` 时的级别。
const DEFAULT_STDOUT_LEVEL: LevelFilter = LevelFilter::INFO;
/// 文件日志未配置时的级别。
const DEFAULT_FILE_LEVEL: LevelFilter = LevelFilter::DEBUG;

/// 日志运行时守卫，防止 non-blocking writer 提前析构。
pub(crate) struct LogRuntime {
    _stdout_guard: WorkerGuard,
    _file_guard: WorkerGuard,
    _pruner: JoinHandle<()>,
}

/// 由 `AUTHD_LOG_*` 环境变量解析出的日志设置。
#[derive(Debug, PartialEq, Eq)]
struct LogSettings {
    raw_dir: PathBuf,
    file_level: LevelFilter,
    retention_days: i64,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::current_dir().ok())
    }

    /// 相对目录基于 `cwd` 展开；非法取值回退默认。
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, cwd: Option<PathBuf>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let root = PathBuf::from(read("AUTHD_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.into()));
        let root = match cwd {
            Some(cwd) if root.is_relative() => cwd.join(root),
            _ => root,
        };
        let file_level = read("AUTHD_FILE_LOG_LEVEL")
            .and_then(|raw| raw.parse::<LevelFilter>().ok())
            .unwrap_or(DEFAULT_FILE_LEVEL);
        let retention_days = read("AUTHD_LOG_RETENTION_DAYS")
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_RETENTION_DAYS);

        Self {
            raw_dir: root.join(RAW_DIR_NAME),
            file_level,
            retention_days,
        }
    }
}

/// 初始化日志：stdout 按 `RUST_LOG` 过滤，文件按天滚动并定期清理过期文件。
pub(crate) fn init(service_name: &str) -> Result<LogRuntime> {
    let settings = LogSettings::from_env();
    fs::create_dir_all(&settings.raw_dir)
        .with_context(|| format!("create log dir: {}", settings.raw_dir.display()))?;
    prune_expired_logs(&settings.raw_dir, settings.retention_days)?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&settings.raw_dir, format!("{service_name}.log")),
    );
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_filter = EnvFilter::builder()
        .with_default_directive(DEFAULT_STDOUT_LEVEL.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(stdout_writer)
                .with_filter(stdout_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(settings.file_level),
        )
        .init();

    Ok(LogRuntime {
        _stdout_guard: stdout_guard,
        _file_guard: file_guard,
        _pruner: spawn_prune_task(settings.raw_dir, settings.retention_days),
    })
}

fn spawn_prune_task(raw_dir: PathBuf, retention_days: i64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(PRUNE_INTERVAL_SEC));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(err) = prune_expired_logs(&raw_dir, retention_days) {
                warn!("prune logs failed: {err}");
            }
        }
    })
}

/// 删除早于保留窗口的日志文件。
fn prune_expired_logs(raw_dir: &Path, retention_days: i64) -> Result<()> {
    if !raw_dir.exists() {
        return Ok(());
    }
    let today = Local::now().date_naive();
    for entry in
        fs::read_dir(raw_dir).with_context(|| format!("read raw logs: {}", raw_dir.display()))?
    {
        let entry = entry.with_context(|| format!("read entry under {}", raw_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|value| value.to_str()) else {
            continue;
        };
        if is_expired_log(file_name, today, retention_days) {
            debug!("remove expired log {}", path.display());
            let _ = fs::remove_file(&path);
        }
    }
    Ok(())
}

/// 按文件名中的日期判断是否超出保留窗口；无日期后缀的文件不处理。
fn is_expired_log(file_name: &str, today: NaiveDate, retention_days: i64) -> bool {
    let Some(day) = extract_day_from_log_name(file_name) else {
        return false;
    };
    (today - day).num_days() >= retention_days
}

/// 从日志文件名中提取日期（格式：`<name>.log.YYYY-MM-DD`）。
fn extract_day_from_log_name(file_name: &str) -> Option<NaiveDate> {
    let day = file_name.rsplit('.').next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::PathBuf};

    use chrono::NaiveDate;
    use tracing_subscriber::filter::LevelFilter;

    use super::{LogSettings, extract_day_from_log_name, is_expired_log};

    fn settings_from(pairs: &[(&str, &str)], cwd: &str) -> LogSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        LogSettings::from_lookup(|key| env.get(key).cloned(), Some(PathBuf::from(cwd)))
    }

    #[test]
    fn settings_default_under_working_dir() {
        let settings = settings_from(&[], "/srv/authd");
        assert_eq!(settings.raw_dir, PathBuf::from("/srv/authd/logs/raw"));
        assert_eq!(settings.file_level, LevelFilter::DEBUG);
        assert_eq!(settings.retention_days, 14);
    }

    #[test]
    fn settings_honor_overrides_and_ignore_invalid_values() {
        let settings = settings_from(
            &[
                ("AUTHD_LOG_DIR", "/var/log/authd"),
                ("AUTHD_FILE_LOG_LEVEL", " warn "),
                ("AUTHD_LOG_RETENTION_DAYS", "3"),
            ],
            "/srv/authd",
        );
        assert_eq!(settings.raw_dir, PathBuf::from("/var/log/authd/raw"));
        assert_eq!(settings.file_level, LevelFilter::WARN);
        assert_eq!(settings.retention_days, 3);

        let fallback = settings_from(
            &[
                ("AUTHD_LOG_DIR", "  "),
                ("AUTHD_FILE_LOG_LEVEL", "loud"),
                ("AUTHD_LOG_RETENTION_DAYS", "0"),
            ],
            "/srv/authd",
        );
        assert_eq!(fallback, settings_from(&[], "/srv/authd"));
    }

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn day_is_parsed_from_rolling_suffix() {
        assert_eq!(
            extract_day_from_log_name("authd.log.2026-10-01"),
            Some(day("2026-10-01"))
        );
        assert_eq!(extract_day_from_log_name("authd.log"), None);
        assert_eq!(extract_day_from_log_name("notes.txt"), None);
    }

    #[test]
    fn only_logs_outside_retention_window_expire() {
        let today = day("2026-10-18");
        assert!(is_expired_log("authd.log.2026-10-04", today, 14));
        assert!(!is_expired_log("authd.log.2026-10-05", today, 14));
        assert!(!is_expired_log("authd.log.2026-10-18", today, 14));
        assert!(!is_expired_log("authd.log", today, 14));
    }
}
