use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::LogConfig;
use crate::errors::ApiError;
use crate::utils::devlog::DEV_TARGET;

pub const AUDIT_TARGET: &str = "devcamper::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

fn log_err(e: impl std::fmt::Display) -> ApiError {
    ApiError::Config(format!("logging: {e}"))
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, ApiError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)
        .map_err(log_err)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(log_err)
}

/// Builds the log4rs config: `app.log` for the root logger, `audit.log` for store
/// mutations, and `dev.log` for trace events when `dev_trace` is set.
///
/// # Errors
/// `ApiError::Config` for an unknown level or appenders that cannot be created.
pub fn build_config(
    dir: &Path,
    level: &str,
    retention: u32,
    dev_trace: bool,
) -> Result<Config, ApiError> {
    let lvl = LevelFilter::from_str(level).map_err(|_| log_err(format!("unknown level '{level}'")))?;
    let keep = retention.max(1);
    std::fs::create_dir_all(dir)?;
    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(dir, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, LevelFilter::Info));
    builder = if dev_trace {
        builder
            .appender(Appender::builder().build("dev", Box::new(rolling(dir, "dev", keep)?)))
            .logger(Logger::builder().appender("dev").additive(false).build(DEV_TARGET, LevelFilter::Trace))
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV_TARGET, LevelFilter::Off))
    };
    builder.build(Root::builder().appender("app").build(lvl)).map_err(log_err)
}

/// Installs the process-wide logger. A second call is ignored with a warning.
///
/// # Errors
/// As [`build_config`].
pub fn configure_logging(dir: Option<&Path>, level: &str, retention: u32, dev_trace: bool) -> Result<(), ApiError> {
    let base = dir.map_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")), Path::to_path_buf);
    let config = build_config(&base, level, retention, dev_trace)?;
    if let Err(e) = log4rs::init_config(config) {
        log::warn!("logger already initialised: {e}");
    }
    Ok(())
}

/// # Errors
/// As [`build_config`].
pub fn init_from_config(cfg: &LogConfig) -> Result<(), ApiError> {
    configure_logging(cfg.dir.as_deref(), &cfg.level, cfg.retention, cfg.dev_trace)
}

/// Reads `DEVCAMPER_LOG_DIR`, `DEVCAMPER_LOG_LEVEL`, `DEVCAMPER_LOG_RETENTION` and
/// `DEVCAMPER_DEV_TRACE`; unset or unparsable values fall back to defaults.
///
/// # Errors
/// As [`build_config`].
pub fn configure_from_env() -> Result<(), ApiError> {
    let mut cfg = LogConfig::default();
    if let Ok(d) = std::env::var("DEVCAMPER_LOG_DIR") {
        cfg.dir = Some(PathBuf::from(d));
    }
    if let Ok(l) = std::env::var("DEVCAMPER_LOG_LEVEL") {
        cfg.level = l;
    }
    if let Some(r) = std::env::var("DEVCAMPER_LOG_RETENTION").ok().and_then(|s| s.parse().ok()) {
        cfg.retention = r;
    }
    cfg.dev_trace = std::env::var("DEVCAMPER_DEV_TRACE")
        .is_ok_and(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
    init_from_config(&cfg)
}
