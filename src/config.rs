//! Layered application configuration.
//!
//! Precedence: CLI > `DEVCAMPER_*` env > config files > defaults. Files are searched
//! in order `--config`, `$DEVCAMPER_CONFIG`, `~/.config/devcamper.toml`,
//! `./devcamper.toml`; an earlier file wins field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::aggregate::{AggregateDependency, DependencyTable, Dispatch, standard_dependencies};
use crate::errors::ApiError;
use crate::query::{DEFAULT_PAGE_SIZE, EngineOptions, MAX_PAGE_SIZE, QueryLimits};
use crate::resources::ServiceOptions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub store_timeout_ms: Option<u64>,
    pub concurrent_reads: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            store_timeout_ms: None,
            concurrent_reads: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatesConfig {
    pub dispatch: Dispatch,
    #[serde(rename = "dependency")]
    pub dependencies: Vec<AggregateDependency>,
}

impl Default for AggregatesConfig {
    fn default() -> Self {
        Self { dispatch: Dispatch::Inline, dependencies: standard_dependencies() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
    pub retention: u32,
    pub dev_trace: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { dir: None, level: "info".into(), retention: 7, dev_trace: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub query: QueryConfig,
    pub aggregates: AggregatesConfig,
    pub log: LogConfig,
}

fn invalid(what: &str, raw: &str) -> ApiError {
    ApiError::Config(format!("invalid value '{raw}' for {what}"))
}

fn parse_env<T: FromStr>(name: &str, raw: &str) -> Result<T, ApiError> {
    raw.trim().parse().map_err(|_| invalid(name, raw))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, raw)),
    }
}

/// Fills keys missing from `high` with values from `low`, descending into tables.
fn merge_under(high: &mut toml::Table, low: toml::Table) {
    for (key, value) in low {
        if let Some(existing) = high.get_mut(&key) {
            if let (toml::Value::Table(h), toml::Value::Table(l)) = (existing, value) {
                merge_under(h, l);
            }
        } else {
            high.insert(key, value);
        }
    }
}

impl AppConfig {
    /// # Errors
    /// TOML syntax errors, unknown enum values, or failed validation.
    pub fn from_toml_str(s: &str) -> Result<Self, ApiError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Candidate config files, highest precedence first.
    #[must_use]
    pub fn search_paths(cli: Option<&Path>, lookup: &dyn Fn(&str) -> Option<String>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(p) = cli {
            paths.push(p.to_path_buf());
        }
        if let Some(p) = lookup("DEVCAMPER_CONFIG") {
            paths.push(PathBuf::from(p));
        }
        if let Some(home) = lookup("HOME").or_else(|| lookup("USERPROFILE")) {
            paths.push(PathBuf::from(home).join(".config").join("devcamper.toml"));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("devcamper.toml"));
        }
        paths
    }

    /// Loads from the process environment and the standard file locations.
    ///
    /// # Errors
    /// A `--config` file that is missing or unreadable, bad TOML, bad env values,
    /// or failed validation.
    pub fn load(cli: Option<&Path>) -> Result<Self, ApiError> {
        Self::load_with(cli, &|k| std::env::var(k).ok())
    }

    /// [`AppConfig::load`] with an injectable environment.
    ///
    /// # Errors
    /// As [`AppConfig::load`].
    pub fn load_with(cli: Option<&Path>, lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        if let Some(p) = cli
            && !p.exists()
        {
            return Err(ApiError::Config(format!("config file {} not found", p.display())));
        }
        let mut merged = toml::Table::new();
        for path in Self::search_paths(cli, lookup) {
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let table: toml::Table = toml::from_str(&text)
                .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?;
            log::debug!("config layer {}", path.display());
            merge_under(&mut merged, table);
        }
        let mut cfg: Self = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ApiError::Config(e.to_string()))?;
        cfg.apply_env(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overrides fields from `DEVCAMPER_*` variables.
    ///
    /// # Errors
    /// `ApiError::Config` for values that do not parse.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ApiError> {
        if let Some(v) = lookup("DEVCAMPER_DEFAULT_PAGE_SIZE") {
            self.query.default_page_size = parse_env("DEVCAMPER_DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("DEVCAMPER_MAX_PAGE_SIZE") {
            self.query.max_page_size = parse_env("DEVCAMPER_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("DEVCAMPER_STORE_TIMEOUT_MS") {
            self.query.store_timeout_ms = Some(parse_env("DEVCAMPER_STORE_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("DEVCAMPER_CONCURRENT_READS") {
            self.query.concurrent_reads = parse_flag("DEVCAMPER_CONCURRENT_READS", &v)?;
        }
        if let Some(v) = lookup("DEVCAMPER_AGGREGATE_DISPATCH") {
            self.aggregates.dispatch = match v.trim().to_ascii_lowercase().as_str() {
                "inline" => Dispatch::Inline,
                "detached" => Dispatch::Detached,
                _ => return Err(invalid("DEVCAMPER_AGGREGATE_DISPATCH", &v)),
            };
        }
        if let Some(v) = lookup("DEVCAMPER_LOG_DIR") {
            self.log.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DEVCAMPER_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = lookup("DEVCAMPER_LOG_RETENTION") {
            self.log.retention = parse_env("DEVCAMPER_LOG_RETENTION", &v)?;
        }
        if let Some(v) = lookup("DEVCAMPER_DEV_TRACE") {
            self.log.dev_trace = parse_flag("DEVCAMPER_DEV_TRACE", &v)?;
        }
        Ok(())
    }

    /// # Errors
    /// `ApiError::Config` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.query.default_page_size == 0 {
            return Err(ApiError::Config("query.default_page_size must be positive".into()));
        }
        if self.query.max_page_size == 0 {
            return Err(ApiError::Config("query.max_page_size must be positive".into()));
        }
        if self.query.store_timeout_ms == Some(0) {
            return Err(ApiError::Config("query.store_timeout_ms must be positive".into()));
        }
        if log::LevelFilter::from_str(&self.log.level).is_err() {
            return Err(invalid("log.level", &self.log.level));
        }
        if self.log.retention == 0 {
            return Err(ApiError::Config("log.retention must be at least 1".into()));
        }
        DependencyTable::new(self.aggregates.dependencies.clone()).map(|_| ())
    }

    #[must_use]
    pub const fn limits(&self) -> QueryLimits {
        QueryLimits {
            default_page_size: self.query.default_page_size,
            max_page_size: self.query.max_page_size,
        }
    }

    #[must_use]
    pub const fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            limits: self.limits(),
            engine: EngineOptions {
                concurrent_reads: self.query.concurrent_reads,
                store_timeout_ms: self.query.store_timeout_ms,
            },
            dispatch: self.aggregates.dispatch,
        }
    }

    /// # Errors
    /// `ApiError::Config` for an invalid dependency list.
    pub fn dependency_table(&self) -> Result<DependencyTable, ApiError> {
        DependencyTable::new(self.aggregates.dependencies.clone())
    }
}
