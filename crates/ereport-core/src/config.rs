use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_SECS: u64 = 120; // overdue schedules are polled every 2 minutes
pub const DEFAULT_DATA_DIR: &str = "../data";
pub const DEFAULT_CONFIG_FILE: &str = "ereport.toml";
pub const TEMPLATE_FILE_STEM: &str = "template";

/// Top-level config (ereport.toml + EREPORT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReporterConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub grafana: GrafanaConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between two polls for overdue schedules.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Directory holding the template workbook and rendered reports.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Explicit template location. Defaults to `<data_dir>/template.xlsx`.
    pub template_path: Option<String>,
    /// Delete the rendered workbook once it has been emailed.
    #[serde(default = "bool_true")]
    pub cleanup_after_send: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: DEFAULT_TICK_SECS,
            data_dir: default_data_dir(),
            template_path: None,
            cleanup_after_send: true,
        }
    }
}

impl SchedulerConfig {
    pub fn template_path(&self) -> PathBuf {
        match &self.template_path {
            Some(path) => PathBuf::from(path),
            None => report_path(&self.data_dir, TEMPLATE_FILE_STEM),
        }
    }

    /// Location a rendered report with the given file stem is written to.
    pub fn report_path(&self, file_stem: &str) -> PathBuf {
        report_path(&self.data_dir, file_stem)
    }
}

/// Grafana instance the panel queries are executed against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrafanaConfig {
    #[serde(default = "default_grafana_url")]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_datasource_id")]
    pub datasource_id: i64,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            url: default_grafana_url(),
            username: String::new(),
            password: String::new(),
            datasource_id: default_datasource_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Sender address, also used as the SMTP username.
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "bool_true")]
    pub tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            sender: String::new(),
            password: String::new(),
            tls: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}
fn default_data_dir() -> String {
    DEFAULT_DATA_DIR.to_string()
}
fn default_db_path() -> String {
    format!("{}/ereport.db", DEFAULT_DATA_DIR)
}
fn default_grafana_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_datasource_id() -> i64 {
    1
}
fn default_smtp_host() -> String {
    "localhost".to_string()
}
fn default_smtp_port() -> u16 {
    587
}

fn report_path(data_dir: &str, file_stem: &str) -> PathBuf {
    PathBuf::from(data_dir).join(format!("{file_stem}.xlsx"))
}

impl ReporterConfig {
    /// Load config from a TOML file with EREPORT_* env var overrides.
    ///
    /// Nested keys use a double underscore: `EREPORT_SMTP__HOST`,
    /// `EREPORT_SCHEDULER__DATA_DIR`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);

        let config: ReporterConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("EREPORT_").split("__"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}
