//! Layered service configuration: defaults, optional file, then `FORECAST__*` env vars.

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    /// Serialized key -> model artifact, read once at startup.
    pub artifact_path: PathBuf,
    /// Optional hex SHA-256 pin for the artifact.
    pub artifact_sha256: Option<String>,
    pub default_sku: String,
    pub default_horizon: u32,
    pub max_horizon: u32,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "forecast-gateway".into(),
            host: "0.0.0.0".into(),
            port: 5000,
            artifact_path: PathBuf::from("models/models.json"),
            artifact_sha256: None,
            default_sku: "DAN-0003".into(),
            default_horizon: 7,
            max_horizon: 3650,
            log_level: "info".into(),
        }
    }
}

impl ServiceConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Build the config for `service`.
///
/// Sources, later wins: built-in defaults, the file named by `FORECAST_CONFIG_FILE`
/// (format from its extension, optional), then `FORECAST__<FIELD>` variables.
pub fn load_config(service: &str) -> Result<ServiceConfig> {
    let file = std::env::var("FORECAST_CONFIG_FILE").ok();
    build(service, file.as_deref(), Some(config::Environment::with_prefix("FORECAST").separator("__")))
}

fn build(service: &str, file: Option<&str>, env: Option<config::Environment>) -> Result<ServiceConfig> {
    let d = ServiceConfig::default();
    let mut builder = config::Config::builder()
        .set_default("service_name", service)?
        .set_default("host", d.host)?
        .set_default("port", d.port as i64)?
        .set_default("artifact_path", d.artifact_path.to_string_lossy().into_owned())?
        .set_default("default_sku", d.default_sku)?
        .set_default("default_horizon", d.default_horizon as i64)?
        .set_default("max_horizon", d.max_horizon as i64)?
        .set_default("log_level", d.log_level)?;
    if let Some(f) = file { builder = builder.add_source(config::File::with_name(f).required(false)); }
    if let Some(e) = env { builder = builder.add_source(e); }
    let cfg: ServiceConfig = builder.build()?.try_deserialize()?;
    if cfg.default_horizon == 0 || cfg.max_horizon == 0 { anyhow::bail!("horizon settings must be positive"); }
    Ok(cfg)
}
