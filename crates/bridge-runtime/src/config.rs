//! Runtime configuration, overridden from `MB_*` environment variables.

use anyhow::{anyhow, Context, Result};
use mb_01_lifecycle::LifecycleConfig;
use mb_02_api_gateway::GatewayConfig;
use std::path::PathBuf;
use std::str::FromStr;

/// Identity file name inside the data directory.
pub const IDENTITY_FILE: &str = "identity";

/// Complete bridge configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Holds the identity file and persisted state.
    pub data_dir: PathBuf,
    /// Forget the persisted announce deadline on startup.
    pub announce_immediately: bool,
    pub lifecycle: LifecycleConfig,
    pub gateway: GatewayConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./config"),
            announce_immediately: false,
            lifecycle: LifecycleConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn identity_path(&self) -> PathBuf {
        self.data_dir.join(IDENTITY_FILE)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.lifecycle
            .validate()
            .map_err(|e| anyhow!("lifecycle config: {}", e))?;
        self.gateway.validate().context("gateway config")?;
        Ok(())
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<RuntimeConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
///
/// Unset variables keep their defaults; set but unparseable ones are errors.
pub fn load_config_from<F>(lookup: F) -> Result<RuntimeConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = RuntimeConfig::default();

    if let Some(dir) = lookup("MB_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Some(host) = parse_var(&lookup, "MB_HTTP_HOST")? {
        config.gateway.http.host = host;
    }
    if let Some(port) = parse_var(&lookup, "MB_HTTP_PORT")? {
        config.gateway.http.port = port;
    }
    if let Some(value) = lookup("MB_ANNOUNCE_IMMEDIATELY") {
        config.announce_immediately = parse_flag("MB_ANNOUNCE_IMMEDIATELY", &value)?;
    }

    let lifecycle = &mut config.lifecycle;
    if let Some(name) = lookup("MB_DISPLAY_NAME") {
        lifecycle.display_name = name;
    }
    if let Some(method) = parse_var(&lookup, "MB_DELIVERY_METHOD")? {
        lifecycle.delivery_method = method;
    }
    if let Some(value) = lookup("MB_PROPAGATION_FALLBACK") {
        lifecycle.propagation_fallback = parse_flag("MB_PROPAGATION_FALLBACK", &value)?;
    }
    if let Some(secs) = parse_var(&lookup, "MB_ANNOUNCE_INTERVAL_SECS")? {
        lifecycle.announce_interval_secs = secs;
    }
    if let Some(secs) = parse_var(&lookup, "MB_DISPATCH_INTERVAL_SECS")? {
        lifecycle.dispatch_interval_secs = secs;
    }
    if let Some(capacity) = parse_var(&lookup, "MB_QUEUE_CAPACITY")? {
        lifecycle.queue_capacity = capacity;
    }
    if let Some(capacity) = parse_var(&lookup, "MB_DEDUP_CAPACITY")? {
        lifecycle.dedup_capacity = capacity;
    }
    if let Some(buffer) = parse_var(&lookup, "MB_SUBSCRIBER_BUFFER")? {
        lifecycle.subscriber_buffer = buffer;
    }
    if let Some(secs) = parse_var(&lookup, "MB_ENQUEUE_TIMEOUT_SECS")? {
        lifecycle.enqueue_timeout_secs = Some(secs);
    }

    config.validate()?;
    Ok(config)
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{}={:?}: {}", key, raw, e)),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(anyhow!("{}={:?}: expected a boolean", key, other)),
    }
}
