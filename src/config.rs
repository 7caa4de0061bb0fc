//! Configuration management.

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;

fn default_product_name() -> String {
    "wap-appl-gateway".to_string()
}

fn default_product_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_smart_errors() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_reply_queue_capacity() -> usize {
    1024
}

/// Configuration as merged by figment, mirroring the on-disk/env shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_product_name")]
    product_name: String,
    #[serde(default = "default_product_version")]
    product_version: String,
    #[serde(default = "default_smart_errors")]
    wsp_smart_errors: bool,
    #[serde(default)]
    device_home: Option<String>,
    #[serde(default = "default_queue_capacity")]
    event_queue_capacity: usize,
    #[serde(default = "default_reply_queue_capacity")]
    reply_queue_capacity: usize,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default)]
    log_level: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            product_version: default_product_version(),
            wsp_smart_errors: default_smart_errors(),
            device_home: None,
            event_queue_capacity: default_queue_capacity(),
            reply_queue_capacity: default_reply_queue_capacity(),
            log_file: None,
            log_level: None,
        }
    }
}

/// Gateway configuration: product identity, WSP smart-errors behavior, and
/// the bounds of the internal event/reply queues.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Name reported in the `X-WAP-Gateway` header and `Via` lines.
    pub product_name: String,
    /// Version reported alongside `product_name`.
    pub product_version: String,
    /// When true, failed fetches produce a WML error deck instead of
    /// propagating the raw HTTP status to the client.
    pub wsp_smart_errors: bool,
    /// Optional device-home URL substituted for the well-known
    /// `device:home` pseudo-URL.
    pub device_home: Option<String>,
    /// Bound on the inbound event queue (C6).
    pub event_queue_capacity: usize,
    /// Bound on the reply queue drained by the reply pump (C7).
    pub reply_queue_capacity: usize,
    /// Path to a log file (in addition to stdout), if set.
    pub log_file: Option<std::path::PathBuf>,
    /// Log level override; falls back to `RUST_LOG`, then `"info"`.
    pub log_level: Option<String>,
}

impl GatewayConfig {
    /// Load configuration with priority: explicit overrides > env vars > defaults.
    ///
    /// Environment variables use the `WAPGW_` prefix, e.g. `WAPGW_WSP_SMART_ERRORS=false`.
    pub fn from_figment(
        product_name: Option<String>,
        product_version: Option<String>,
        wsp_smart_errors: Option<bool>,
        device_home: Option<String>,
        log_file: Option<std::path::PathBuf>,
        log_level: Option<String>,
    ) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        figment = figment.merge(
            Env::prefixed("WAPGW_")
                .map(|key| key.as_str().replace("__", ".").into())
                .split("_"),
        );

        if let Some(name) = product_name {
            figment = figment.merge(Serialized::default("product_name", name));
        }
        if let Some(version) = product_version {
            figment = figment.merge(Serialized::default("product_version", version));
        }
        if let Some(smart) = wsp_smart_errors {
            figment = figment.merge(Serialized::default("wsp_smart_errors", smart));
        }
        if let Some(home) = device_home {
            figment = figment.merge(Serialized::default("device_home", home));
        }
        if let Some(ref file) = log_file {
            figment = figment.merge(Serialized::default(
                "log_file",
                file.to_string_lossy().to_string(),
            ));
        }
        if let Some(level) = log_level {
            figment = figment.merge(Serialized::default("log_level", level));
        }

        let config_file: ConfigFile = figment.extract()?;

        Ok(Self {
            product_name: config_file.product_name,
            product_version: config_file.product_version,
            wsp_smart_errors: config_file.wsp_smart_errors,
            device_home: config_file.device_home,
            event_queue_capacity: config_file.event_queue_capacity,
            reply_queue_capacity: config_file.reply_queue_capacity,
            log_file: config_file.log_file.map(std::path::PathBuf::from),
            log_level: config_file.log_level,
        })
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_figment(None, None, None, None, None, None)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let defaults = ConfigFile::default();
        Self {
            product_name: defaults.product_name,
            product_version: defaults.product_version,
            wsp_smart_errors: defaults.wsp_smart_errors,
            device_home: defaults.device_home,
            event_queue_capacity: defaults.event_queue_capacity,
            reply_queue_capacity: defaults.reply_queue_capacity,
            log_file: None,
            log_level: None,
        }
    }
}
