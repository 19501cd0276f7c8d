//! Runtime configuration.
//!
//! Read once from the environment at start-up (after `.env` is loaded) and
//! handed to the routers as explicit state.

use std::net::SocketAddr;

use crate::error::ConfigError;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_INFERENCE_URL: &str = "http://127.0.0.1:5000/predict";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000/analyze-plant";
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Where the analysis client sends images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Classifier service taking a multipart `image` field.
    Inference { url: String },
    /// The `/analyze-plant` proxy taking `{ "imageBase64": ... }`.
    Proxy { url: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: Backend,
    pub gateway: GatewayConfig,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let addr = get("PLANT_DOCTOR_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidAddr {
                value: addr.clone(),
                source,
            })?;

        let backend = match get("PLANT_DOCTOR_BACKEND").as_deref() {
            None | Some("inference") => Backend::Inference {
                url: get("INFERENCE_URL").unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            },
            Some("proxy") => Backend::Proxy {
                url: get("PROXY_URL").unwrap_or_else(|| DEFAULT_PROXY_URL.to_string()),
            },
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let max_upload_bytes = match get("PLANT_DOCTOR_MAX_UPLOAD_BYTES") {
            None => DEFAULT_MAX_UPLOAD_BYTES,
            Some(v) => v.parse::<usize>().map_err(|_| ConfigError::InvalidNumber {
                name: "PLANT_DOCTOR_MAX_UPLOAD_BYTES",
                value: v,
            })?,
        };

        Ok(Config {
            bind_addr,
            backend,
            gateway: GatewayConfig {
                url: get("AI_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string()),
                model: get("AI_GATEWAY_MODEL")
                    .unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string()),
                api_key: get("AI_GATEWAY_API_KEY"),
            },
            max_upload_bytes,
        })
    }
}
