//! Service configuration from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::assembler::SignaturePlacement;
use crate::signature::pad::{DEFAULT_PAD_HEIGHT, DEFAULT_PAD_WIDTH};
use crate::signature::EMPTY_SIGNATURE_THRESHOLD;
use crate::submission::RedirectSettings;
use crate::viewer::DEFAULT_SCALE;

pub const DEFAULT_AGREEMENT_PDF_PATH: &str = "./assets/Buyer Agreement to Show Property.pdf";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_address: String,
    pub port: u16,
    pub agreement_pdf_path: PathBuf,
    pub relay_endpoint: String,
    pub render_scale: f32,
    pub pdfium_library_path: Option<PathBuf>,
    pub signature_placement: SignaturePlacement,
    pub signature_pad_width: u32,
    pub signature_pad_height: u32,
    pub empty_signature_threshold: usize,
    pub redirect: RedirectSettings,
    pub session_ttl_secs: u64,
    pub static_dir: Option<PathBuf>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = SignaturePlacement::default();
        let redirect = RedirectSettings::default();

        let relay_endpoint = get("RELAY_ENDPOINT").ok_or(ConfigError::Missing("RELAY_ENDPOINT"))?;
        if !relay_endpoint.starts_with("http://") && !relay_endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "RELAY_ENDPOINT",
                value: relay_endpoint,
                reason: "must be an http(s) URL".to_string(),
            });
        }

        let config = Self {
            bind_address: get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&get, "PORT", 8080)?,
            agreement_pdf_path: get("AGREEMENT_PDF_PATH")
                .unwrap_or_else(|| DEFAULT_AGREEMENT_PDF_PATH.to_string())
                .into(),
            relay_endpoint,
            render_scale: parse(&get, "RENDER_SCALE", DEFAULT_SCALE)?,
            pdfium_library_path: get("PDFIUM_LIBRARY_PATH").map(PathBuf::from),
            signature_placement: SignaturePlacement {
                x: fraction(&get, "SIGNATURE_X_FRACTION", defaults.x)?,
                y: fraction(&get, "SIGNATURE_Y_FRACTION", defaults.y)?,
                width: fraction(&get, "SIGNATURE_WIDTH_FRACTION", defaults.width)?,
                height: fraction(&get, "SIGNATURE_HEIGHT_FRACTION", defaults.height)?,
            },
            signature_pad_width: parse(&get, "SIGNATURE_PAD_WIDTH", DEFAULT_PAD_WIDTH)?,
            signature_pad_height: parse(&get, "SIGNATURE_PAD_HEIGHT", DEFAULT_PAD_HEIGHT)?,
            empty_signature_threshold: parse(
                &get,
                "EMPTY_SIGNATURE_THRESHOLD",
                EMPTY_SIGNATURE_THRESHOLD,
            )?,
            redirect: RedirectSettings {
                target: get("REDIRECT_TARGET").unwrap_or(redirect.target),
                seconds: parse(&get, "REDIRECT_SECONDS", redirect.seconds)?,
            },
            session_ttl_secs: parse(&get, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        if config.render_scale <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "RENDER_SCALE",
                value: config.render_scale.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn fraction<G>(get: &G, key: &'static str, default: f32) -> Result<f32, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse(get, key, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be between 0 and 1".to_string(),
        });
    }
    Ok(value)
}
