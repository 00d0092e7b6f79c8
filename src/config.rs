use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    PushPull,
    OpenDrain,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub chip: String,
    pub line: u32,
    pub topology: Topology,
    pub polarity: Polarity,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = env_string("HOST", "0.0.0.0");
        let port = env_parse("PORT", 5000)?;
        let chip = env_string("GPIO_CHIP", "/dev/gpiochip0");
        let line = env_parse("GPIO_PIN", 21)?;
        let active_low = env_bool("ACTIVE_LOW", true)?;
        let open_drain = env_bool("OPEN_DRAIN", true)?;

        Ok(Self {
            http: HttpConfig { host, port },
            relay: RelayConfig {
                chip,
                line,
                topology: if open_drain {
                    Topology::OpenDrain
                } else {
                    Topology::PushPull
                },
                polarity: if active_low {
                    Polarity::ActiveLow
                } else {
                    Polarity::ActiveHigh
                },
            },
        })
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_number(name, raw.trim()),
        _ => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> Result<bool, AppError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_flag(name, raw.trim()),
        _ => Ok(default),
    }
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Config(format!("Invalid value for {name}: {raw}")))
}

// a typoed flag must fail startup, not silently flip relay behavior
fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Ok(false)
    } else {
        Err(AppError::Config(format!(
            "Invalid value for {name}: expected true or false, got {raw}"
        )))
    }
}
