// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : signal_bridge — TradingView-style webhook to CoinEx order bridge
Module  : config.rs
Version : 0.1.0
Author  : Kukuh Tripamungkas Wicaksono (Kukuh TW)
Email   : kukuhtw@gmail.com
WhatsApp: https://wa.me/628129893706
LinkedIn: https://id.linkedin.com/in/kukuhtw
License : MIT (see LICENSE)

Summary : Receives alert webhooks, authenticates and validates them, signs
          and submits one spot order per alert to CoinEx, exposes
          Prometheus metrics.

(c) 2025 Kukuh TW. All rights reserved where applicable.
=============================================================================
*/
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::error::ConfigError;
use crate::signer::{HexCase, SignScheme};

pub const DEFAULT_BASE_URL: &str = "https://api.coinex.com";
pub const DEFAULT_ORDER_PATH: &str = "/v2/spot/order";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
/// Upper bound for the order call. Longer waits are refused at startup.
pub const MAX_ORDER_TIMEOUT_MS: u64 = 10_000;

/// Credential string. Debug/Display never print the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(s: impl Into<String>) -> Self {
        Secret(s.into())
    }
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Command line flags. Everything else comes from env / .env.
#[derive(Debug, Parser)]
#[command(name = "signal_bridge", version, about = "Webhook alerts -> signed CoinEx spot orders")]
pub struct Cli {
    /// Address for the webhook server (overrides LISTEN_ADDR)
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Load this env file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

/// Exchange side: endpoint, credentials, signing.
#[derive(Debug, Clone)]
pub struct ExchangeCfg {
    pub base_url: Url,
    pub order_path: String,
    /// `SPOT` by default; `None` leaves the field out of the body.
    pub market_type: Option<String>,
    pub access_id: Secret,
    pub secret_key: Secret,
    pub scheme: SignScheme,
    pub md5_case: HexCase,
    pub timeout: Duration,
}

impl ExchangeCfg {
    /// Full order URL; its path component is what the HMAC scheme signs.
    pub fn order_url(&self) -> Result<Url, ConfigError> {
        self.base_url.join(&self.order_path).map_err(|e| ConfigError::Invalid {
            key: "COINEX_ORDER_PATH",
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub webhook_secret: Secret,
    pub exchange: ExchangeCfg,
}

/// Read .env (if any) then the process environment. Called once at startup.
pub fn load(cli: &Cli) -> Result<Settings, ConfigError> {
    // Pastikan .env dibaca (kalau ada); file yang diminta lewat --env-file wajib ada
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::Invalid {
                key: "--env-file",
                reason: e.to_string(),
            })?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    from_lookup(|k| env::var(k).ok(), cli.listen)
}

/// Builds settings from any key lookup. `load` passes the real environment,
/// tests pass a map.
pub fn from_lookup<F>(get: F, listen_override: Option<SocketAddr>) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| -> Result<Secret, ConfigError> {
        match get(key) {
            Some(v) if !v.is_empty() => Ok(Secret(v)),
            _ => Err(ConfigError::Missing { key }),
        }
    };

    // ===== Credentials =====
    let access_id = required("COINEX_ACCESS_ID")?;
    let secret_key = required("COINEX_SECRET_KEY")?;
    let webhook_secret = required("WEBHOOK_SECRET")?;

    // ===== Endpoint =====
    let base_raw = get("COINEX_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let base_url = Url::parse(&base_raw).map_err(|e| ConfigError::Invalid {
        key: "COINEX_BASE_URL",
        reason: e.to_string(),
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key: "COINEX_BASE_URL",
            reason: format!("unsupported scheme {}", base_url.scheme()),
        });
    }
    let order_path = get("COINEX_ORDER_PATH").unwrap_or_else(|| DEFAULT_ORDER_PATH.to_string());
    if !order_path.starts_with('/') {
        return Err(ConfigError::Invalid {
            key: "COINEX_ORDER_PATH",
            reason: "must start with '/'".into(),
        });
    }
    let market_type = match get("COINEX_MARKET_TYPE") {
        Some(v) if v.trim().is_empty() => None,
        Some(v) => Some(v.trim().to_ascii_uppercase()),
        None => Some("SPOT".to_string()),
    };

    // ===== Signing =====
    let scheme = match get("SIGN_SCHEME").unwrap_or_default().to_ascii_lowercase().as_str() {
        "" | "hmac" => SignScheme::Hmac,
        "md5" | "legacy_md5" => SignScheme::LegacyMd5,
        other => {
            return Err(ConfigError::Invalid {
                key: "SIGN_SCHEME",
                reason: format!("expected hmac or md5, got {other}"),
            })
        }
    };
    let md5_case = match get("MD5_HEX_CASE").unwrap_or_default().to_ascii_lowercase().as_str() {
        "" | "lower" => HexCase::Lower,
        "upper" => HexCase::Upper,
        other => {
            return Err(ConfigError::Invalid {
                key: "MD5_HEX_CASE",
                reason: format!("expected lower or upper, got {other}"),
            })
        }
    };

    let timeout_ms = match get("ORDER_TIMEOUT_MS") {
        None => MAX_ORDER_TIMEOUT_MS,
        Some(v) => match v.parse::<u64>() {
            Ok(ms) if (1..=MAX_ORDER_TIMEOUT_MS).contains(&ms) => ms,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "ORDER_TIMEOUT_MS",
                    reason: format!("expected 1..={MAX_ORDER_TIMEOUT_MS}, got {v}"),
                })
            }
        },
    };

    // ===== Server =====
    let listen = match listen_override {
        Some(addr) => addr,
        None => {
            let raw = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
            raw.parse().map_err(|_| ConfigError::Invalid {
                key: "LISTEN_ADDR",
                reason: format!("not a socket address: {raw}"),
            })?
        }
    };

    let exchange = ExchangeCfg {
        base_url,
        order_path,
        market_type,
        access_id,
        secret_key,
        scheme,
        md5_case,
        timeout: Duration::from_millis(timeout_ms),
    };
    // Validate the join now so a bad path fails startup, not the first order
    exchange.order_url()?;

    Ok(Settings { listen, webhook_secret, exchange })
}
