// ===============================
// src/main.rs
// ===============================
/*
 cd /home/kukuhtw/rust/signal_bridge

 # kirim alert percobaan
curl -s -XPOST localhost:8000/webhook -d '{"secret":"...","action":"buy","symbol":"BTCUSDT","amount":"0.001"}'

# cek metrik
curl -s localhost:8000/metrics | grep '^webhook_requests_total'

*/
/*
=============================================================================
Project : signal_bridge — TradingView-style webhook to CoinEx order bridge
Module  : main.rs
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
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use signal_bridge::config::{self, Cli};
use signal_bridge::exchange::ExchangeClient;
use signal_bridge::metrics;
use signal_bridge::server::{self, AppState};
use signal_bridge::webhook::WebhookGate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---- Logging ----
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ---- Load config (fatal if credentials are missing) ----
    let cli = Cli::parse();
    let settings = config::load(&cli).context("loading configuration")?;

    // ---- Metrics ----
    metrics::init();
    metrics::CONFIG_SIGN_SCHEME
        .with_label_values(&[settings.exchange.scheme.as_str()])
        .set(1);

    let client = ExchangeClient::new(settings.exchange.clone()).context("building exchange client")?;

    info!(
        listen = %settings.listen,
        order_url = %client.order_url(),
        scheme = settings.exchange.scheme.as_str(),
        market_type = ?settings.exchange.market_type,
        timeout_ms = settings.exchange.timeout.as_millis() as u64,
        "startup config"
    );

    let state = Arc::new(AppState {
        gate: WebhookGate::new(settings.webhook_secret.clone()),
        client,
    });

    // ---- Serve until Ctrl-C ----
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "ctrl_c handler failed");
        }
        info!("shutdown requested");
    };
    server::serve(settings.listen, state, shutdown, |_| {})
        .await
        .context("webhook server")?;
    Ok(())
}
