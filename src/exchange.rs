// ===============================
// src/exchange.rs (CoinEx REST order client)
// ===============================
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::config::ExchangeCfg;
use crate::domain::{OrderIntent, OrderResult};
use crate::error::{ConfigError, OrderError};
use crate::metrics::{LAT_EXCHANGE, ORDERS_SUBMITTED, ORDER_RESULTS};
use crate::signer::{canonical_query, sign_hmac, sign_md5, timestamp_ms, SignScheme};

pub const HDR_KEY: &str = "x-coinex-key";
pub const HDR_SIGN: &str = "x-coinex-sign";
pub const HDR_TIMESTAMP: &str = "x-coinex-timestamp";
pub const HDR_AUTHORIZATION: &str = "authorization";

/// Body for the HMAC scheme. Field order is fixed by the struct, so the
/// serialized string is the same every time for the same intent.
#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    market: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    market_type: Option<&'a str>,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    amount: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<&'a str>,
}

/// One fully signed order call. Body and timestamp are exactly what was signed.
pub struct SignedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: String,
    pub timestamp: u64,
    pub content_type: &'static str,
    /// Auth headers; one of them carries the signature.
    pub headers: Vec<(&'static str, String)>,
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| *k).collect();
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .field("timestamp", &self.timestamp)
            .field("headers", &names)
            .finish()
    }
}

/// Stateless apart from the read-only config and the pooled HTTP client;
/// share it behind an `Arc` across request tasks.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    http: reqwest::Client,
    cfg: ExchangeCfg,
    order_url: Url,
}

impl ExchangeClient {
    pub fn new(cfg: ExchangeCfg) -> Result<Self, ConfigError> {
        let order_url = cfg.order_url()?;
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ConfigError::Invalid { key: "http_client", reason: e.to_string() })?;
        Ok(Self { http, cfg, order_url })
    }

    pub fn scheme(&self) -> SignScheme {
        self.cfg.scheme
    }

    pub fn order_url(&self) -> &Url {
        &self.order_url
    }

    /// Pure: same intent + timestamp always gives the same request.
    pub fn build_request(&self, intent: &OrderIntent, timestamp: u64) -> Result<SignedRequest, OrderError> {
        let market = intent.symbol.to_ascii_uppercase();
        let path = self.order_url.path().to_string();

        match self.cfg.scheme {
            SignScheme::Hmac => {
                let body = OrderBody {
                    market,
                    market_type: self.cfg.market_type.as_deref(),
                    side: intent.action.as_str(),
                    order_type: intent.order_type.as_str(),
                    amount: intent.amount.as_str(),
                    price: intent.price.as_ref().map(|p| p.as_str()),
                };
                let body = serde_json::to_string(&body)?;
                let sig = sign_hmac(self.cfg.secret_key.expose(), "POST", &path, &body, timestamp);
                Ok(SignedRequest {
                    method: "POST",
                    path,
                    body,
                    timestamp,
                    content_type: "application/json",
                    headers: vec![
                        (HDR_KEY, self.cfg.access_id.expose().to_string()),
                        (HDR_SIGN, sig),
                        (HDR_TIMESTAMP, timestamp.to_string()),
                    ],
                })
            }
            SignScheme::LegacyMd5 => {
                let mut params: BTreeMap<&str, String> = BTreeMap::new();
                params.insert("access_id", self.cfg.access_id.expose().to_string());
                params.insert("amount", intent.amount.to_string());
                params.insert("market", market);
                params.insert("side", intent.action.as_str().to_string());
                params.insert("tonce", timestamp.to_string());
                params.insert("type", intent.order_type.as_str().to_string());
                if let Some(p) = &intent.price {
                    params.insert("price", p.to_string());
                }
                let sig = sign_md5(&params, self.cfg.secret_key.expose(), self.cfg.md5_case);
                Ok(SignedRequest {
                    method: "POST",
                    path,
                    body: canonical_query(&params),
                    timestamp,
                    content_type: "application/x-www-form-urlencoded",
                    headers: vec![(HDR_AUTHORIZATION, sig)],
                })
            }
        }
    }

    /// Sign and send one order. Never retried: the endpoint takes no
    /// idempotency key, a resend after a timeout may fill twice.
    pub async fn place_order(&self, intent: &OrderIntent) -> Result<OrderResult, OrderError> {
        // timestamp diambil sekali: dipakai untuk sign dan header
        let ts = timestamp_ms();
        let req = match self.build_request(intent, ts) {
            Ok(r) => r,
            Err(e) => {
                ORDER_RESULTS.with_label_values(&[e.label()]).inc();
                warn!(error = %e, symbol = %intent.symbol, "order not sent");
                return Err(e);
            }
        };

        info!(
            symbol = %intent.symbol,
            side = intent.action.as_str(),
            amount = %intent.amount,
            order_type = intent.order_type.as_str(),
            scheme = self.cfg.scheme.as_str(),
            "submitting order"
        );

        ORDERS_SUBMITTED.inc();
        let started = Instant::now();
        let out = self.send(req).await;
        LAT_EXCHANGE.observe(started.elapsed().as_secs_f64() * 1000.0);

        match out {
            Ok(data) => {
                ORDER_RESULTS.with_label_values(&["ok"]).inc();
                let res = OrderResult::new(data, intent.clone());
                info!(order_id = ?res.order_id, symbol = %intent.symbol, "order accepted");
                Ok(res)
            }
            Err(e) => {
                ORDER_RESULTS.with_label_values(&[e.label()]).inc();
                warn!(error = %e, symbol = %intent.symbol, "order failed, not retried (no idempotency key)");
                Err(e)
            }
        }
    }

    async fn send(&self, req: SignedRequest) -> Result<Value, OrderError> {
        let mut rb = self
            .http
            .post(self.order_url.clone())
            .header(CONTENT_TYPE, req.content_type)
            .body(req.body);
        for (name, value) in &req.headers {
            rb = rb.header(*name, value);
        }

        let rsp = rb.send().await?;
        let status = rsp.status();
        let bytes = rsp.bytes().await?;
        interpret(status, &bytes)
    }
}

/// Map the raw exchange reply to the `data` payload or a classified error.
/// Once the body is a JSON envelope its `code` decides, whatever the HTTP status.
pub fn interpret(status: StatusCode, body: &[u8]) -> Result<Value, OrderError> {
    let v: Value = serde_json::from_slice(body).map_err(|_| {
        let text = String::from_utf8_lossy(body);
        let snippet: String = text.chars().take(200).collect();
        OrderError::Transport(format!("invalid JSON from exchange (HTTP {}): {}", status.as_u16(), snippet))
    })?;

    let code = match v.get("code").and_then(Value::as_i64) {
        Some(c) => c,
        None => return Err(OrderError::UnexpectedResponseShape(format!("no integer code in {v}"))),
    };

    if code != 0 {
        let message = match v.get("message").and_then(Value::as_str) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => v.to_string(),
        };
        return Err(OrderError::ExchangeRejected { code, message });
    }

    match v.get("data") {
        Some(d) if !d.is_null() => Ok(d.clone()),
        _ => Err(OrderError::UnexpectedResponseShape("success without data".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;
    use crate::domain::{Action, Amount, OrderType};
    use crate::signer::HexCase;
    use serde_json::json;
    use std::time::Duration;

    const TS: u64 = 1_700_000_000_000;

    fn cfg(scheme: SignScheme) -> ExchangeCfg {
        ExchangeCfg {
            base_url: Url::parse("https://api.coinex.com").unwrap(),
            order_path: "/v2/spot/order".into(),
            market_type: Some("SPOT".into()),
            access_id: Secret::new("AK123"),
            secret_key: Secret::new("test-secret-key"),
            scheme,
            md5_case: HexCase::Lower,
            timeout: Duration::from_secs(10),
        }
    }

    fn intent() -> OrderIntent {
        OrderIntent {
            action: Action::Buy,
            symbol: "btcusdt".into(),
            amount: Amount::from_json(&json!("0.001")).unwrap(),
            order_type: OrderType::Market,
            price: None,
        }
    }

    fn header<'a>(r: &'a SignedRequest, name: &str) -> Option<&'a str> {
        r.headers.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn hmac_request_matches_known_vector() {
        let c = ExchangeClient::new(cfg(SignScheme::Hmac)).unwrap();
        let r = c.build_request(&intent(), TS).unwrap();
        assert_eq!(r.path, "/v2/spot/order");
        assert_eq!(
            r.body,
            r#"{"market":"BTCUSDT","market_type":"SPOT","side":"buy","type":"market","amount":"0.001"}"#
        );
        assert_eq!(header(&r, HDR_KEY), Some("AK123"));
        assert_eq!(header(&r, HDR_TIMESTAMP), Some("1700000000000"));
        assert_eq!(
            header(&r, HDR_SIGN),
            Some("50c6134f8e17745aa1105b29eb166d6352f7cdd7e2427c4c1ef88eefeadca97b")
        );
    }

    #[test]
    fn signed_body_is_sent_body() {
        let c = ExchangeClient::new(cfg(SignScheme::Hmac)).unwrap();
        let a = c.build_request(&intent(), TS).unwrap();
        let b = c.build_request(&intent(), TS).unwrap();
        assert_eq!(a.body, b.body);
        assert_eq!(header(&a, HDR_SIGN), header(&b, HDR_SIGN));
        let recomputed = sign_hmac("test-secret-key", a.method, &a.path, &a.body, a.timestamp);
        assert_eq!(header(&a, HDR_SIGN), Some(recomputed.as_str()));
    }

    #[test]
    fn limit_order_carries_price() {
        let c = ExchangeClient::new(cfg(SignScheme::Hmac)).unwrap();
        let mut i = intent();
        i.order_type = OrderType::Limit;
        i.price = Some(Amount::from_json(&json!("42000.5")).unwrap());
        let r = c.build_request(&i, TS).unwrap();
        assert!(r.body.ends_with(r#""type":"limit","amount":"0.001","price":"42000.5"}"#));
    }

    #[test]
    fn legacy_md5_request() {
        let c = ExchangeClient::new(cfg(SignScheme::LegacyMd5)).unwrap();
        let r = c.build_request(&intent(), TS).unwrap();
        assert_eq!(
            r.body,
            "access_id=AK123&amount=0.001&market=BTCUSDT&side=buy&tonce=1700000000000&type=market"
        );
        assert_eq!(r.content_type, "application/x-www-form-urlencoded");
        assert_eq!(header(&r, HDR_AUTHORIZATION), Some("ae129727d2fa12ea0f831abbac62bfb3"));
    }

    #[test]
    fn legacy_md5_body_has_only_signed_fields() {
        use crate::error::GateError;
        use crate::webhook::WebhookGate;

        let gate = WebhookGate::new(Secret::new("W"));
        let c = ExchangeClient::new(cfg(SignScheme::LegacyMd5)).unwrap();

        let bad = json!({"secret":"W","action":"buy","symbol":"btc usdt&price=1","amount":"1"});
        assert!(matches!(
            gate.admit(bad.to_string().as_bytes()),
            Err(GateError::InvalidField { field: "symbol", .. })
        ));

        let ok = json!({"secret":"W","action":"buy","symbol":"btcusdt","amount":"1"});
        let i = gate.admit(ok.to_string().as_bytes()).unwrap();
        let r = c.build_request(&i, TS).unwrap();
        let keys: Vec<&str> = r.body.split('&').map(|kv| kv.split('=').next().unwrap()).collect();
        assert_eq!(keys, ["access_id", "amount", "market", "side", "tonce", "type"]);
        assert!(r.body.split('&').all(|kv| kv.matches('=').count() == 1));
    }

    #[test]
    fn debug_hides_signature() {
        let c = ExchangeClient::new(cfg(SignScheme::Hmac)).unwrap();
        let r = c.build_request(&intent(), TS).unwrap();
        let dbg = format!("{r:?}");
        assert!(!dbg.contains("50c6134f"));
        assert!(dbg.contains(HDR_SIGN));
    }

    #[test]
    fn interpret_success() {
        let d = interpret(StatusCode::OK, br#"{"code":0,"data":{"order_id":"123"},"message":"OK"}"#).unwrap();
        assert_eq!(d, json!({"order_id":"123"}));
    }

    #[test]
    fn interpret_rejection_keeps_code_and_message() {
        let e = interpret(StatusCode::OK, br#"{"code":24,"message":"balance not enough"}"#).unwrap_err();
        match e {
            OrderError::ExchangeRejected { code, message } => {
                assert_eq!(code, 24);
                assert_eq!(message, "balance not enough");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn interpret_shape_and_transport_errors() {
        assert!(matches!(
            interpret(StatusCode::OK, br#"{"code":0,"message":"OK"}"#),
            Err(OrderError::UnexpectedResponseShape(_))
        ));
        assert!(matches!(
            interpret(StatusCode::OK, br#"{"code":0,"data":null}"#),
            Err(OrderError::UnexpectedResponseShape(_))
        ));
        assert!(matches!(
            interpret(StatusCode::OK, br#"{"data":{}}"#),
            Err(OrderError::UnexpectedResponseShape(_))
        ));
        assert!(matches!(
            interpret(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>"),
            Err(OrderError::Transport(_))
        ));
    }
}
