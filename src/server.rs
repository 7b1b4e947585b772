// ===============================
// src/server.rs (HTTP: /webhook, /, /metrics)
// ===============================
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::HttpBody;
use hyper::header::CONTENT_TYPE;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::exchange::ExchangeClient;
use crate::metrics::{self, WEBHOOKS};
use crate::webhook::WebhookGate;

/// Alerts are a few hundred bytes; anything past this is refused unread.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Everything a request needs, built once at startup, read-only afterwards.
#[derive(Debug)]
pub struct AppState {
    pub gate: WebhookGate,
    pub client: ExchangeClient,
}

/// Bind and serve until `shutdown` resolves. Returns the bound address
/// through `on_bound` so callers may listen on port 0.
pub async fn serve<F>(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: F,
    on_bound: impl FnOnce(SocketAddr),
) -> hyper::Result<()>
where
    F: Future<Output = ()>,
{
    let make_svc = make_service_fn(move |_conn| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                let state = Arc::clone(&state);
                handle(req, state)
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    let local = server.local_addr();
    info!(addr = %local, "webhook server listening (POST /webhook, GET /, GET /metrics)");
    on_bound(local);

    server.with_graceful_shutdown(shutdown).await
}

pub async fn handle(req: Request<Body>, state: Arc<AppState>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!(%method, %path, "request");

    let rsp = match (method, path.as_str()) {
        (Method::POST, "/webhook") => webhook(req, &state).await,
        (Method::GET, "/") => json_response(StatusCode::OK, json!({"status": "running"})),
        (Method::GET, "/metrics") => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, metrics::content_type())
            .body(Body::from(metrics::encode_metrics()))
            .unwrap_or_else(|_| plain_500()),
        (_, "/webhook") | (_, "/") | (_, "/metrics") => detail(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
        _ => detail(StatusCode::NOT_FOUND, "Not Found"),
    };
    Ok(rsp)
}

async fn webhook(req: Request<Body>, state: &AppState) -> Response<Body> {
    let body = req.into_body();
    if body.size_hint().lower() > MAX_BODY_BYTES {
        WEBHOOKS.with_label_values(&["too_large"]).inc();
        return detail(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
    }
    let raw = match read_limited(body).await {
        Ok(Some(b)) => b,
        Ok(None) => {
            WEBHOOKS.with_label_values(&["too_large"]).inc();
            return detail(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large");
        }
        Err(e) => {
            warn!(error = %e, "failed reading webhook body");
            WEBHOOKS.with_label_values(&["malformed"]).inc();
            return detail(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let intent = match state.gate.admit(&raw) {
        Ok(i) => i,
        Err(e) => {
            warn!(reason = e.label(), "webhook rejected: {e}");
            WEBHOOKS.with_label_values(&[e.label()]).inc();
            return detail(e.status(), &e.to_string());
        }
    };

    match state.client.place_order(&intent).await {
        Ok(res) => {
            WEBHOOKS.with_label_values(&["ok"]).inc();
            json_response(StatusCode::OK, json!({"status": "ok", "order": res.data}))
        }
        Err(e) => {
            WEBHOOKS.with_label_values(&["order_failed"]).inc();
            error!(error = %e, "order placement failed");
            detail(e.status(), &e.detail())
        }
    }
}

/// Collect the body, giving up (Ok(None)) once it passes `MAX_BODY_BYTES`.
async fn read_limited(mut body: Body) -> Result<Option<Vec<u8>>, hyper::Error> {
    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk?;
        if (buf.len() + chunk.len()) as u64 > MAX_BODY_BYTES {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

fn detail(status: StatusCode, msg: &str) -> Response<Body> {
    json_response(status, json!({"detail": msg}))
}

fn json_response(status: StatusCode, v: Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(v.to_string()))
        .unwrap_or_else(|_| plain_500())
}

fn plain_500() -> Response<Body> {
    let mut r = Response::new(Body::from("internal error"));
    *r.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    r
}
