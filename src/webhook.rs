// ===============================
// src/webhook.rs (gate: auth + parse + validate)
// ===============================
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::Secret;
use crate::domain::{Action, Amount, AmountError, OrderIntent, OrderType};
use crate::error::GateError;

/// Alert body as sent by the charting service. Loose on purpose so every
/// field error maps to its own `GateError` instead of one serde failure.
#[derive(Debug, Deserialize)]
struct SignalPayload {
    #[serde(default)]
    action: Value,
    #[serde(default)]
    symbol: Value,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    order_type: Value,
    #[serde(default)]
    price: Value,
}

/// Holds the shared webhook secret. Read-only, safe to share across tasks.
#[derive(Debug, Clone)]
pub struct WebhookGate {
    secret: Secret,
}

impl WebhookGate {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Raw body -> `OrderIntent`. The secret is checked before any other
    /// field is looked at.
    pub fn admit(&self, raw: &[u8]) -> Result<OrderIntent, GateError> {
        // 1) parse
        let obj: Map<String, Value> =
            serde_json::from_slice(raw).map_err(|_| GateError::MalformedPayload)?;

        // 2) auth, exact match (no trim, no case folding)
        match obj.get("secret") {
            Some(Value::String(s)) if s == self.secret.expose() => {}
            _ => return Err(GateError::Unauthorized),
        }

        let p: SignalPayload =
            serde_json::from_value(Value::Object(obj)).map_err(|_| GateError::MalformedPayload)?;

        // 3) action
        let action = match &p.action {
            Value::String(s) => s.parse::<Action>().map_err(|_| GateError::InvalidAction)?,
            _ => return Err(GateError::InvalidAction),
        };

        // 4) symbol + amount
        let symbol = match &p.symbol {
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return Err(GateError::MissingField("symbol")),
        };
        // goes into the legacy form body unencoded: pair tokens only
        if !symbol.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(GateError::InvalidField {
                field: "symbol",
                reason: "expected ASCII letters and digits only",
            });
        }
        if p.amount.is_null() {
            return Err(GateError::MissingField("amount"));
        }
        let amount = Amount::from_json(&p.amount).map_err(|e| invalid("amount", e))?;

        // 5) order_type (default market)
        let order_type = match &p.order_type {
            Value::Null => OrderType::default(),
            Value::String(s) => s.parse::<OrderType>().map_err(|_| GateError::InvalidField {
                field: "order_type",
                reason: "expected market or limit",
            })?,
            _ => {
                return Err(GateError::InvalidField {
                    field: "order_type",
                    reason: "expected market or limit",
                })
            }
        };

        let price = match order_type {
            OrderType::Limit if p.price.is_null() => return Err(GateError::MissingField("price")),
            OrderType::Limit => Some(Amount::from_json(&p.price).map_err(|e| invalid("price", e))?),
            OrderType::Market => None,
        };

        // 6) done, never mutated afterwards
        Ok(OrderIntent { action, symbol, amount, order_type, price })
    }
}

fn invalid(field: &'static str, e: AmountError) -> GateError {
    let reason = match e {
        AmountError::WrongType => "expected number or numeric string",
        AmountError::NotDecimal => "not a decimal number",
        AmountError::NotPositive => "must be greater than zero",
    };
    GateError::InvalidField { field, reason }
}
