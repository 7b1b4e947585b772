// ===============================
// src/domain.rs
// ===============================
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
        }
    }
}

/// Exact tokens only: "Buy", " buy" etc. are rejected.
impl FromStr for Action {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
        }
    }
}

impl FromStr for OrderType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            _ => Err(()),
        }
    }
}

/// Decimal quantity kept as text. The exchange wants a string, never a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// null, bool, object, array
    WrongType,
    NotDecimal,
    NotPositive,
}

impl Amount {
    /// Accepts a JSON string (kept byte-for-byte, so it must already be a
    /// plain `digits[.digits]` decimal) or a JSON number (rendered as a plain
    /// decimal). Must be strictly positive.
    pub fn from_json(v: &Value) -> Result<Self, AmountError> {
        let (text, dec) = match v {
            Value::String(s) => {
                if !is_plain_decimal(s) {
                    return Err(AmountError::NotDecimal);
                }
                let dec = Decimal::from_str(s).map_err(|_| AmountError::NotDecimal)?;
                (s.clone(), dec)
            }
            Value::Number(n) => {
                let dec = parse_decimal(&n.to_string())?;
                (dec.normalize().to_string(), dec)
            }
            _ => return Err(AmountError::WrongType),
        };
        if dec <= Decimal::ZERO {
            return Err(AmountError::NotPositive);
        }
        Ok(Amount(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// `^[0-9]+(\.[0-9]+)?$`: no sign, exponent, separators or bare dot.
fn is_plain_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

fn parse_decimal(s: &str) -> Result<Decimal, AmountError> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| AmountError::NotDecimal)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated trade request. Only the webhook gate builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderIntent {
    pub action: Action,
    pub symbol: String,
    pub amount: Amount,
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Amount>,
}

#[derive(Debug, Clone)]
pub struct OrderResult {
    pub order_id: Option<String>,
    /// `data` object from the exchange envelope, passed back untouched.
    pub data: Value,
    pub submitted: OrderIntent,
}

impl OrderResult {
    pub fn new(data: Value, submitted: OrderIntent) -> Self {
        let order_id = match data.get("order_id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self { order_id, data, submitted }
    }
}
