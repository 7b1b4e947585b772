// ===============================
// src/signer.rs
// ===============================
//
// Tanda tangan request CoinEx. Semua fungsi di sini murni: tidak baca jam,
// tidak I/O. Timestamp diambil sekali oleh pemanggil lalu dipakai ulang.
//
use std::collections::BTreeMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

/// Which signing scheme the exchange client uses. Chosen by config only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScheme {
    /// method + path + body + timestamp, HMAC-SHA256, lowercase hex.
    Hmac,
    /// sorted k=v params + `&secret_key=`, MD5 hex.
    LegacyMd5,
}

impl SignScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignScheme::Hmac => "hmac",
            SignScheme::LegacyMd5 => "md5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HexCase {
    #[default]
    Lower,
    Upper,
}

pub fn timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

pub fn sign_hmac(secret: &str, method: &str, path: &str, body: &str, timestamp_ms: u64) -> String {
    let prepared = format!("{}{}{}{}", method.to_ascii_uppercase(), path, body, timestamp_ms);
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(prepared.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `k1=v1&k2=v2` with keys in lexicographic order. This exact string is what
/// the legacy scheme signs and what goes on the wire as the body.
pub fn canonical_query(params: &BTreeMap<&str, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sign_md5(params: &BTreeMap<&str, String>, secret: &str, case: HexCase) -> String {
    let raw = format!("{}&secret_key={}", canonical_query(params), secret);
    let digest = Md5::digest(raw.as_bytes());
    match case {
        HexCase::Lower => hex::encode(digest),
        HexCase::Upper => hex::encode_upper(digest),
    }
}
