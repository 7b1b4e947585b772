// ===============================
// src/lib.rs
// ===============================
//! Alert webhook -> signed CoinEx spot order.
//!
//! `webhook` validates the inbound alert into an [`domain::OrderIntent`],
//! `exchange` signs it (see `signer`) and places exactly one order,
//! `server` wires both behind a hyper endpoint.
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod server;
pub mod signer;
pub mod webhook;
