//! Wallet-signature authentication for stateless HTTP requests.
//!
//! Clients fetch a per-key nonce, sign an amino sign doc wrapping their
//! request `data` with a secp256k1 wallet key, and send it to a protected
//! route. The server rebuilds the sign doc, verifies the signature, and
//! advances the nonce before the handler runs, so each signed request is
//! accepted at most once.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
