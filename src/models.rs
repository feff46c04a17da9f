//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Signed Request Models
// ============================================================================

/// Signing metadata embedded in every protected request as `data.auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaim {
    /// Label the wallet shows the signer. Only its presence is checked.
    #[serde(rename = "type")]
    pub kind: String,
    pub nonce: u64,
    pub chain_id: String,
    pub chain_fee_denom: String,
    pub chain_bech32_prefix: String,
    pub public_key: String, // hex SEC1
}

/// Body of a protected request.
///
/// `data` keeps every field in the order it arrived; it is re-serialized for
/// signature checking and must not be normalized.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    pub data: Map<String, Value>,
    pub signature: String, // base64 compact r || s
}

impl RequestEnvelope {
    /// Parse the typed claim out of `data.auth`.
    pub fn claim(&self) -> Result<AuthClaim, serde_json::Error> {
        let auth = self.data.get("auth").cloned().unwrap_or(Value::Null);
        serde_json::from_value(auth)
    }
}

// ============================================================================
// Response Models
// ============================================================================

/// Response from the nonce query endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub nonce: u64,
}

/// Identity echoed back by the protected `whoami` route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResponse {
    pub public_key: String,
    pub address: String,
    pub nonce: u64,
    pub data: Map<String, Value>,
}
