//! secp256k1 signature verification and bech32 address derivation.

use base64::{engine::general_purpose, Engine as _};
use bech32::{Bech32, Hrp};
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

const COMPRESSED_PK_LEN: usize = 33;
const UNCOMPRESSED_PK_LEN: usize = 65;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid bech32 prefix: {0}")]
    InvalidPrefix(String),

    #[error("Sign doc serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Decode a hex SEC1 public key (compressed or uncompressed).
pub fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey, VerifyError> {
    let raw = hex::decode(public_key_hex)
        .map_err(|e| VerifyError::InvalidPublicKey(format!("invalid hex: {}", e)))?;

    if raw.len() != COMPRESSED_PK_LEN && raw.len() != UNCOMPRESSED_PK_LEN {
        return Err(VerifyError::InvalidPublicKey(format!(
            "expected {} or {} bytes, got {}",
            COMPRESSED_PK_LEN,
            UNCOMPRESSED_PK_LEN,
            raw.len()
        )));
    }

    VerifyingKey::from_sec1_bytes(&raw)
        .map_err(|_| VerifyError::InvalidPublicKey("not a secp256k1 point".to_string()))
}

/// Derive the bech32 account address for a public key.
///
/// The key is compressed first, so both SEC1 encodings of the same point
/// yield the same address: `bech32(prefix, ripemd160(sha256(compressed)))`.
pub fn derive_address(public_key_hex: &str, prefix: &str) -> Result<String, VerifyError> {
    let verifying_key = parse_public_key(public_key_hex)?;
    let compressed = verifying_key.to_encoded_point(true);

    let pk_sha256 = Sha256::digest(compressed.as_bytes());
    let address_raw = Ripemd160::digest(pk_sha256);

    let hrp = Hrp::parse(prefix).map_err(|e| VerifyError::InvalidPrefix(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, &address_raw)
        .map_err(|e| VerifyError::InvalidPrefix(e.to_string()))
}

/// Verify a base64 compact secp256k1 signature over `message`.
///
/// The message is hashed with SHA-256. High-S signatures are rejected.
/// Every malformed input (bad hex, bad base64, wrong length, invalid point)
/// returns `false`.
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_base64: &str) -> bool {
    let Ok(verifying_key) = parse_public_key(public_key_hex) else {
        return false;
    };

    let Ok(signature_bytes) = general_purpose::STANDARD.decode(signature_base64) else {
        return false;
    };

    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };

    verifying_key.verify(message, &signature).is_ok()
}
