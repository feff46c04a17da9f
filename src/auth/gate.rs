//! Request authorization: structure, nonce, signature, nonce advance.
//!
//! A request moves through
//! `Received -> StructurallyValidated -> NonceChecked -> SignatureVerified -> Authorized`
//! and any step may reject it. The stored nonce is written exactly once, on
//! the success path, after the signature checks out and before the handler
//! runs. The write is a compare-and-set, so a concurrent request carrying the
//! same nonce loses with `NonceMismatch` even if it passed the first check.

use super::canonical::{build_sign_doc, serialize_sign_doc};
use super::verify::verify_signature;
use crate::error::AppError;
use crate::models::{AuthClaim, RequestEnvelope};
use crate::storage::NonceStore;
use serde_json::{Map, Value};

/// Identity attached to a request that passed the gate.
#[derive(Debug, Clone)]
pub struct Authorized {
    pub public_key: String,
    pub address: String,
    pub claim: AuthClaim,
    pub data: Map<String, Value>,
}

/// Parse and structurally validate a request body.
///
/// No storage is touched here; a malformed body never costs a round trip.
pub fn parse_request(body: &[u8]) -> Result<(RequestEnvelope, AuthClaim), AppError> {
    let envelope: RequestEnvelope =
        serde_json::from_slice(body).map_err(|_| AppError::MalformedRequest)?;
    let claim = envelope.claim().map_err(|_| AppError::MalformedRequest)?;
    Ok((envelope, claim))
}

/// Rebuild the signed message and check the signature.
///
/// Returns the signer address embedded in the sign doc. Failures while
/// assembling the message count as a bad signature.
pub fn check_signature(
    envelope: &RequestEnvelope,
    claim: &AuthClaim,
) -> Result<String, AppError> {
    let (doc, message) = build_sign_doc(&envelope.data, claim)
        .and_then(|doc| serialize_sign_doc(&doc).map(|message| (doc, message)))
        .map_err(|e| {
            tracing::debug!(error = %e, "Sign doc assembly failed");
            AppError::SignatureInvalid
        })?;

    if !verify_signature(&claim.public_key, &message, &envelope.signature) {
        return Err(AppError::SignatureInvalid);
    }

    Ok(doc.signer().to_string())
}

/// Run the full gate for one request body.
pub async fn authorize(store: &dyn NonceStore, body: &[u8]) -> Result<Authorized, AppError> {
    let (envelope, claim) = parse_request(body).inspect_err(|_| {
        tracing::warn!(action = "auth_rejected", reason = "malformed", "Invalid body");
    })?;

    let stored = store.get_nonce(&claim.public_key).await?;
    if stored != claim.nonce {
        tracing::warn!(
            action = "auth_rejected",
            reason = "nonce",
            public_key = %claim.public_key,
            expected = stored,
            presented = claim.nonce,
            "Invalid nonce"
        );
        return Err(AppError::NonceMismatch);
    }

    let address = check_signature(&envelope, &claim).inspect_err(|_| {
        tracing::warn!(
            action = "auth_rejected",
            reason = "signature",
            public_key = %claim.public_key,
            "Invalid signature"
        );
    })?;

    if !store.advance_nonce(&claim.public_key, claim.nonce).await? {
        tracing::warn!(
            action = "auth_rejected",
            reason = "nonce_race",
            public_key = %claim.public_key,
            presented = claim.nonce,
            "Nonce consumed by a concurrent request"
        );
        return Err(AppError::NonceMismatch);
    }

    tracing::info!(
        action = "auth_success",
        public_key = %claim.public_key,
        address = %address,
        nonce = claim.nonce,
        "Request authorized"
    );

    Ok(Authorized {
        public_key: claim.public_key.clone(),
        address,
        claim,
        data: envelope.data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::canonical::canonical_message;
    use crate::auth::verify::derive_address;
    use crate::storage::{MemoryNonceStore, StoreError};
    use async_trait::async_trait;
    use base64::{engine::general_purpose, Engine as _};
    use k256::ecdsa::{signature::Signer, Signature, SigningKey};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Memory store that counts every call reaching storage.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryNonceStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NonceStore for CountingStore {
        async fn get_nonce(&self, public_key: &str) -> Result<u64, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_nonce(public_key).await
        }

        async fn set_nonce(&self, public_key: &str, value: u64) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.set_nonce(public_key, value).await
        }

        async fn advance_nonce(&self, public_key: &str, expected: u64) -> Result<bool, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.advance_nonce(public_key, expected).await
        }
    }

    /// Store whose backend is always down.
    struct DownStore;

    #[async_trait]
    impl NonceStore for DownStore {
        async fn get_nonce(&self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn set_nonce(&self, _: &str, _: u64) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn advance_nonce(&self, _: &str, _: u64) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn test_signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::fill(&mut seed);
        SigningKey::from_slice(&seed).unwrap()
    }

    fn pubkey_hex(signing_key: &SigningKey) -> String {
        hex::encode(signing_key.verifying_key().to_encoded_point(true).as_bytes())
    }

    fn signed_data(signing_key: &SigningKey, nonce: u64) -> Map<String, Value> {
        let value = json!({
            "auth": {
                "type": "Transfer approval",
                "nonce": nonce,
                "chainId": "juno-1",
                "chainFeeDenom": "ujuno",
                "chainBech32Prefix": "juno",
                "publicKey": pubkey_hex(signing_key)
            },
            "amount": "100",
            "recipient": "juno1recipient"
        });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn sign(signing_key: &SigningKey, data: &Map<String, Value>) -> String {
        let claim: AuthClaim = serde_json::from_value(data["auth"].clone()).unwrap();
        let message = canonical_message(data, &claim).unwrap();
        let signature: Signature = signing_key.sign(&message);
        general_purpose::STANDARD.encode(signature.to_bytes())
    }

    fn body(data: &Map<String, Value>, signature: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({"data": data, "signature": signature})).unwrap()
    }

    fn signed_body(signing_key: &SigningKey, nonce: u64) -> Vec<u8> {
        let data = signed_data(signing_key, nonce);
        body(&data, &sign(signing_key, &data))
    }

    #[tokio::test]
    async fn test_authorize_success_advances_nonce() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let pk = pubkey_hex(&key);

        let authorized = authorize(&store, &signed_body(&key, 0)).await.unwrap();
        assert_eq!(authorized.public_key, pk);
        assert!(authorized.address.starts_with("juno1"));
        assert_eq!(authorized.claim.nonce, 0);
        assert_eq!(authorized.data["amount"], "100");
        assert_eq!(store.get_nonce(&pk).await.unwrap(), 1);

        authorize(&store, &signed_body(&key, 1)).await.unwrap();
        assert_eq!(store.get_nonce(&pk).await.unwrap(), 2);
    }

    #[test]
    fn test_check_signature_returns_sign_doc_signer() {
        let key = test_signing_key();
        let data = signed_data(&key, 0);
        let (envelope, claim) = parse_request(&body(&data, &sign(&key, &data))).unwrap();

        let address = check_signature(&envelope, &claim).unwrap();
        assert_eq!(
            address,
            derive_address(&pubkey_hex(&key), "juno").unwrap()
        );
        assert_eq!(
            address,
            build_sign_doc(&envelope.data, &claim).unwrap().signer()
        );
    }

    #[tokio::test]
    async fn test_replay_is_nonce_mismatch() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let request = signed_body(&key, 0);

        authorize(&store, &request).await.unwrap();
        let replay = authorize(&store, &request).await;
        assert!(matches!(replay, Err(AppError::NonceMismatch)));
        assert_eq!(store.get_nonce(&pubkey_hex(&key)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_future_nonce_rejected_without_advance() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();

        let result = authorize(&store, &signed_body(&key, 5)).await;
        assert!(matches!(result, Err(AppError::NonceMismatch)));
        assert_eq!(store.get_nonce(&pubkey_hex(&key)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flipped_signature_byte_rejected() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let data = signed_data(&key, 0);
        let signature = sign(&key, &data);

        let mut raw = general_purpose::STANDARD.decode(&signature).unwrap();
        raw[0] ^= 0x80;
        let tampered = general_purpose::STANDARD.encode(raw);

        let result = authorize(&store, &body(&data, &tampered)).await;
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
        assert_eq!(store.get_nonce(&pubkey_hex(&key)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutated_payload_rejected() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let data = signed_data(&key, 0);
        let signature = sign(&key, &data);

        let mut tampered = data.clone();
        tampered.insert("amount".to_string(), json!("100000"));

        let result = authorize(&store, &body(&tampered, &signature)).await;
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
        assert_eq!(store.get_nonce(&pubkey_hex(&key)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutated_claim_field_rejected() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let data = signed_data(&key, 0);
        let signature = sign(&key, &data);

        let mut tampered = data.clone();
        tampered["auth"]["chainId"] = json!("osmosis-1");

        let result = authorize(&store, &body(&tampered, &signature)).await;
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_other_key_signature_rejected() {
        let store = MemoryNonceStore::new();
        let key = test_signing_key();
        let impostor = test_signing_key();
        let data = signed_data(&key, 0);

        let result = authorize(&store, &body(&data, &sign(&impostor, &data))).await;
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn test_undecodable_public_key_is_signature_invalid() {
        let store = MemoryNonceStore::new();
        let mut data = signed_data(&test_signing_key(), 0);
        data["auth"]["publicKey"] = json!("abc123");

        let result = authorize(&store, &body(&data, "AAAA")).await;
        assert!(matches!(result, Err(AppError::SignatureInvalid)));
        assert_eq!(store.get_nonce("abc123").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_claim_fields_never_touch_storage() {
        let key = test_signing_key();
        let fields = [
            "type",
            "nonce",
            "chainId",
            "chainFeeDenom",
            "chainBech32Prefix",
            "publicKey",
        ];

        for field in fields {
            let store = CountingStore::default();
            let mut data = signed_data(&key, 0);
            data["auth"].as_object_mut().unwrap().remove(field);

            let result = authorize(&store, &body(&data, "sig")).await;
            assert!(
                matches!(result, Err(AppError::MalformedRequest)),
                "missing {field}"
            );
            assert_eq!(store.calls(), 0, "missing {field}");
        }
    }

    #[tokio::test]
    async fn test_structural_failures_never_touch_storage() {
        let key = test_signing_key();
        let data = signed_data(&key, 0);
        let mut wrong_type = data.clone();
        wrong_type["auth"]["nonce"] = json!("0");

        let bodies: Vec<Vec<u8>> = vec![
            b"not json".to_vec(),
            b"[]".to_vec(),
            serde_json::to_vec(&json!({"data": data})).unwrap(),
            serde_json::to_vec(&json!({"signature": "sig"})).unwrap(),
            serde_json::to_vec(&json!({"data": {"x": 1}, "signature": "sig"})).unwrap(),
            serde_json::to_vec(&json!({"data": data, "signature": 7})).unwrap(),
            body(&wrong_type, "sig"),
        ];

        for request in bodies {
            let store = CountingStore::default();
            let result = authorize(&store, &request).await;
            assert!(matches!(result, Err(AppError::MalformedRequest)));
            assert_eq!(store.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_storage_down_is_storage_unavailable() {
        let key = test_signing_key();
        let result = authorize(&DownStore, &signed_body(&key, 0)).await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_nonce_authorizes_once() {
        let store: Arc<dyn NonceStore> = Arc::new(MemoryNonceStore::new());
        let key = test_signing_key();
        let request = Arc::new(signed_body(&key, 0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let request = Arc::clone(&request);
            handles.push(tokio::spawn(async move {
                authorize(store.as_ref(), &request).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::NonceMismatch) => {}
                Err(other) => panic!("unexpected rejection: {other}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.get_nonce(&pubkey_hex(&key)).await.unwrap(), 1);
    }
}
