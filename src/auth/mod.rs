//! Wallet-signature authentication: sign-doc reconstruction, secp256k1
//! verification, and the nonce-gated request extractor.

pub mod canonical;
pub mod gate;
pub mod middleware;
pub mod verify;

pub use canonical::canonical_message;
pub use gate::{authorize, Authorized};
pub use middleware::{AppState, WalletAuth};
pub use verify::{derive_address, verify_signature};
