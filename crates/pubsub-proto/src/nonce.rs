//! Correlation nonce generation.

use uuid::Uuid;

/// Generate a fresh, globally-unique correlation nonce.
///
/// Nonces correlate an outbound `LISTEN`/`UNLISTEN` request with its
/// `RESPONSE`; they are opaque to the server and never reused.
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}
