use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::CsrfError;

const KEY_CONTEXT: &str = "inkpost 2024-04-05 form token signing key";

/// Issues and checks the hidden token every rendered form carries.
///
/// A token reads `{unix_ts}.{nonce}.{signature}`, the signature being a
/// BLAKE3 keyed hash of `{unix_ts}.{nonce}` under a key derived from the
/// configured secret. Nothing is kept server side.
pub struct CsrfSigner {
    key: [u8; 32],
    time_limit: Duration,
}

impl CsrfSigner {
    pub fn new(secret: &str, time_limit: Duration) -> Self {
        CsrfSigner {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            time_limit,
        }
    }

    pub fn issue(&self) -> String {
        self.issue_at(Utc::now())
    }

    pub fn verify(&self, token: &str) -> Result<(), CsrfError> {
        self.verify_at(token, Utc::now())
    }

    fn issue_at(&self, now: DateTime<Utc>) -> String {
        let payload = format!("{}.{}", now.timestamp(), Uuid::new_v4().simple());
        let signature = self.sign(&payload);
        format!("{}.{}", payload, signature.to_hex())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<(), CsrfError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CsrfError::Missing);
        }

        let Some((payload, signature)) = token.rsplit_once('.') else {
            return Err(CsrfError::Invalid);
        };
        let Some((issued, _nonce)) = payload.split_once('.') else {
            return Err(CsrfError::Invalid);
        };

        let signature = blake3::Hash::from_hex(signature).map_err(|_| CsrfError::Invalid)?;
        // blake3::Hash equality is constant time
        if signature != self.sign(payload) {
            return Err(CsrfError::Invalid);
        }

        let issued: i64 = issued.parse().map_err(|_| CsrfError::Invalid)?;
        let Some(issued) = DateTime::<Utc>::from_timestamp(issued, 0) else {
            return Err(CsrfError::Invalid);
        };
        if now - issued > self.time_limit {
            return Err(CsrfError::Expired);
        }

        Ok(())
    }

    fn sign(&self, payload: &str) -> blake3::Hash {
        blake3::keyed_hash(&self.key, payload.as_bytes())
    }
}
