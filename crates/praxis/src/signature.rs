//! Verification of platform request signatures.
//!
//! The platform signs every webhook body with an ECDSA P-256 key and
//! publishes the current public keys at a well-known endpoint. Keys are
//! cached process-wide with a TTL so key rotation is picked up without
//! hitting the endpoint on every request. Verification never surfaces an
//! error to the caller: any lookup, decode or crypto failure is a plain
//! `false`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use p256::PublicKey;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tokio::sync::RwLock;

pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Deserialize)]
struct PublicKeyList {
    public_keys: Vec<PublicKeyEntry>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyEntry {
    key_identifier: String,
    key: String,
    #[serde(default)]
    is_current: bool,
}

struct CachedKeys {
    keys: HashMap<String, VerifyingKey>,
    fetched_at: Instant,
}

pub struct SignatureVerifier {
    client: reqwest::Client,
    key_endpoint: String,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl SignatureVerifier {
    pub fn new<S: Into<String>>(key_endpoint: S) -> Self {
        Self::with_ttl(key_endpoint, DEFAULT_KEY_TTL)
    }

    pub fn with_ttl<S: Into<String>>(key_endpoint: S, ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            key_endpoint: key_endpoint.into(),
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Check `signature_b64` (base64 DER) against the raw request body and
    /// the signing key identified by `key_id`.
    pub async fn verify(&self, body: &[u8], key_id: &str, signature_b64: &str) -> bool {
        let key = match self.lookup_key(key_id).await {
            Some(key) => key,
            None => {
                tracing::warn!(key_id, "no signing key matched the request");
                return false;
            }
        };

        let signature = match B64
            .decode(signature_b64)
            .map_err(|e| anyhow!(e))
            .and_then(|bytes| Signature::from_der(&bytes).map_err(|e| anyhow!(e)))
        {
            Ok(signature) => signature,
            Err(error) => {
                tracing::warn!(%error, "request signature could not be decoded");
                return false;
            }
        };

        key.verify(body, &signature).is_ok()
    }

    /// Resolve a key id through the cache, refetching lazily once the TTL
    /// has passed. A failed refetch resolves to no key rather than an error.
    async fn lookup_key(&self, key_id: &str) -> Option<VerifyingKey> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return cached.keys.get(key_id).cloned();
                }
            }
        }

        // Two requests racing past an expired cache both refetch; the keys
        // are idempotent data so last write wins.
        let keys = match self.fetch_keys().await {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!(%error, "signing key fetch failed");
                return None;
            }
        };

        let found = keys.get(key_id).cloned();
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        found
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, VerifyingKey>> {
        let response = self
            .client
            .get(&self.key_endpoint)
            .header(USER_AGENT, "praxis-agent")
            .send()
            .await?
            .error_for_status()?;

        let list: PublicKeyList = response.json().await?;

        let mut keys = HashMap::new();
        for entry in list.public_keys {
            match PublicKey::from_public_key_pem(&entry.key) {
                Ok(key) => {
                    keys.insert(entry.key_identifier, VerifyingKey::from(&key));
                }
                Err(error) => {
                    tracing::warn!(
                        %error,
                        key_identifier = entry.key_identifier,
                        is_current = entry.is_current,
                        "skipping unparsable signing key"
                    );
                }
            }
        }
        Ok(keys)
    }
}
