//! Rotating JWK set and bearer-token verification.
//!
//! [`KeySet`] holds the current verification keys. Rotation swaps the whole
//! set at once; every verification works on the snapshot it started with,
//! so a concurrent rotation never yields a half-updated key list.

use crate::error::{GatewayRuntimeError, TokenError};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Verified claim set of a token.
pub type Claims = Map<String, Value>;

/// Current collection of public verification keys.
pub struct KeySet {
    current: RwLock<Arc<JwkSet>>,
}

impl KeySet {
    pub fn new(keys: JwkSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(keys)),
        }
    }

    /// A set with no keys; every token is rejected.
    pub fn empty() -> Self {
        Self::new(JwkSet { keys: Vec::new() })
    }

    /// Parse a JWK set document (`{"keys": [...]}`).
    pub fn from_json(text: &str) -> Result<Self, GatewayRuntimeError> {
        let keys: JwkSet =
            serde_json::from_str(text).map_err(|e| GatewayRuntimeError::KeySet(e.to_string()))?;
        Ok(Self::new(keys))
    }

    /// Read and parse a JWK set document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayRuntimeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GatewayRuntimeError::KeySet(format!("{}: {e}", path.display())))?;
        let set = Self::from_json(&text)?;
        info!(path = %path.display(), keys = set.len(), "verification key set loaded");
        Ok(set)
    }

    /// Replace the whole key set.
    pub fn rotate(&self, keys: JwkSet) {
        let count = keys.keys.len();
        *self.current.write() = Arc::new(keys);
        info!(keys = count, "verification key set rotated");
    }

    pub fn snapshot(&self) -> Arc<JwkSet> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.current.read().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify `token` against the keys usable with the algorithm named in its
    /// header and return its claim set.
    ///
    /// A key is a candidate when its `kid` equals the token's `kid` (if the
    /// token names one) and it is declared for, or of a key type compatible
    /// with, that algorithm. The first candidate that verifies wins.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
        let alg = header.alg;
        let keys = self.snapshot();

        let mut validation = Validation::new(alg);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;

        let mut last_error = None;
        for jwk in keys.keys.iter().filter(|jwk| {
            kid_matches(jwk, header.kid.as_deref()) && supports_algorithm(jwk, alg)
        }) {
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    debug!(kid = ?jwk.common.key_id, error = %e, "skipping unusable key");
                    continue;
                }
            };
            match decode::<Claims>(token, &key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) if is_structural(e.kind()) => {
                    return Err(TokenError::Malformed(e.to_string()));
                }
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        Err(TokenError::Rejected(last_error.unwrap_or_else(|| {
            format!("no verification key matches algorithm {alg:?}")
        })))
    }
}

fn kid_matches(jwk: &Jwk, kid: Option<&str>) -> bool {
    match kid {
        Some(kid) => jwk.common.key_id.as_deref() == Some(kid),
        None => true,
    }
}

fn supports_algorithm(jwk: &Jwk, alg: Algorithm) -> bool {
    if let Some(declared) = &jwk.common.key_algorithm {
        return signing_algorithm(declared) == Some(alg);
    }
    match &jwk.algorithm {
        AlgorithmParameters::OctetKey(_) => {
            matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
        }
        AlgorithmParameters::RSA(_) => matches!(
            alg,
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512
        ),
        AlgorithmParameters::EllipticCurve(_) => {
            matches!(alg, Algorithm::ES256 | Algorithm::ES384)
        }
        AlgorithmParameters::OctetKeyPair(_) => alg == Algorithm::EdDSA,
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// JWS algorithm a key is declared for. Encryption-only keys have none.
fn signing_algorithm(declared: &KeyAlgorithm) -> Option<Algorithm> {
    match declared {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Failures caused by the token's shape rather than by its signature.
fn is_structural(kind: &ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_)
    )
}
