//! JWT token maker with shared-secret and JWKS key sources

use std::fmt::Debug;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{BigUint, RsaPrivateKey};
use serde::Deserialize;
use tracing::debug;

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::token::{TokenError, TokenMaker, TokenPayload};
use crate::domain::DomainError;

/// Shortest shared secret accepted for HMAC signing
pub const MIN_SECRET_KEY_SIZE: usize = 32;

/// Issues and verifies JWT credentials under one fixed key
#[derive(Clone)]
pub struct JwtMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    key_id: Option<String>,
    clock: Arc<dyn Clock>,
}

impl Debug for JwtMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtMaker")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtMaker {
    /// HS256 maker from a shared secret of at least 32 bytes
    pub fn from_secret(secret: &str) -> Result<Self, DomainError> {
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(DomainError::configuration(format!(
                "invalid key size: must be at least {} characters",
                MIN_SECRET_KEY_SIZE
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            key_id: None,
            clock: Arc::new(SystemClock),
        })
    }

    /// Maker from the first usable key of a JWKS document (RSA or oct)
    pub fn from_jwks_json(jwks_json: &str) -> Result<Self, DomainError> {
        let jwks: Jwks = serde_json::from_str(jwks_json)
            .map_err(|e| DomainError::configuration(format!("Failed to parse JWKS: {}", e)))?;

        let key = jwks
            .keys
            .iter()
            .find(|k| k.kid.is_some())
            .or_else(|| jwks.keys.first())
            .ok_or_else(|| DomainError::configuration("JWKS contains no keys"))?;

        let key_id = key.kid.clone().unwrap_or_else(|| "default".to_string());

        match key.kty.as_str() {
            "RSA" => Self::from_rsa_jwk(key, key_id),
            "oct" => Self::from_symmetric_jwk(key, key_id),
            other => Err(DomainError::configuration(format!(
                "Unsupported key type: {}. Use RSA or oct.",
                other
            ))),
        }
    }

    /// Read time from `clock` instead of the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn from_rsa_jwk(key: &JwkKey, key_id: String) -> Result<Self, DomainError> {
        let algorithm = match key.alg.as_deref() {
            Some("RS256") | None => Algorithm::RS256,
            Some("RS384") => Algorithm::RS384,
            Some("RS512") => Algorithm::RS512,
            Some(alg) => {
                return Err(DomainError::configuration(format!(
                    "Unsupported RSA algorithm: {}",
                    alg
                )))
            }
        };

        let private_key = build_rsa_private_key(key)?;

        let private_pem = private_key
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|e| DomainError::configuration(format!("Failed to encode RSA private key: {}", e)))?;
        let public_pem = private_key
            .to_public_key()
            .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
            .map_err(|e| DomainError::configuration(format!("Failed to encode RSA public key: {}", e)))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| DomainError::configuration(format!("Failed to create encoding key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| DomainError::configuration(format!("Failed to create decoding key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm,
            key_id: Some(key_id),
            clock: Arc::new(SystemClock),
        })
    }

    fn from_symmetric_jwk(key: &JwkKey, key_id: String) -> Result<Self, DomainError> {
        let algorithm = match key.alg.as_deref() {
            Some("HS256") | None => Algorithm::HS256,
            Some("HS384") => Algorithm::HS384,
            Some("HS512") => Algorithm::HS512,
            Some(alg) => {
                return Err(DomainError::configuration(format!(
                    "Unsupported symmetric algorithm: {}",
                    alg
                )))
            }
        };

        let k = key
            .k
            .as_deref()
            .ok_or_else(|| DomainError::configuration("Symmetric key missing 'k' value"))?;
        let secret = decode_base64url(k, "k")?;

        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(DomainError::configuration(format!(
                "invalid key size: must be at least {} bytes",
                MIN_SECRET_KEY_SIZE
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            algorithm,
            key_id: Some(key_id),
            clock: Arc::new(SystemClock),
        })
    }
}

impl TokenMaker for JwtMaker {
    fn create_token(
        &self,
        username: &str,
        duration: Duration,
    ) -> Result<(String, TokenPayload), TokenError> {
        let payload = TokenPayload::new(username, duration, self.clock.now());

        let mut header = Header::new(self.algorithm);
        header.kid = self.key_id.clone();

        let token = encode(&header, &payload, &self.encoding_key)
            .map_err(|e| TokenError::SigningError(e.to_string()))?;

        Ok((token, payload))
    }

    fn verify_token(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let (message, signature) = split_compact(token)?;

        // Always check under our own algorithm, never the one the header claims
        let valid = jsonwebtoken::crypto::verify(
            signature,
            message.as_bytes(),
            &self.decoding_key,
            self.algorithm,
        )
        .unwrap_or(false);

        if !valid {
            return Err(TokenError::InvalidSignature);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let payload = decode::<TokenPayload>(token, &self.decoding_key, &validation)
            .map_err(|e| TokenError::MalformedCredential(e.to_string()))?
            .claims;

        if payload.is_expired_at(self.clock.now()) {
            debug!(token_id = %payload.id, "Rejected expired credential");
            return Err(TokenError::Expired);
        }

        Ok(payload)
    }
}

/// Split `header.claims.signature` into the signed message and signature
fn split_compact(token: &str) -> Result<(&str, &str), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();

    if segments.len() != 3 {
        return Err(TokenError::MalformedCredential(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let is_base64url = |s: &str| {
        !s.is_empty()
            && s
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    };

    if !segments.iter().all(|s| is_base64url(s)) {
        return Err(TokenError::MalformedCredential(
            "segments must be non-empty base64url".to_string(),
        ));
    }

    let signature_start = segments[0].len() + segments[1].len() + 1;
    Ok((&token[..signature_start], segments[2]))
}

/// JWK key structure (includes private key components)
#[derive(Debug, Clone, Deserialize)]
struct JwkKey {
    /// Key type (RSA, oct)
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    /// RSA modulus
    n: Option<String>,
    /// RSA public exponent
    e: Option<String>,
    /// RSA private exponent
    d: Option<String>,
    /// RSA prime factors
    p: Option<String>,
    q: Option<String>,
    /// Symmetric key value
    k: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwks {
    keys: Vec<JwkKey>,
}

fn build_rsa_private_key(key: &JwkKey) -> Result<RsaPrivateKey, DomainError> {
    let required = |value: &Option<String>, field: &str| {
        value
            .as_deref()
            .ok_or_else(|| DomainError::configuration(format!("RSA key missing '{}'", field)))
            .and_then(|v| decode_base64url(v, field))
            .map(|bytes| BigUint::from_bytes_be(&bytes))
    };

    let n = required(&key.n, "n")?;
    let e = required(&key.e, "e")?;
    let d = required(&key.d, "d")?;

    let primes = match (&key.p, &key.q) {
        (Some(_), Some(_)) => vec![required(&key.p, "p")?, required(&key.q, "q")?],
        _ => vec![],
    };

    RsaPrivateKey::from_components(n, e, d, primes)
        .map_err(|e| DomainError::configuration(format!("Invalid RSA key components: {}", e)))
}

fn decode_base64url(s: &str, field: &str) -> Result<Vec<u8>, DomainError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| DomainError::configuration(format!("Invalid base64url in '{}': {}", field, e)))
}
