//! Admin authentication: password login exchanged for a signed HS256 token.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::EcommerceError;

pub const ADMIN_COOKIE: &str = "admin_token";
const SUBJECT: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct AdminAuth {
    password_digest: [u8; 32],
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    ttl_secs: u64,
}

impl std::fmt::Debug for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAuth").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl AdminAuth {
    pub fn new(password: &str, secret: &str, ttl_secs: u64) -> Self {
        Self {
            password_digest: Sha256::digest(password.as_bytes()).into(),
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 { self.ttl_secs }

    /// Issues a token for a correct password.
    pub fn login(&self, password: &str) -> Result<String, EcommerceError> {
        let candidate: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        if password.is_empty() || candidate != self.password_digest {
            warn!("Rejected admin login attempt");
            return Err(EcommerceError::Unauthorized);
        }
        let now = Utc::now().timestamp();
        let claims = Claims { sub: SUBJECT.into(), iat: now, exp: now + self.ttl_secs as i64 };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| EcommerceError::Storage(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, EcommerceError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| EcommerceError::Unauthorized)?;
        if data.claims.sub != SUBJECT { return Err(EcommerceError::Unauthorized); }
        Ok(data.claims)
    }
}
