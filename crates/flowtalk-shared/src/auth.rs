//! Session tokens and password hashing.
//!
//! A session token is a MAC-signed claim `{user_id, username, expires_at}`
//! presented as a bearer header or cookie. The MAC key is derived from the
//! `JWT_SECRET` environment value with a BLAKE3 KDF; verification is
//! constant-time and expiry is checked after the signature.
//!
//! Passwords are stored as `hex(salt)$hex(hash)` where the hash is a salted
//! BLAKE3 derive-key of the password.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::constants::{KDF_CONTEXT_PASSWORD, KDF_CONTEXT_TOKEN_MAC, TOKEN_TTL_DAYS};
use crate::error::AuthError;
use crate::types::UserId;

const SALT_SIZE: usize = 16;

/// The claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Key material for signing and verifying session tokens.
#[derive(Clone)]
pub struct TokenKey {
    key: [u8; 32],
}

impl TokenKey {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: blake3::derive_key(KDF_CONTEXT_TOKEN_MAC, secret.as_bytes()),
        }
    }

    /// Issue a token for `user_id`/`username` valid for [`TOKEN_TTL_DAYS`].
    pub fn issue(&self, user_id: UserId, username: &str) -> String {
        self.issue_until(user_id, username, Utc::now() + Duration::days(TOKEN_TTL_DAYS))
    }

    pub fn issue_until(
        &self,
        user_id: UserId,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> String {
        let claims = TokenClaims {
            user_id,
            username: username.to_string(),
            expires_at,
        };
        // Claims are a fixed shape we just built; serialization cannot fail.
        let payload = serde_json::to_vec(&claims).expect("claims serialize");
        let mac = blake3::keyed_hash(&self.key, &payload);
        format!("{}.{}", hex::encode(&payload), hex::encode(mac.as_bytes()))
    }

    /// Verify a token and return its claims.
    ///
    /// The signature is checked in constant time before the expiry, so a
    /// forged token learns nothing from timing.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let (payload_hex, mac_hex) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let payload = hex::decode(payload_hex).map_err(|_| AuthError::Malformed)?;
        let presented = hex::decode(mac_hex).map_err(|_| AuthError::Malformed)?;

        let expected = blake3::keyed_hash(&self.key, &payload);
        let expected = expected.as_bytes();
        if presented.len() != expected.len()
            || presented.as_slice().ct_eq(expected).unwrap_u8() != 1
        {
            return Err(AuthError::BadSignature);
        }

        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;
        if Utc::now() > claims.expires_at {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let hash = password_digest(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(hash))
}

/// Check a password against a stored `hex(salt)$hex(hash)` record.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let actual = password_digest(&salt, password);
    expected.len() == actual.len() && expected.as_slice().ct_eq(&actual).unwrap_u8() == 1
}

fn password_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_PASSWORD);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let hash = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash.as_bytes()[..32]);
    out
}
