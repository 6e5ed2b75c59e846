//! Signed identity-claims tokens.
//!
//! The backend is the only source of user records; this module signs a
//! compact claims token from a trusted backend response so later requests
//! can read the identity without another backend round trip. Tokens are
//! HS256 only and verification fails closed.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::backend::UserRecord;

/// Claims token lifetime: 5 days, matching the refresh credential window.
pub const CLAIMS_TOKEN_DURATION_SECS: u64 = 5 * 24 * 60 * 60;

/// Identity claims embedded in the session cookie.
///
/// Field names are camelCase on the wire to match the backend's user
/// record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signs and verifies identity-claims tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a claims token for a user record returned by the backend.
    pub fn encode(&self, user: &UserRecord) -> Result<String, CodecError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| CodecError::TimeError)?
            .as_secs();

        let claims = IdentityClaims {
            user_id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            is_admin: user.is_admin,
            is_verified: user.is_verified,
            iat: now,
            exp: now + CLAIMS_TOKEN_DURATION_SECS,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(CodecError::Encoding)
    }

    /// Verify and decode a claims token.
    ///
    /// The signature is checked before any field is trusted. Only HS256 is
    /// accepted, so a token re-signed under a different algorithm is
    /// rejected outright.
    pub fn decode(&self, token: &str) -> Result<IdentityClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding_key, &validation)
                .map_err(|e| match e.kind() {
                    jsonwebtoken::errors::ErrorKind::InvalidSignature
                    | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                        CodecError::InvalidSignature
                    }
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => CodecError::Expired,
                    _ => CodecError::Malformed,
                })?;

        Ok(token_data.claims)
    }
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum CodecError {
    /// Error signing the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature does not verify under our key and algorithm
    InvalidSignature,
    /// Token has expired
    Expired,
    /// Token is not a well-formed JWT or has unexpected claims
    Malformed,
    /// System time error
    TimeError,
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Encoding(e) => write!(f, "Failed to sign token: {}", e),
            CodecError::InvalidSignature => write!(f, "Token signature verification failed"),
            CodecError::Expired => write!(f, "Token has expired"),
            CodecError::Malformed => write!(f, "Token is malformed"),
            CodecError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for CodecError {}
