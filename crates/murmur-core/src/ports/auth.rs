//! Authentication and authorization ports.

use serde::{Deserialize, Serialize};

/// Which half of a session a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims stored in JWT tokens.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub user_id: i64,
    pub kind: TokenKind,
    pub issued_at: i64,
    pub exp: i64,
}

/// Token service trait for JWT operations.
pub trait TokenService: Send + Sync {
    /// Mint a token of the given kind for a user.
    fn generate_token(&self, user_id: i64, kind: TokenKind) -> Result<String, AuthError>;

    /// Verify signature, expiry and issuer, then require the token to be of `expected` kind.
    fn validate_token(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AuthError>;

    /// Lifetime of freshly minted tokens of this kind.
    fn expiration_seconds(&self, kind: TokenKind) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Expected a {expected:?} token")]
    WrongTokenKind { expected: TokenKind },

    #[error("Hashing error: {0}")]
    HashingError(String),
}
