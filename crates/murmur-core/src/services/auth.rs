//! Session/token issuer: registration, login, refresh and logout.

use std::sync::Arc;

use crate::domain::{NewUser, User, validation};
use crate::error::{DomainError, DomainResult, RepoError};
use crate::ports::{AuthError, PasswordService, TokenClaims, TokenKind, TokenService, UserRepository};

/// Raw registration input; every field is required.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A signed token with its lifetime in seconds.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

/// Tokens handed out on login.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub user_id: i64,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Create an account. No token is issued; the caller logs in separately.
    pub async fn register(&self, input: Registration) -> DomainResult<User> {
        let (Ok(username), Ok(email), Ok(password)) = (
            validation::required("username", input.username.as_deref()),
            validation::required("email", input.email.as_deref()),
            validation::required("password", input.password.as_deref()),
        ) else {
            return Err(DomainError::validation("All fields are required"));
        };

        validation::username(username)?;
        validation::email(email)?;
        validation::password(password)?;

        if self.users.find_by_username(username).await?.is_some()
            || self.users.find_by_email(email).await?.is_some()
        {
            return Err(DomainError::conflict("Username or email already exists"));
        }

        let password_hash = self.passwords.hash(password).map_err(internal)?;

        let user = self
            .users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration.
                RepoError::Constraint(_) => {
                    DomainError::conflict("Username or email already exists")
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Check credentials and mint an access/refresh pair.
    pub async fn login(
        &self,
        identifier: Option<&str>,
        password: Option<&str>,
    ) -> DomainResult<SessionTokens> {
        let (Ok(identifier), Ok(password)) = (
            validation::required("username", identifier),
            validation::required("password", password),
        ) else {
            return Err(DomainError::validation("Username and password required"));
        };

        let user = self
            .users
            .find_by_login(identifier)
            .await?
            .ok_or(DomainError::Unauthorized)?;

        if !self
            .passwords
            .verify(password, &user.password_hash)
            .map_err(internal)?
        {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(DomainError::Unauthorized);
        }

        let access = self.issue(user.id, TokenKind::Access)?;
        let refresh = self.issue(user.id, TokenKind::Refresh)?;

        Ok(SessionTokens {
            user_id: user.id,
            access,
            refresh,
        })
    }

    /// Mint a new access token from a live refresh token. The refresh token is not rotated.
    pub fn refresh(&self, refresh_token: &str) -> DomainResult<IssuedToken> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        self.issue(claims.user_id, TokenKind::Access)
    }

    /// Validate the refresh token being discarded. Access tokens stay valid until they expire.
    pub fn logout(&self, refresh_token: &str) -> DomainResult<i64> {
        let claims = self.verify(refresh_token, TokenKind::Refresh)?;
        tracing::info!(user_id = claims.user_id, "User logged out");
        Ok(claims.user_id)
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> DomainResult<TokenClaims> {
        self.tokens.validate_token(token, kind).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            DomainError::Unauthorized
        })
    }

    fn issue(&self, user_id: i64, kind: TokenKind) -> DomainResult<IssuedToken> {
        let token = self.tokens.generate_token(user_id, kind).map_err(internal)?;
        Ok(IssuedToken {
            token,
            expires_in: self.tokens.expiration_seconds(kind),
        })
    }
}

fn internal(err: AuthError) -> DomainError {
    DomainError::Internal(err.to_string())
}
