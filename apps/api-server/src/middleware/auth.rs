//! Authorization gate - request extractors resolving the caller's identity.

use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};

use murmur_core::ports::TokenKind;

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// How strictly a route checks credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// A live access token in `Authorization: Bearer` is required.
    Mandatory,
    /// Like `Mandatory`, but any failure resolves to an anonymous caller.
    Optional,
    /// A live refresh token in the refresh cookie is required.
    Refresh,
}

/// Resolve the user id behind the request's credentials.
pub fn authorize(req: &HttpRequest, gate: Gate) -> Result<i64, AppError> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return Err(AppError::Internal("Server configuration error".to_string()));
    };

    let (token, kind) = match gate {
        Gate::Mandatory | Gate::Optional => (bearer_token(req)?, TokenKind::Access),
        Gate::Refresh => {
            let cookie = req.cookie(REFRESH_COOKIE).ok_or(AppError::Unauthorized)?;
            (cookie.value().to_string(), TokenKind::Refresh)
        }
    };

    let claims = state.auth.verify(&token, kind)?;
    Ok(claims.user_id)
}

fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    // Parse "Bearer <token>"
    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)
}

/// Authenticated user identity extractor.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, user {}!", identity.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: i64,
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req, Gate::Mandatory).map(|user_id| Identity { user_id }))
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
#[derive(Debug, Clone, Copy)]
pub struct OptionalIdentity(pub Option<i64>);

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalIdentity(authorize(req, Gate::Optional).ok())))
    }
}

/// Identity proven by the refresh cookie; the raw token is kept for the auth service.
#[derive(Debug, Clone)]
pub struct RefreshIdentity {
    pub user_id: i64,
    pub token: String,
}

impl FromRequest for RefreshIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authorize(req, Gate::Refresh).and_then(|user_id| {
            let token = req
                .cookie(REFRESH_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or(AppError::Unauthorized)?;
            Ok(RefreshIdentity { user_id, token })
        });
        ready(result)
    }
}
