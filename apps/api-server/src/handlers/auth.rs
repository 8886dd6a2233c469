//! Authentication handlers.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpResponse, web};

use murmur_core::domain::User;
use murmur_core::services::Registration;
use murmur_shared::ApiResponse;
use murmur_shared::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};

use crate::middleware::auth::{REFRESH_COOKIE, RefreshIdentity};
use crate::middleware::error::AppResult;
use crate::observability::RequestId;
use crate::state::{AppState, CookieSettings};

/// Scope the refresh cookie is sent to.
const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

fn refresh_cookie(token: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Strict)
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::seconds(settings.max_age_seconds))
        .finish()
}

fn expired_refresh_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = refresh_cookie(String::new(), settings);
    cookie.make_removal();
    cookie
}

pub(super) fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        full_name: user.full_name,
        description: user.description,
        avatar_url: user.avatar_url,
        created_at: user.created_at,
    }
}

/// POST /api/v1/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = state
        .auth
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        user_response(user),
        "User registered successfully",
    )))
}

/// POST /api/v1/auth/login
pub async fn login(
    state: web::Data<AppState>,
    request_id: RequestId,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let session = state
        .auth
        .login(req.username.as_deref(), req.password.as_deref())
        .await?;

    tracing::info!(
        user_id = session.user_id,
        request_id = %request_id.as_str(),
        "User logged in"
    );

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(session.refresh.token, &state.cookie))
        .json(ApiResponse::ok(AuthResponse::bearer(
            session.access.token,
            session.access.expires_in,
        ))))
}

/// POST /api/v1/auth/refresh - requires the refresh cookie
pub async fn refresh(
    state: web::Data<AppState>,
    identity: RefreshIdentity,
) -> AppResult<HttpResponse> {
    let access = state.auth.refresh(&identity.token)?;
    tracing::debug!(user_id = identity.user_id, "Access token refreshed");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(AuthResponse::bearer(
        access.token,
        access.expires_in,
    ))))
}

/// POST /api/v1/auth/logout - requires the refresh cookie
pub async fn logout(
    state: web::Data<AppState>,
    identity: RefreshIdentity,
) -> AppResult<HttpResponse> {
    state.auth.logout(&identity.token)?;

    Ok(HttpResponse::Ok()
        .cookie(expired_refresh_cookie(&state.cookie))
        .json(ApiResponse::message("Logged out successfully")))
}
