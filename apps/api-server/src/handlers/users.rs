//! Profile and social graph handlers.

use actix_web::{HttpResponse, web};

use murmur_core::domain::ProfileChanges;
use murmur_shared::ApiResponse;
use murmur_shared::dto::{IsFollowingResponse, PageQuery, UpdateProfileRequest};

use super::auth::user_response;
use super::{page_request, paginated};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/user/me
pub async fn get_me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state.profile.me(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user_response(user))))
}

/// PUT /api/v1/user/me
pub async fn update_me(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = ProfileChanges {
        username: req.username,
        email: req.email,
        full_name: req.full_name,
        description: req.description,
        avatar_url: req.avatar_url,
    };

    let user = state.profile.update_me(identity.user_id, changes).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        user_response(user),
        "Profile updated",
    )))
}

/// GET /api/v1/user/{id}
pub async fn get_user(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let profile = state
        .profile
        .public_profile(path.into_inner(), viewer.0)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(profile)))
}

/// POST /api/v1/user/{id}/follow
pub async fn follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    state.graph.follow(identity.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Followed successfully")))
}

/// DELETE /api/v1/user/{id}/unfollow
pub async fn unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    state
        .graph
        .unfollow(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Unfollowed successfully")))
}

/// GET /api/v1/user/{id}/following
pub async fn following(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state.graph.following(path.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, |u| u))))
}

/// GET /api/v1/user/{id}/follower
pub async fn followers(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state.graph.followers(path.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, |u| u))))
}

/// GET /api/v1/user/{id}/follows/stat
pub async fn follow_stats(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let stats = state.graph.stats(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

/// GET /api/v1/user/{id}/is_following
pub async fn is_following(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let is_following = state
        .graph
        .is_following(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(IsFollowingResponse { is_following })))
}
