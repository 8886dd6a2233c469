//! Post, feed and post-like handlers.

use actix_web::{HttpResponse, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use murmur_core::domain::{LikeTarget, Post, UserSummary};
use murmur_shared::ApiResponse;
use murmur_shared::dto::{
    CreatePostRequest, LikeCountResponse, LikerResponse, PageQuery, PostResponse,
    UpdateContentRequest,
};

use super::{page_request, paginated};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub(super) fn post_response(post: Post, images: Vec<String>) -> PostResponse {
    PostResponse {
        id: post.id,
        user_id: post.user_id,
        content: post.content,
        images,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub(super) fn liker_response(user: UserSummary) -> LikerResponse {
    LikerResponse {
        user_id: user.id,
        username: user.username,
        full_name: user.full_name,
    }
}

/// Accepts plain base64 as well as `data:image/...;base64,` URLs.
fn decode_image(idx: usize, encoded: &str) -> AppResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|_| AppError::BadRequest(format!("image {} is not valid base64", idx + 1)))
}

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let images = req
        .images
        .iter()
        .enumerate()
        .map(|(idx, encoded)| decode_image(idx, encoded))
        .collect::<AppResult<Vec<_>>>()?;

    let content = req.content.unwrap_or_default();
    let post = state
        .content
        .create_post(identity.user_id, &content, images)
        .await?;

    // Read back through the feed so the response carries the stored image URLs.
    let view = state.feed.get_post(post.id, Some(identity.user_id)).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        post_response(post, view.images),
        "Post created",
    )))
}

/// GET /api/v1/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state.feed.list_posts(request, viewer.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, |p| p))))
}

/// GET /api/v1/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let view = state.feed.get_post(path.into_inner(), viewer.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

/// PUT /api/v1/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    body: web::Json<UpdateContentRequest>,
) -> AppResult<HttpResponse> {
    let content = body.into_inner().content.unwrap_or_default();
    let post = state
        .content
        .update_post(identity.user_id, path.into_inner(), &content)
        .await?;

    let view = state.feed.get_post(post.id, Some(identity.user_id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(post, view.images),
        "Post updated",
    )))
}

/// DELETE /api/v1/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    state
        .content
        .delete_post(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Post deleted")))
}

/// GET /api/v1/posts/{id}/comments
pub async fn list_comments(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state
        .feed
        .list_comments(path.into_inner(), request, viewer.0)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, |c| c))))
}

/// POST /api/v1/posts/{id}/like
pub async fn like_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let likes = state
        .engagement
        .like(identity.user_id, LikeTarget::post(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeCountResponse { likes })))
}

/// DELETE /api/v1/posts/{id}/unlike
pub async fn unlike_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let likes = state
        .engagement
        .unlike(identity.user_id, LikeTarget::post(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeCountResponse { likes })))
}

/// GET /api/v1/posts/{id}/like
pub async fn post_likers(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state
        .engagement
        .likers(LikeTarget::post(path.into_inner()), request)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, liker_response))))
}
