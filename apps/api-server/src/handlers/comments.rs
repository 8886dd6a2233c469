//! Comment handlers.

use actix_web::{HttpResponse, web};

use murmur_core::domain::{Comment, LikeTarget};
use murmur_shared::ApiResponse;
use murmur_shared::dto::{
    CommentResponse, CreateCommentRequest, LikeCountResponse, PageQuery, UpdateContentRequest,
};

use super::posts::liker_response;
use super::{page_request, paginated};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn comment_response(comment: Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.user_id,
        content: comment.content,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

/// POST /api/v1/comments
pub async fn create_comment(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let post_id = req
        .post_id
        .ok_or_else(|| AppError::BadRequest("post_id is required".to_string()))?;
    let content = req.content.unwrap_or_default();

    let comment = state
        .content
        .create_comment(identity.user_id, post_id, &content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        comment_response(comment),
        "Comment created",
    )))
}

/// PUT /api/v1/comments/{id}
pub async fn update_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
    body: web::Json<UpdateContentRequest>,
) -> AppResult<HttpResponse> {
    let content = body.into_inner().content.unwrap_or_default();
    let comment = state
        .content
        .update_comment(identity.user_id, path.into_inner(), &content)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        comment_response(comment),
        "Comment updated",
    )))
}

/// DELETE /api/v1/comments/{id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    state
        .content
        .delete_comment(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Comment deleted")))
}

/// POST /api/v1/comments/{id}/like
pub async fn like_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let likes = state
        .engagement
        .like(identity.user_id, LikeTarget::comment(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeCountResponse { likes })))
}

/// DELETE /api/v1/comments/{id}/unlike
pub async fn unlike_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i64>,
) -> AppResult<HttpResponse> {
    let likes = state
        .engagement
        .unlike(identity.user_id, LikeTarget::comment(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(LikeCountResponse { likes })))
}

/// GET /api/v1/comments/{id}/like
pub async fn comment_likers(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = page_request(&query)?;
    let page = state
        .engagement
        .likers(LikeTarget::comment(path.into_inner()), request)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(paginated(page, liker_response))))
}
