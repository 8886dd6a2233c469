//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod health;
mod posts;
mod users;

#[cfg(test)]
mod tests;

use actix_files::Files;
use actix_web::web;

use murmur_core::domain::{DEFAULT_PER_PAGE, Page, PageRequest};
use murmur_shared::Paginated;
use murmur_shared::dto::PageQuery;

use crate::config::MediaMount;
use crate::middleware::error::{AppResult, json_error, path_error, query_error};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(
            web::scope("/api")
                // Public routes
                .route("/health", web::get().to(health::health_check))
                .service(
                    web::scope("/v1")
                        .service(
                            web::scope("/auth")
                                .route("/register", web::post().to(auth::register))
                                .route("/login", web::post().to(auth::login))
                                .route("/refresh", web::post().to(auth::refresh))
                                .route("/logout", web::post().to(auth::logout)),
                        )
                        .service(
                            web::scope("/user")
                                .route("/me", web::get().to(users::get_me))
                                .route("/me", web::put().to(users::update_me))
                                .route("/{id}", web::get().to(users::get_user))
                                .route("/{id}/follow", web::post().to(users::follow))
                                .route("/{id}/unfollow", web::delete().to(users::unfollow))
                                .route("/{id}/following", web::get().to(users::following))
                                .route("/{id}/follower", web::get().to(users::followers))
                                .route("/{id}/follows/stat", web::get().to(users::follow_stats))
                                .route("/{id}/is_following", web::get().to(users::is_following)),
                        )
                        .service(
                            web::scope("/posts")
                                .route("", web::post().to(posts::create_post))
                                .route("", web::get().to(posts::list_posts))
                                .route("/{id}", web::get().to(posts::get_post))
                                .route("/{id}", web::put().to(posts::update_post))
                                .route("/{id}", web::delete().to(posts::delete_post))
                                .route("/{id}/comments", web::get().to(posts::list_comments))
                                .route("/{id}/like", web::post().to(posts::like_post))
                                .route("/{id}/like", web::get().to(posts::post_likers))
                                .route("/{id}/unlike", web::delete().to(posts::unlike_post)),
                        )
                        .service(
                            web::scope("/comments")
                                .route("", web::post().to(comments::create_comment))
                                .route("/{id}", web::put().to(comments::update_comment))
                                .route("/{id}", web::delete().to(comments::delete_comment))
                                .route("/{id}/like", web::post().to(comments::like_comment))
                                .route("/{id}/like", web::get().to(comments::comment_likers))
                                .route("/{id}/unlike", web::delete().to(comments::unlike_comment)),
                        ),
                ),
        );
}

/// Serve locally stored images, if the media backend keeps them on this host.
pub fn configure_media(cfg: &mut web::ServiceConfig, mount: Option<&MediaMount>) {
    if let Some(mount) = mount {
        cfg.service(Files::new(&mount.path, mount.dir.clone()));
    }
}

/// Validate query parameters into a page request.
fn page_request(query: &PageQuery) -> AppResult<PageRequest> {
    let (page, per_page) = query.resolve(DEFAULT_PER_PAGE);
    Ok(PageRequest::new(page, per_page)?)
}

/// Convert a domain page into the listing payload.
fn paginated<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> Paginated<U> {
    Paginated {
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        total_pages: page.total_pages,
        items: page.items.into_iter().map(f).collect(),
    }
}
