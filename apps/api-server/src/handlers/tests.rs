use std::io::Cursor;
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use murmur_core::domain::DEFAULT_PER_PAGE;
use murmur_infra::{InMemoryMediaUploader, InMemoryStore, JwtConfig, LocalMediaUploader};

use super::{configure_media, configure_routes};
use crate::config::MediaMount;
use crate::middleware::auth::REFRESH_COOKIE;
use crate::observability::{REQUEST_ID_HEADER, RequestIdMiddleware};
use crate::state::AppState;

fn test_state() -> AppState {
    let repos = Arc::new(InMemoryStore::new()).repositories();
    AppState::assemble(
        repos,
        Arc::new(InMemoryMediaUploader::new()),
        JwtConfig {
            secret: "http-test-secret".to_string(),
            ..JwtConfig::default()
        },
        false,
        100,
    )
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new(test_state()))
                .configure(configure_routes),
        )
        .await
    };
}

/// Registers `username` and logs in, yielding `(access_token, refresh_token)`.
macro_rules! sign_in {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": "secret123",
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({"username": $username, "password": "secret123"}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let refresh = resp
            .response()
            .cookies()
            .find(|c| c.name() == REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap();
        let body: Value = test::read_body_json(resp).await;
        let access = body["data"]["access_token"].as_str().unwrap().to_string();
        (access, refresh)
    }};
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

fn png_base64() -> String {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    STANDARD.encode(buf.into_inner())
}

#[actix_web::test]
async fn test_health_check() {
    let app = app!();
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_request_id_is_echoed() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/api/health")
        .insert_header((REQUEST_ID_HEADER, "abc-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(REQUEST_ID_HEADER).unwrap(), "abc-123");
}

#[actix_web::test]
async fn test_duplicate_registration_is_conflict_envelope() {
    let app = app!();
    let _ = sign_in!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "fresh@example.com",
            "password": "secret123",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Username or email already exists");
}

#[actix_web::test]
async fn test_register_requires_all_fields() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"username": "alice"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_login_sets_refresh_cookie() {
    let app = app!();
    sign_in!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"username": "alice@example.com", "password": "secret123"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == REFRESH_COOKIE)
        .unwrap();
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/api/v1/auth"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 15 * 60);
    assert!(body["data"].get("refresh_token").is_none());
}

#[actix_web::test]
async fn test_mandatory_gate() {
    let app = app!();
    let (access, refresh) = sign_in!(app, "alice");

    let req = test::TestRequest::get().uri("/api/v1/user/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");

    // A refresh token is not an access token.
    let req = test::TestRequest::get()
        .uri("/api/v1/user/me")
        .insert_header(bearer(&refresh))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/user/me")
        .insert_header(bearer(&access))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["email"], "alice@example.com");
}

#[actix_web::test]
async fn test_refresh_gate() {
    let app = app!();
    let (access, refresh) = sign_in!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .insert_header(bearer(&access))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(Cookie::new(REFRESH_COOKIE, access.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(Cookie::new(REFRESH_COOKIE, refresh))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let fresh = body["data"]["access_token"].as_str().unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/user/me")
        .insert_header(bearer(fresh))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let app = app!();
    let (_, refresh) = sign_in!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .cookie(Cookie::new(REFRESH_COOKIE, refresh))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == REFRESH_COOKIE)
        .unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
}

#[actix_web::test]
async fn test_feed_personalisation() {
    let app = app!();
    let (alice, _) = sign_in!(app, "alice");
    let (bob, _) = sign_in!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "hi"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/posts/{post_id}/like"))
        .insert_header(bearer(&bob))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["likes"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(bearer(&bob))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], 1);
    let item = &body["data"]["items"][0];
    assert_eq!(item["likes"], 1);
    assert_eq!(item["comments"], 0);
    assert_eq!(item["is_liked"], true);
    assert_eq!(item["author"]["username"], "alice");

    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["is_liked"], false);

    // Optional gate: a bad token reads as anonymous.
    let req = test::TestRequest::get()
        .uri("/api/v1/posts")
        .insert_header(bearer("not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["items"][0]["is_liked"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}/like"))
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["username"], "bob");
    assert!(body["data"]["items"][0]["user_id"].is_i64());
}

#[actix_web::test]
async fn test_pagination_errors() {
    let app = app!();

    let req = test::TestRequest::get().uri("/api/v1/posts?page=1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["per_page"], DEFAULT_PER_PAGE);

    let req = test::TestRequest::get().uri("/api/v1/posts?page=abc").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");

    let req = test::TestRequest::get().uri("/api/v1/posts?limit=0").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts?page=18446744073709551615&limit=100")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");

    let (alice, _) = sign_in!(app, "alice");
    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "only one"}))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/v1/posts?page=2").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_create_post_with_image() {
    let app = app!();
    let (alice, _) = sign_in!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "look", "images": [png_base64()]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);
    let post_id = body["data"]["id"].as_i64().unwrap();
    let image_url = body["data"]["images"][0].clone();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "edited"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["content"], "edited");
    assert_eq!(body["data"]["images"], json!([image_url]));

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "look", "images": ["%%%"]}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_local_image_urls_resolve() {
    let dir = std::env::temp_dir().join(format!("murmur-served-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let mount = MediaMount {
        path: "/media".to_string(),
        dir: dir.clone(),
    };
    let state = AppState::assemble(
        Arc::new(InMemoryStore::new()).repositories(),
        Arc::new(LocalMediaUploader::new(&dir, "/media")),
        JwtConfig {
            secret: "http-test-secret".to_string(),
            ..JwtConfig::default()
        },
        false,
        100,
    );
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(configure_routes)
            .configure(|cfg| configure_media(cfg, Some(&mount))),
    )
    .await;
    let (alice, _) = sign_in!(app, "alice");

    let encoded = png_base64();
    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "served", "images": [encoded.clone()]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let url = body["data"]["images"][0].as_str().unwrap().to_string();
    assert!(url.starts_with("/media/posts/"));

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let served = test::read_body(resp).await;
    assert_eq!(served.as_ref(), STANDARD.decode(encoded).unwrap().as_slice());

    let _ = std::fs::remove_dir_all(&dir);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "error");
}

#[actix_web::test]
async fn test_non_owner_cannot_delete_post() {
    let app = app!();
    let (alice, _) = sign_in!(app, "alice");
    let (bob, _) = sign_in!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(bearer(&alice))
        .set_json(json!({"content": "mine"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let post_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .insert_header(bearer(&bob))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts/abc")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_follow_endpoints() {
    let app = app!();
    let (alice, _) = sign_in!(app, "alice");
    let (_bob, _) = sign_in!(app, "bob");

    let req = test::TestRequest::get()
        .uri("/api/v1/user/me")
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let alice_id = body["data"]["id"].as_i64().unwrap();
    let bob_id = alice_id + 1;

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/user/{alice_id}/follow"))
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/user/{bob_id}/follow"))
        .insert_header(bearer(&alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/user/{bob_id}/is_following"))
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["is_following"], true);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/user/{bob_id}/follows/stat"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["followers"], 1);
    assert_eq!(body["data"]["following"], 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/user/{bob_id}/follower"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["username"], "alice");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/user/{bob_id}"))
        .insert_header(bearer(&alice))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["is_following"], true);
}
