//! Service behaviour exercised end to end over the in-memory adapters.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::domain::{
    LikeKind, LikeTarget, NewPost, NewUser, Page, PageRequest, ProfileChanges, User, UserSummary,
};
use murmur_core::ports::{
    BaseRepository, FollowRepository, LikeRepository, PostRepository, TokenKind, TokenService,
    UserRepository,
};
use murmur_core::{DomainError, RepoError};
use murmur_core::services::{
    AuthService, ContentService, EngagementService, FeedService, GraphService, ProfileService,
    Registration, Repositories,
};
use murmur_infra::{
    Argon2PasswordService, InMemoryMediaUploader, InMemoryStore, JwtConfig, JwtTokenService,
};

struct Harness {
    repos: Repositories,
    media: Arc<InMemoryMediaUploader>,
    tokens: Arc<JwtTokenService>,
    auth: AuthService,
    profile: ProfileService,
    content: ContentService,
    engagement: EngagementService,
    feed: FeedService,
    graph: GraphService,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let repos = store.repositories();
        let media = Arc::new(InMemoryMediaUploader::new());
        let tokens = Arc::new(JwtTokenService::new(JwtConfig {
            secret: "integration-test-secret".to_string(),
            ..JwtConfig::default()
        }));

        Self {
            auth: AuthService::new(
                repos.users.clone(),
                Arc::new(Argon2PasswordService::new()),
                tokens.clone(),
            ),
            profile: ProfileService::new(&repos),
            content: ContentService::new(&repos, media.clone()),
            engagement: EngagementService::new(&repos),
            feed: FeedService::new(&repos),
            graph: GraphService::new(&repos),
            repos,
            media,
            tokens,
        }
    }

    async fn register(&self, username: &str) -> User {
        self.auth
            .register(Registration {
                username: Some(username.to_string()),
                email: Some(format!("{username}@example.com")),
                password: Some("secret123".to_string()),
            })
            .await
            .unwrap()
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn page(n: u64, per_page: u64) -> PageRequest {
    PageRequest::new(n, per_page).unwrap()
}

#[tokio::test]
async fn test_register_then_login_issues_both_tokens() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    let session = h.auth.login(Some("alice"), Some("secret123")).await.unwrap();
    assert_eq!(session.user_id, alice.id);
    assert!(session.access.expires_in < session.refresh.expires_in);

    let access = h.tokens.validate_token(&session.access.token, TokenKind::Access).unwrap();
    let refresh = h
        .tokens
        .validate_token(&session.refresh.token, TokenKind::Refresh)
        .unwrap();
    assert_eq!(access.user_id, alice.id);
    assert!(access.exp < refresh.exp);
}

#[tokio::test]
async fn test_blank_credentials_are_validation_errors() {
    let h = Harness::new();
    let missing_email = h
        .auth
        .register(Registration {
            username: Some("alice".to_string()),
            email: Some("   ".to_string()),
            password: Some("secret123".to_string()),
        })
        .await;
    assert!(matches!(missing_email, Err(DomainError::Validation(_))));

    assert!(matches!(
        h.auth.login(Some("alice"), Some("  ")).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        h.auth.login(None, Some("secret123")).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_login_by_email_and_bad_password() {
    let h = Harness::new();
    h.register("alice").await;

    assert!(h.auth.login(Some("alice@example.com"), Some("secret123")).await.is_ok());
    assert!(matches!(
        h.auth.login(Some("alice"), Some("wrong-pass1")).await,
        Err(DomainError::Unauthorized)
    ));
    assert!(matches!(
        h.auth.login(Some("nobody"), Some("secret123")).await,
        Err(DomainError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let h = Harness::new();
    h.register("alice").await;

    let dup_name = h
        .auth
        .register(Registration {
            username: Some("alice".to_string()),
            email: Some("other@example.com".to_string()),
            password: Some("secret123".to_string()),
        })
        .await;
    assert!(matches!(dup_name, Err(DomainError::Conflict(_))));

    let dup_email = h
        .auth
        .register(Registration {
            username: Some("alice2".to_string()),
            email: Some("alice@example.com".to_string()),
            password: Some("secret123".to_string()),
        })
        .await;
    assert!(matches!(dup_email, Err(DomainError::Conflict(_))));
}

#[tokio::test]
async fn test_refresh_token_mints_access_and_rejects_access_token() {
    let h = Harness::new();
    h.register("alice").await;
    let session = h.auth.login(Some("alice"), Some("secret123")).await.unwrap();

    let fresh = h.auth.refresh(&session.refresh.token).unwrap();
    assert!(h.auth.verify(&fresh.token, TokenKind::Access).is_ok());

    assert!(matches!(
        h.auth.refresh(&session.access.token),
        Err(DomainError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_profile_update_conflicts_on_taken_username() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    h.register("bob").await;

    let result = h
        .profile
        .update_me(
            alice.id,
            ProfileChanges {
                username: Some("bob".to_string()),
                ..ProfileChanges::default()
            },
        )
        .await;
    assert!(matches!(result, Err(DomainError::Conflict(_))));

    let updated = h
        .profile
        .update_me(
            alice.id,
            ProfileChanges {
                full_name: Some("Alice Liddell".to_string()),
                ..ProfileChanges::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Alice Liddell"));
}

#[tokio::test]
async fn test_alice_post_liked_by_bob() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;

    let post = h.content.create_post(alice.id, "hi", Vec::new()).await.unwrap();
    assert_eq!(h.engagement.like(bob.id, LikeTarget::post(post.id)).await.unwrap(), 1);

    let as_bob = h.feed.list_posts(page(1, 10), Some(bob.id)).await.unwrap();
    assert_eq!(as_bob.total, 1);
    let view = &as_bob.items[0];
    assert_eq!(view.likes, 1);
    assert_eq!(view.comments, 0);
    assert!(view.is_liked);
    assert_eq!(view.author.as_ref().unwrap().username, "alice");

    let as_alice = h.feed.list_posts(page(1, 10), Some(alice.id)).await.unwrap();
    assert!(!as_alice.items[0].is_liked);

    let anonymous = h.feed.list_posts(page(1, 10), None).await.unwrap();
    assert!(!anonymous.items[0].is_liked);
}

#[tokio::test]
async fn test_like_twice_conflicts_and_unlike_restores_count() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let post = h.content.create_post(alice.id, "hi", Vec::new()).await.unwrap();
    let target = LikeTarget::post(post.id);

    h.engagement.like(bob.id, target).await.unwrap();
    assert!(matches!(
        h.engagement.like(bob.id, target).await,
        Err(DomainError::Conflict(_))
    ));

    assert_eq!(h.engagement.unlike(bob.id, target).await.unwrap(), 0);
    assert!(matches!(
        h.engagement.unlike(bob.id, target).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_like_missing_target_is_not_found() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    assert!(matches!(
        h.engagement.like(alice.id, LikeTarget::post(404)).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        h.engagement.like(alice.id, LikeTarget::comment(404)).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_likers_lists_users_who_liked_a_comment() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let post = h.content.create_post(alice.id, "hi", Vec::new()).await.unwrap();
    let comment = h.content.create_comment(bob.id, post.id, "nice").await.unwrap();

    h.engagement.like(alice.id, LikeTarget::comment(comment.id)).await.unwrap();

    let likers = h
        .engagement
        .likers(LikeTarget::comment(comment.id), page(1, 10))
        .await
        .unwrap();
    assert_eq!(likers.total, 1);
    assert_eq!(likers.items[0].username, "alice");

    let comments = h
        .feed
        .list_comments(post.id, page(1, 10), Some(alice.id))
        .await
        .unwrap();
    assert_eq!(comments.items[0].likes, 1);
    assert!(comments.items[0].is_liked);
}

#[tokio::test]
async fn test_feed_pagination_bounds() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    let empty = h.feed.list_posts(page(1, 10), None).await.unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.total_pages, 0);
    assert!(empty.items.is_empty());

    for n in 0..3 {
        h.content
            .create_post(alice.id, &format!("post {n}"), Vec::new())
            .await
            .unwrap();
    }

    let second = h.feed.list_posts(page(2, 2), None).await.unwrap();
    assert_eq!(second.total, 3);
    assert_eq!(second.total_pages, 2);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].content, "post 0");

    assert!(matches!(
        h.feed.list_posts(page(3, 2), None).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_huge_page_numbers_are_rejected_not_overflowed() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let post = h.content.create_post(alice.id, "hello", Vec::new()).await.unwrap();
    h.engagement.like(alice.id, LikeTarget::post(post.id)).await.unwrap();

    assert!(matches!(
        PageRequest::new(u64::MAX, 100),
        Err(DomainError::Validation(_))
    ));

    let last = PageRequest::max_page(100);
    assert!(matches!(
        h.feed.list_posts(page(last, 100), None).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        h.engagement
            .likers(LikeTarget::post(post.id), page(last, 100))
            .await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_feed_truncates_long_content_but_get_post_does_not() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let long = "x".repeat(150);
    let post = h.content.create_post(alice.id, &long, Vec::new()).await.unwrap();

    let listed = h.feed.list_posts(page(1, 10), None).await.unwrap();
    assert_eq!(listed.items[0].content, format!("{}...", "x".repeat(100)));

    let full = h.feed.get_post(post.id, None).await.unwrap();
    assert_eq!(full.content, long);
}

#[tokio::test]
async fn test_post_with_images_attaches_urls() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    let post = h
        .content
        .create_post(alice.id, "pics", vec![png_bytes(), png_bytes()])
        .await
        .unwrap();

    let view = h.feed.get_post(post.id, None).await.unwrap();
    assert_eq!(view.images.len(), 2);
    for url in &view.images {
        assert!(h.media.contains(url).await);
    }
}

#[tokio::test]
async fn test_post_image_rules() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    let too_many = h
        .content
        .create_post(alice.id, "pics", vec![png_bytes(), png_bytes(), png_bytes()])
        .await;
    assert!(matches!(too_many, Err(DomainError::Validation(_))));

    let not_an_image = h
        .content
        .create_post(alice.id, "pics", vec![b"plain text".to_vec()])
        .await;
    assert!(matches!(not_an_image, Err(DomainError::Validation(_))));

    assert_eq!(h.media.stored().await, 0);
}

#[tokio::test]
async fn test_failed_upload_leaves_no_post() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    h.media.fail_uploads(true);

    let result = h.content.create_post(alice.id, "pics", vec![png_bytes()]).await;
    assert!(matches!(result, Err(DomainError::Internal(_))));

    let listed = h.feed.list_posts(page(1, 10), None).await.unwrap();
    assert_eq!(listed.total, 0);
    assert_eq!(h.media.stored().await, 0);
}

#[tokio::test]
async fn test_only_owner_may_edit_or_delete() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let post = h.content.create_post(alice.id, "mine", Vec::new()).await.unwrap();
    let comment = h.content.create_comment(alice.id, post.id, "also mine").await.unwrap();

    assert!(matches!(
        h.content.update_post(bob.id, post.id, "stolen").await,
        Err(DomainError::Forbidden)
    ));
    assert!(matches!(
        h.content.delete_comment(bob.id, comment.id).await,
        Err(DomainError::Forbidden)
    ));

    let edited = h.content.update_post(alice.id, post.id, "edited").await.unwrap();
    assert_eq!(edited.content, "edited");
}

#[tokio::test]
async fn test_deleting_post_removes_comments_and_likes() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let post = h.content.create_post(alice.id, "doomed", Vec::new()).await.unwrap();
    let comment = h.content.create_comment(bob.id, post.id, "rip").await.unwrap();
    h.engagement.like(bob.id, LikeTarget::post(post.id)).await.unwrap();
    h.engagement.like(alice.id, LikeTarget::comment(comment.id)).await.unwrap();

    h.content.delete_post(alice.id, post.id).await.unwrap();

    assert!(h.repos.comments.find_by_id(comment.id).await.unwrap().is_none());
    assert!(matches!(
        h.feed.get_post(post.id, None).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(
        !h.repos
            .likes
            .exists(alice.id, LikeTarget::comment(comment.id))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_comment_on_missing_post_is_not_found() {
    let h = Harness::new();
    let alice = h.register("alice").await;

    assert!(matches!(
        h.content.create_comment(alice.id, 404, "hello").await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_follow_rules() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;

    assert!(matches!(
        h.graph.follow(alice.id, alice.id).await,
        Err(DomainError::Validation(_))
    ));
    assert!(!h.graph.is_following(alice.id, alice.id).await.unwrap());

    h.graph.follow(alice.id, bob.id).await.unwrap();
    assert!(matches!(
        h.graph.follow(alice.id, bob.id).await,
        Err(DomainError::Conflict(_))
    ));
    assert!(h.graph.is_following(alice.id, bob.id).await.unwrap());
    assert!(!h.graph.is_following(bob.id, alice.id).await.unwrap());

    let stats = h.graph.stats(bob.id).await.unwrap();
    assert_eq!(stats.followers, 1);
    assert_eq!(stats.following, 0);

    let followers = h.graph.followers(bob.id, page(1, 10)).await.unwrap();
    assert_eq!(followers.items[0].username, "alice");

    h.graph.unfollow(alice.id, bob.id).await.unwrap();
    assert!(!h.graph.is_following(alice.id, bob.id).await.unwrap());
    assert!(matches!(
        h.graph.unfollow(alice.id, bob.id).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_public_profile_reports_viewer_relationship() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    h.graph.follow(bob.id, alice.id).await.unwrap();

    let seen_by_bob = h.profile.public_profile(alice.id, Some(bob.id)).await.unwrap();
    assert_eq!(seen_by_bob.is_following, Some(true));
    assert_eq!(seen_by_bob.stats.followers, 1);

    let anonymous = h.profile.public_profile(alice.id, None).await.unwrap();
    assert_eq!(anonymous.is_following, None);

    assert!(matches!(
        h.profile.public_profile(999, None).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_likes_leave_one_row() {
    let h = Harness::new();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let post = h.content.create_post(alice.id, "race me", Vec::new()).await.unwrap();
    let target = LikeTarget::post(post.id);
    let bob_id = bob.id;

    let engagement = Arc::new(EngagementService::new(&h.repos));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engagement = engagement.clone();
            tokio::spawn(async move { engagement.like(bob_id, target).await })
        })
        .collect();

    let (mut ok, mut conflict) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(likes) => {
                assert_eq!(likes, 1);
                ok += 1;
            }
            Err(DomainError::Conflict(_)) => conflict += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!((ok, conflict), (1, 7));

    let counts = h.repos.likes.count_by_target(LikeKind::Post, &[post.id]).await.unwrap();
    assert_eq!(counts.get(&post.id), Some(&1));
}

/// Like storage whose existence check always misses, as when another request
/// inserts between the check and the write.
struct StaleLikes(Arc<InMemoryStore>);

#[async_trait]
impl LikeRepository for StaleLikes {
    async fn add(&self, user_id: i64, target: LikeTarget) -> Result<(), RepoError> {
        LikeRepository::add(&*self.0, user_id, target).await
    }

    async fn remove(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError> {
        LikeRepository::remove(&*self.0, user_id, target).await
    }

    async fn exists(&self, _user_id: i64, _target: LikeTarget) -> Result<bool, RepoError> {
        Ok(false)
    }

    async fn count_by_target(
        &self,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, u64>, RepoError> {
        self.0.count_by_target(kind, ids).await
    }

    async fn liked_by(
        &self,
        user_id: i64,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashSet<i64>, RepoError> {
        self.0.liked_by(user_id, kind, ids).await
    }

    async fn likers(
        &self,
        target: LikeTarget,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.0.likers(target, request).await
    }
}

/// Follow storage with the same stale existence check.
struct StaleFollows(Arc<InMemoryStore>);

#[async_trait]
impl FollowRepository for StaleFollows {
    async fn add(&self, follower_id: i64, followee_id: i64) -> Result<(), RepoError> {
        FollowRepository::add(&*self.0, follower_id, followee_id).await
    }

    async fn remove(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError> {
        FollowRepository::remove(&*self.0, follower_id, followee_id).await
    }

    async fn exists(&self, _follower_id: i64, _followee_id: i64) -> Result<bool, RepoError> {
        Ok(false)
    }

    async fn following(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.0.following(user_id, request).await
    }

    async fn followers(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.0.followers(user_id, request).await
    }

    async fn count_followers(&self, user_id: i64) -> Result<u64, RepoError> {
        self.0.count_followers(user_id).await
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        self.0.count_following(user_id).await
    }
}

#[tokio::test]
async fn test_unique_violation_on_write_is_conflict() {
    let store = Arc::new(InMemoryStore::new());
    let mut repos = store.repositories();
    repos.likes = Arc::new(StaleLikes(store.clone()));
    repos.follows = Arc::new(StaleFollows(store.clone()));

    let mut users = Vec::new();
    for name in ["alice", "bob"] {
        let user = repos
            .users
            .create(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        users.push(user);
    }
    let (alice, bob) = (&users[0], &users[1]);
    let post = repos
        .posts
        .create(
            NewPost {
                user_id: alice.id,
                content: "hello".to_string(),
            },
            Vec::new(),
        )
        .await
        .unwrap();

    let engagement = EngagementService::new(&repos);
    let target = LikeTarget::post(post.id);
    assert_eq!(engagement.like(bob.id, target).await.unwrap(), 1);
    assert!(matches!(
        engagement.like(bob.id, target).await,
        Err(DomainError::Conflict(_))
    ));

    let graph = GraphService::new(&repos);
    graph.follow(bob.id, alice.id).await.unwrap();
    assert!(matches!(
        graph.follow(bob.id, alice.id).await,
        Err(DomainError::Conflict(_))
    ));
    assert_eq!(graph.stats(alice.id).await.unwrap().followers, 1);
}
