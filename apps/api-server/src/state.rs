//! Application state - shared across all handlers.

use std::sync::Arc;

use murmur_core::ports::MediaUploader;
use murmur_core::services::{
    AuthService, ContentService, EngagementService, FeedService, GraphService, ProfileService,
    Repositories,
};
use murmur_infra::{
    Argon2PasswordService, InMemoryMediaUploader, InMemoryStore, JwtConfig, JwtTokenService,
    LocalMediaUploader,
};

#[cfg(feature = "postgres")]
use murmur_infra::DatabaseConnections;
#[cfg(feature = "remote-media")]
use murmur_infra::{HttpMediaConfig, HttpMediaUploader};

use crate::config::{AppConfig, MediaBackend};

/// Refresh-cookie attributes derived from configuration.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_seconds: i64,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub profile: Arc<ProfileService>,
    pub content: Arc<ContentService>,
    pub engagement: Arc<EngagementService>,
    pub feed: Arc<FeedService>,
    pub graph: Arc<GraphService>,
    pub cookie: CookieSettings,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = Self::repositories(config).await;
        let media = Self::media(&config.media);

        let state = Self::assemble(
            repos,
            media,
            config.jwt.clone(),
            config.cookie_secure,
            config.excerpt_length,
        );
        tracing::info!("Application state initialized");
        state
    }

    /// Wire services over the given adapters.
    pub fn assemble(
        repos: Repositories,
        media: Arc<dyn MediaUploader>,
        jwt: JwtConfig,
        cookie_secure: bool,
        excerpt_length: usize,
    ) -> Self {
        let cookie = CookieSettings {
            secure: cookie_secure,
            max_age_seconds: jwt.refresh_ttl_days * 24 * 60 * 60,
        };
        let tokens = Arc::new(JwtTokenService::new(jwt));
        let passwords = Arc::new(Argon2PasswordService::new());

        Self {
            auth: Arc::new(AuthService::new(repos.users.clone(), passwords, tokens)),
            profile: Arc::new(ProfileService::new(&repos)),
            content: Arc::new(ContentService::new(&repos, media)),
            engagement: Arc::new(EngagementService::new(&repos)),
            feed: Arc::new(FeedService::new(&repos).with_excerpt_length(excerpt_length)),
            graph: Arc::new(GraphService::new(&repos)),
            cookie,
        }
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Arc::new(InMemoryStore::new()).repositories();
        };

        match DatabaseConnections::init(db_config).await {
            Ok(connections) => connections.repositories(),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Arc::new(InMemoryStore::new()).repositories()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Arc::new(InMemoryStore::new()).repositories()
    }

    fn media(backend: &MediaBackend) -> Arc<dyn MediaUploader> {
        match backend {
            MediaBackend::Local { dir, public_url } => {
                tracing::info!(dir = %dir.display(), "Storing images on local disk");
                Arc::new(LocalMediaUploader::new(dir.clone(), public_url.clone()))
            }
            #[cfg(feature = "remote-media")]
            MediaBackend::Http {
                upload_endpoint,
                public_url,
                auth_token,
            } => Arc::new(HttpMediaUploader::new(HttpMediaConfig {
                upload_endpoint: upload_endpoint.clone(),
                public_base_url: public_url.clone(),
                auth_token: auth_token.clone(),
            })),
            #[cfg(not(feature = "remote-media"))]
            MediaBackend::Http { .. } => {
                tracing::warn!("Built without remote-media feature; keeping images in memory");
                Arc::new(InMemoryMediaUploader::new())
            }
            MediaBackend::Memory => {
                tracing::warn!("Images are kept in memory and lost on restart");
                Arc::new(InMemoryMediaUploader::new())
            }
        }
    }
}
