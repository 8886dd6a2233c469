//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use murmur_core::domain::DEFAULT_EXCERPT_LENGTH;
use murmur_infra::JwtConfig;
use murmur_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    /// `Secure` attribute on the refresh cookie; only disable for plain-HTTP development.
    pub cookie_secure: bool,
    pub media: MediaBackend,
    pub excerpt_length: usize,
}

/// Where uploaded post images go.
#[derive(Debug, Clone)]
pub enum MediaBackend {
    /// Files under a local directory, served from `public_url`.
    Local { dir: PathBuf, public_url: String },
    /// PUT to a remote object store.
    Http {
        upload_endpoint: String,
        public_url: String,
        auth_token: Option<String>,
    },
    Memory,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            config.max_connections = parse_var("DB_MAX_CONNECTIONS").unwrap_or(20);
            config.min_connections = parse_var("DB_MIN_CONNECTIONS").unwrap_or(2);
            config
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            jwt: JwtConfig::from_env(),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            media: MediaBackend::from_env(),
            excerpt_length: parse_var("FEED_EXCERPT_LENGTH")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_EXCERPT_LENGTH),
        }
    }
}

/// A directory of stored images served by this process under `path`.
#[derive(Debug, Clone)]
pub struct MediaMount {
    pub path: String,
    pub dir: PathBuf,
}

impl MediaBackend {
    /// The route serving local images, when their public URL points back at this server.
    pub fn local_mount(&self) -> Option<MediaMount> {
        match self {
            MediaBackend::Local { dir, public_url } if public_url.starts_with('/') => {
                Some(MediaMount {
                    path: public_url.trim_end_matches('/').to_string(),
                    dir: dir.clone(),
                })
            }
            _ => None,
        }
    }

    fn from_env() -> Self {
        let public_url = env::var("MEDIA_PUBLIC_URL");

        match env::var("MEDIA_BACKEND").as_deref() {
            Ok("http") => match env::var("MEDIA_UPLOAD_ENDPOINT") {
                Ok(upload_endpoint) => MediaBackend::Http {
                    public_url: public_url.unwrap_or_else(|_| upload_endpoint.clone()),
                    upload_endpoint,
                    auth_token: env::var("MEDIA_AUTH_TOKEN").ok(),
                },
                Err(_) => {
                    tracing::warn!("MEDIA_BACKEND=http without MEDIA_UPLOAD_ENDPOINT; keeping images in memory");
                    MediaBackend::Memory
                }
            },
            Ok("memory") => MediaBackend::Memory,
            _ => MediaBackend::Local {
                dir: env::var("MEDIA_LOCAL_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./media")),
                public_url: public_url.unwrap_or_else(|_| "/media".to_string()),
            },
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_relative_local_urls_are_mounted() {
        let local = MediaBackend::Local {
            dir: PathBuf::from("./media"),
            public_url: "/media/".to_string(),
        };
        let mount = local.local_mount().unwrap();
        assert_eq!(mount.path, "/media");
        assert_eq!(mount.dir, PathBuf::from("./media"));

        let cdn = MediaBackend::Local {
            dir: PathBuf::from("./media"),
            public_url: "https://cdn.example.com/media".to_string(),
        };
        assert!(cdn.local_mount().is_none());
        assert!(MediaBackend::Memory.local_mount().is_none());
    }
}
