//! Application state - shared across all handlers.

use std::sync::Arc;

use tera::Tera;

use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, MediaStorage, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService, LocalMediaStorage};

#[cfg(feature = "postgres")]
use blogicum_infra::DatabaseConnections;
#[cfg(feature = "postgres")]
use blogicum_infra::database::{
    PostgresCategoryRepository, PostgresCommentRepository, PostgresLocationRepository,
    PostgresPostRepository, PostgresUserRepository,
};

use crate::config::AppConfig;
use crate::observability::RequestMetrics;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub media: Arc<dyn MediaStorage>,
    pub templates: Arc<Tera>,
    pub metrics: Arc<RequestMetrics>,
    pub posts_per_page: u64,
    #[cfg(feature = "postgres")]
    pub db: Option<Arc<DatabaseConnections>>,
}

/// One implementation per repository port.
struct Repositories {
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            users: store.clone(),
            categories: store.clone(),
            locations: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections) -> Self {
        let db = &connections.main;
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            locations: Arc::new(PostgresLocationRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
        }
    }
}

/// Compile every `*.html` template under `dir`.
pub fn load_templates(dir: &str) -> Result<Tera, tera::Error> {
    let tera = Tera::new(&format!("{}/**/*.html", dir.trim_end_matches('/')))?;
    tracing::debug!(
        templates = tera.get_template_names().count(),
        dir = %dir,
        "Templates loaded"
    );
    Ok(tera)
}

impl AppState {
    /// Build the application state. Falls back to the in-memory store when
    /// no database is configured or reachable.
    pub async fn new(config: &AppConfig) -> Result<Self, tera::Error> {
        let templates = Arc::new(load_templates(&config.templates_dir)?);

        #[cfg(feature = "postgres")]
        {
            if let Some(db_config) = &config.database {
                match DatabaseConnections::init(db_config).await {
                    Ok(connections) => {
                        let repos = Repositories::postgres(&connections);
                        let mut state = Self::assemble(config, templates, repos);
                        state.db = Some(Arc::new(connections));
                        tracing::info!("Application state initialized (postgres)");
                        return Ok(state);
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                    }
                }
            } else {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            }
        }

        #[cfg(not(feature = "postgres"))]
        tracing::info!("Running without postgres feature - using in-memory repositories");

        Ok(Self::in_memory(config, templates))
    }

    /// State over a fresh in-memory store.
    pub fn in_memory(config: &AppConfig, templates: Arc<Tera>) -> Self {
        Self::assemble(config, templates, Repositories::in_memory())
    }

    fn assemble(config: &AppConfig, templates: Arc<Tera>, repos: Repositories) -> Self {
        Self {
            users: repos.users,
            categories: repos.categories,
            locations: repos.locations,
            posts: repos.posts,
            comments: repos.comments,
            tokens: Arc::new(JwtTokenService::new(config.jwt.clone())),
            passwords: Arc::new(Argon2PasswordService::new()),
            media: Arc::new(LocalMediaStorage::new(&config.media_root)),
            templates,
            metrics: Arc::new(RequestMetrics::new()),
            posts_per_page: config.posts_per_page,
            #[cfg(feature = "postgres")]
            db: None,
        }
    }
}
