use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::categories::repo::{CategoriesRepo, InMemoryCategoriesRepo, PgCategoriesRepo};
use crate::config::{AppConfig, JwtConfig};
use crate::news::repo::{InMemoryNewsRepo, NewsRepo, PgNewsRepo};
use crate::users::repo::{InMemoryUsersRepo, PgUsersRepo, UsersRepo};

/// Composition root. Use cases only see the port traits; which backend sits
/// behind them is decided here.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UsersRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub news: Arc<dyn NewsRepo>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        Ok(Self::from_pool(db, config))
    }

    pub fn from_pool(db: PgPool, config: Arc<AppConfig>) -> Self {
        Self {
            users: Arc::new(PgUsersRepo::new(db.clone())),
            categories: Arc::new(PgCategoriesRepo::new(db.clone())),
            news: Arc::new(PgNewsRepo::new(db)),
            config,
        }
    }

    /// In-memory backends with a test config. No database involved.
    pub fn in_memory() -> Self {
        let categories = Arc::new(InMemoryCategoriesRepo::new());
        let users = Arc::new(InMemoryUsersRepo::new(Arc::clone(&categories)));
        let news = Arc::new(InMemoryNewsRepo::new(Arc::clone(&categories)));

        let config = Arc::new(AppConfig {
            database_url: String::new(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
        });

        Self {
            users,
            categories: categories as Arc<dyn CategoriesRepo>,
            news,
            config,
        }
    }
}
