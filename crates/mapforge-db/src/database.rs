use mapforge_core::AppError;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::config::DatabaseConfig;
use crate::project_repository::ProjectRepository;
use crate::search_repository::ProjectSearchRepository;
use crate::user_repository::UserRepository;

/// Embedded schema migrations from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Central database facade — owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL with the given configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// List embedded migrations that have not been applied yet, as
    /// `(version, description)` pairs. A missing bookkeeping table means
    /// nothing has been applied.
    pub async fn pending_migrations(&self) -> Result<Vec<(i64, String)>, AppError> {
        let applied: Vec<i64> =
            match sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations")
                .fetch_all(&self.pool)
                .await
            {
                Ok(versions) => versions,
                Err(_) => Vec::new(),
            };

        Ok(MIGRATOR
            .migrations
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .map(|m| (m.version, m.description.to_string()))
            .collect())
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Get a [`ProjectRepository`] backed by this pool.
    pub fn project_repo(&self) -> ProjectRepository {
        ProjectRepository::new(self.pool.clone())
    }

    /// Get a [`ProjectSearchRepository`] backed by this pool.
    pub fn search_repo(&self) -> ProjectSearchRepository {
        ProjectSearchRepository::new(self.pool.clone())
    }

    /// Get a [`UserRepository`] backed by this pool.
    pub fn user_repo(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
