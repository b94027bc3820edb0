use sqlx::{PgPool, Pool, Postgres};

use mapforge_core::error::AppError;
use mapforge_core::user::{Role, User};

/// Repository for user lookup and organisation membership.
#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user. `token_digest` is the SHA-256 of their API token.
    pub async fn create(
        &self,
        username: &str,
        role: Role,
        token_digest: &str,
    ) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, role, token_digest)
            VALUES ($1, $2, $3)
            RETURNING id, username, role
            "#,
        )
        .bind(username)
        .bind(role.as_str())
        .bind(token_digest)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    /// Resolve an API-token digest to a user.
    pub async fn get_by_token_digest(&self, digest: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role FROM users WHERE token_digest = $1",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    /// Organisations the user manages.
    pub async fn managed_org_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        sqlx::query_scalar(
            "SELECT organisation_id FROM organisation_managers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            role: row.role.parse().unwrap_or(Role::Mapper),
        }
    }
}
