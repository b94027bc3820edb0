use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};

use mapforge_core::error::AppError;
use mapforge_core::geo::Bbox;
use mapforge_core::permission::ProjectAccess;
use mapforge_core::project::{
    Project, ProjectDetail, ProjectInfo, ProjectUpdate, ValidatedDraft,
};

/// Repository for project persistence in PostgreSQL.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: Pool<Postgres>,
}

/// Column list matching [`ProjectRow`]; reused by the search repository.
pub(crate) const PROJECT_COLUMNS: &str = "id, name, status, priority, difficulty, author_id, \
     organisation_id, campaign, country, default_locale, imagery, license_id, private, \
     featured, mapping_types, changeset_comment, due_date, aoi, aoi_min_x, aoi_min_y, \
     aoi_max_x, aoi_max_y, centroid_lon, centroid_lat, tasks, arbitrary_tasks, total_tasks, \
     tasks_mapped, tasks_validated, created_at, last_updated";

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated draft. Returns the generated project id.
    ///
    /// The draft name seeds the default-locale translation row so detail
    /// endpoints have texts to serve before the first update.
    pub async fn create(
        &self,
        draft: &ValidatedDraft,
        author_id: i64,
        default_locale: &str,
    ) -> Result<i64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO projects
                (name, author_id, organisation_id, default_locale, aoi,
                 aoi_min_x, aoi_min_y, aoi_max_x, aoi_max_y,
                 centroid_lon, centroid_lat, tasks, arbitrary_tasks, total_tasks)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(author_id)
        .bind(draft.organisation_id)
        .bind(default_locale)
        .bind(&draft.aoi)
        .bind(draft.bbox.min_x)
        .bind(draft.bbox.min_y)
        .bind(draft.bbox.max_x)
        .bind(draft.bbox.max_y)
        .bind(draft.centroid.0)
        .bind(draft.centroid.1)
        .bind(&draft.tasks)
        .bind(draft.arbitrary_tasks)
        .bind(draft.total_tasks)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query("INSERT INTO project_info (project_id, locale, name) VALUES ($1, $2, $3)")
            .bind(row.0)
            .bind(default_locale)
            .bind(&draft.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tracing::debug!(project_id = row.0, author_id, "draft project created");
        Ok(row.0)
    }

    /// Fetch a bare project row.
    pub async fn get(&self, id: i64) -> Result<Option<Project>, AppError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    /// Fetch a project with its satellite rows for detail endpoints.
    pub async fn get_detail(&self, id: i64) -> Result<Option<ProjectDetail>, AppError> {
        let head = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT p.id, p.name, p.status, p.priority, p.difficulty, p.author_id,
                   p.organisation_id, p.campaign, p.country, p.default_locale, p.imagery,
                   p.license_id, p.private, p.featured, p.mapping_types, p.changeset_comment,
                   p.due_date, p.aoi, p.aoi_min_x, p.aoi_min_y, p.aoi_max_x, p.aoi_max_y,
                   p.centroid_lon, p.centroid_lat, p.tasks, p.arbitrary_tasks, p.total_tasks,
                   p.tasks_mapped, p.tasks_validated, p.created_at, p.last_updated,
                   o.name AS organisation_name, u.username AS author_username
            FROM projects p
            LEFT JOIN organisations o ON o.id = p.organisation_id
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let Some(head) = head else {
            return Ok(None);
        };

        let locales = sqlx::query_as::<_, InfoRow>(
            r#"
            SELECT locale, name, short_description, description, instructions
            FROM project_info
            WHERE project_id = $1
            ORDER BY locale
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let priority_areas: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT geometry FROM priority_areas WHERE project_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let allowed_usernames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT u.username
            FROM project_allowed_users pau
            JOIN users u ON u.id = pau.user_id
            WHERE pau.project_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(Some(ProjectDetail {
            project: head.project.into(),
            locales: locales.into_iter().map(Into::into).collect(),
            priority_areas,
            allowed_usernames,
            organisation_name: head.organisation_name,
            author_username: head.author_username,
        }))
    }

    /// Access-control metadata for permission checks.
    pub async fn access(&self, id: i64) -> Result<Option<ProjectAccess>, AppError> {
        let row: Option<(i64, Option<i64>, bool, Vec<i64>)> = sqlx::query_as(
            r#"
            SELECT p.author_id, p.organisation_id, p.private,
                   COALESCE(
                       ARRAY_AGG(pau.user_id) FILTER (WHERE pau.user_id IS NOT NULL),
                       '{}'
                   ) AS allowed_user_ids
            FROM projects p
            LEFT JOIN project_allowed_users pau ON pau.project_id = p.id
            WHERE p.id = $1
            GROUP BY p.id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(|(author_id, organisation_id, private, allowed_user_ids)| ProjectAccess {
            author_id,
            organisation_id,
            private,
            allowed_user_ids,
        }))
    }

    /// Apply a partial update. Unset fields keep their current value.
    ///
    /// Locale texts, allowed users and priority areas are replaced
    /// wholesale when present, inside the same transaction.
    pub async fn update(&self, id: i64, update: &ProjectUpdate) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mapping_types: Option<Vec<String>> = update
            .mapping_types
            .as_ref()
            .map(|types| types.iter().map(|t| t.as_str().to_string()).collect());

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET status = COALESCE($2, status),
                priority = COALESCE($3, priority),
                difficulty = COALESCE($4, difficulty),
                default_locale = COALESCE($5, default_locale),
                campaign = COALESCE($6, campaign),
                country = COALESCE($7, country),
                organisation_id = COALESCE($8, organisation_id),
                imagery = COALESCE($9, imagery),
                license_id = COALESCE($10, license_id),
                private = COALESCE($11, private),
                mapping_types = COALESCE($12::text[], mapping_types),
                changeset_comment = COALESCE($13, changeset_comment),
                due_date = COALESCE($14::timestamptz, due_date),
                last_updated = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.difficulty.map(|d| d.as_str()))
        .bind(update.default_locale.as_deref())
        .bind(update.campaign.as_deref())
        .bind(update.country.as_deref())
        .bind(update.organisation_id)
        .bind(update.imagery.as_deref())
        .bind(update.license_id)
        .bind(update.private)
        .bind(mapping_types)
        .bind(update.changeset_comment.as_deref())
        .bind(update.due_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project".to_string()));
        }

        if let Some(locales) = &update.locales {
            sqlx::query("DELETE FROM project_info WHERE project_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            for info in locales {
                sqlx::query(
                    r#"
                    INSERT INTO project_info
                        (project_id, locale, name, short_description, description, instructions)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(id)
                .bind(&info.locale)
                .bind(&info.name)
                .bind(info.short_description.as_deref())
                .bind(info.description.as_deref())
                .bind(info.instructions.as_deref())
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            }
            // Keep the denormalized project name in sync with the
            // default-locale translation.
            sqlx::query(
                r#"
                UPDATE projects
                SET name = COALESCE(
                    (SELECT pi.name FROM project_info pi
                     WHERE pi.project_id = projects.id AND pi.locale = projects.default_locale),
                    name
                )
                WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        }

        if let Some(usernames) = &update.allowed_usernames {
            let resolved: Vec<(i64, String)> =
                sqlx::query_as("SELECT id, username FROM users WHERE username = ANY($1)")
                    .bind(usernames)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            if resolved.len() != usernames.len() {
                let known: Vec<&str> = resolved.iter().map(|(_, name)| name.as_str()).collect();
                let missing: Vec<&str> = usernames
                    .iter()
                    .map(String::as_str)
                    .filter(|name| !known.contains(name))
                    .collect();
                return Err(AppError::InvalidData(format!(
                    "Unknown usernames: {}",
                    missing.join(", ")
                )));
            }
            sqlx::query("DELETE FROM project_allowed_users WHERE project_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            for (user_id, _) in &resolved {
                sqlx::query(
                    "INSERT INTO project_allowed_users (project_id, user_id) VALUES ($1, $2)",
                )
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            }
        }

        if let Some(areas) = &update.priority_areas {
            sqlx::query("DELETE FROM priority_areas WHERE project_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            for area in areas {
                sqlx::query("INSERT INTO priority_areas (project_id, geometry) VALUES ($1, $2)")
                    .bind(id)
                    .bind(area)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Delete a project and its satellite rows.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project".to_string()));
        }
        Ok(())
    }

    /// True if any task was mapped or validated, or contributions exist.
    pub async fn has_mapping_activity(&self, id: i64) -> Result<bool, AppError> {
        let (active,): (bool,) = sqlx::query_as(
            r#"
            SELECT (p.tasks_mapped > 0 OR p.tasks_validated > 0
                    OR EXISTS (SELECT 1 FROM project_contributions c WHERE c.project_id = p.id))
            FROM projects p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(active)
    }

    /// Release task locks older than `max_age_hours`. Returns the number
    /// of locks released.
    pub async fn release_stale_locks(
        &self,
        project_id: i64,
        max_age_hours: i64,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            DELETE FROM task_locks
            WHERE project_id = $1
              AND locked_at < NOW() - make_interval(hours => $2)
            "#,
        )
        .bind(project_id)
        .bind(max_age_hours)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

// -- Internal row types for sqlx deserialization --

#[derive(sqlx::FromRow)]
pub(crate) struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub priority: String,
    pub difficulty: String,
    pub author_id: i64,
    pub organisation_id: Option<i64>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub default_locale: String,
    pub imagery: Option<String>,
    pub license_id: Option<i64>,
    pub private: bool,
    pub featured: bool,
    pub mapping_types: Vec<String>,
    pub changeset_comment: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub aoi: serde_json::Value,
    pub aoi_min_x: f64,
    pub aoi_min_y: f64,
    pub aoi_max_x: f64,
    pub aoi_max_y: f64,
    pub centroid_lon: f64,
    pub centroid_lat: f64,
    pub tasks: serde_json::Value,
    pub arbitrary_tasks: bool,
    pub total_tasks: i32,
    pub tasks_mapped: i32,
    pub tasks_validated: i32,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            name: row.name,
            status: row.status.parse().unwrap_or(mapforge_core::ProjectStatus::Draft),
            priority: row
                .priority
                .parse()
                .unwrap_or(mapforge_core::ProjectPriority::Medium),
            difficulty: row
                .difficulty
                .parse()
                .unwrap_or(mapforge_core::Difficulty::Moderate),
            author_id: row.author_id,
            organisation_id: row.organisation_id,
            campaign: row.campaign,
            country: row.country,
            default_locale: row.default_locale,
            imagery: row.imagery,
            license_id: row.license_id,
            private: row.private,
            featured: row.featured,
            mapping_types: row
                .mapping_types
                .iter()
                .filter_map(|t| t.parse().ok())
                .collect(),
            changeset_comment: row.changeset_comment,
            due_date: row.due_date,
            aoi: row.aoi,
            bbox: Bbox {
                min_x: row.aoi_min_x,
                min_y: row.aoi_min_y,
                max_x: row.aoi_max_x,
                max_y: row.aoi_max_y,
            },
            centroid: (row.centroid_lon, row.centroid_lat),
            tasks: row.tasks,
            arbitrary_tasks: row.arbitrary_tasks,
            total_tasks: row.total_tasks,
            tasks_mapped: row.tasks_mapped,
            tasks_validated: row.tasks_validated,
            created_at: row.created_at,
            last_updated: row.last_updated,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    project: ProjectRow,
    organisation_name: Option<String>,
    author_username: String,
}

#[derive(sqlx::FromRow)]
struct InfoRow {
    locale: String,
    name: String,
    short_description: Option<String>,
    description: Option<String>,
    instructions: Option<String>,
}

impl From<InfoRow> for ProjectInfo {
    fn from(row: InfoRow) -> Self {
        ProjectInfo {
            locale: row.locale,
            name: row.name,
            short_description: row.short_description,
            description: row.description,
            instructions: row.instructions,
        }
    }
}
