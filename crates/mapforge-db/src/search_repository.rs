use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres, QueryBuilder};

use mapforge_core::error::AppError;
use mapforge_core::project::{Difficulty, Project, ProjectPriority, ProjectStatus};
use mapforge_core::search::{BboxSearch, PAGE_SIZE, ProjectSearch};

use crate::project_repository::{PROJECT_COLUMNS, ProjectRow};

/// Read-side repository for project search and geo queries.
#[derive(Clone)]
pub struct ProjectSearchRepository {
    pool: Pool<Postgres>,
}

/// The caller's identity as it affects result visibility.
#[derive(Debug, Clone, Copy)]
pub struct SearchViewer {
    pub user_id: i64,
    pub is_admin: bool,
}

/// A compact, locale-resolved project row for listings.
#[derive(Debug, Clone)]
pub struct ProjectCard {
    pub id: i64,
    pub name: String,
    pub short_description: Option<String>,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub difficulty: Difficulty,
    pub priority: ProjectPriority,
    pub status: ProjectStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub total_tasks: i32,
    pub tasks_mapped: i32,
    pub tasks_validated: i32,
    pub centroid: (f64, f64),
    pub private: bool,
}

impl ProjectCard {
    pub fn percent_mapped(&self) -> u32 {
        percent(self.tasks_mapped, self.total_tasks)
    }

    pub fn percent_validated(&self) -> u32 {
        percent(self.tasks_validated, self.total_tasks)
    }
}

fn percent(part: i32, total: i32) -> u32 {
    if total <= 0 {
        0
    } else {
        (part.max(0) as u32 * 100) / total as u32
    }
}

/// One page of search results plus the unpaged total.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub cards: Vec<ProjectCard>,
    pub total: i64,
}

/// Project id, name and AOI geometry, for GeoJSON feature output.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectGeometry {
    pub id: i64,
    pub name: String,
    pub aoi: serde_json::Value,
}

/// Card data for the mapped-projects listing of a user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TouchedProject {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub centroid_lon: f64,
    pub centroid_lat: f64,
}

/// Flat row for CLI export.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRow {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub priority: String,
    pub difficulty: String,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub centroid_lon: f64,
    pub centroid_lat: f64,
    pub aoi: serde_json::Value,
}

impl ProjectSearchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Filtered, paginated project search.
    ///
    /// Predicates are assembled with `QueryBuilder`; the ORDER BY column
    /// comes from the [`OrderBy`](mapforge_core::search::OrderBy)
    /// whitelist, never from raw input. `COUNT(*) OVER ()` carries the
    /// unpaged total alongside each row.
    pub async fn search(
        &self,
        search: &ProjectSearch,
        viewer: Option<SearchViewer>,
    ) -> Result<SearchPage, AppError> {
        let mut qb = card_select(&search.preferred_locale);
        push_visibility(&mut qb, viewer);

        let non_published_requested = search
            .statuses
            .iter()
            .any(|s| *s != ProjectStatus::Published);
        let statuses: Vec<String> = if search.statuses.is_empty() {
            vec![ProjectStatus::Published.as_str().to_string()]
        } else {
            search.statuses.iter().map(|s| s.as_str().to_string()).collect()
        };
        qb.push(" AND p.status = ANY(").push_bind(statuses).push(")");

        // Draft and archived projects are only listed to callers who
        // could administer them.
        if non_published_requested {
            match viewer {
                Some(viewer) if viewer.is_admin => {}
                Some(viewer) => {
                    qb.push(" AND (p.status = 'PUBLISHED' OR p.author_id = ")
                        .push_bind(viewer.user_id)
                        .push(
                            " OR p.organisation_id IN (SELECT om.organisation_id \
                             FROM organisation_managers om WHERE om.user_id = ",
                        )
                        .push_bind(viewer.user_id)
                        .push("))");
                }
                None => {
                    qb.push(" AND p.status = 'PUBLISHED'");
                }
            }
        }

        if let Some(difficulty) = search.difficulty {
            qb.push(" AND p.difficulty = ").push_bind(difficulty.as_str());
        }

        if !search.mapping_types.is_empty() {
            let types: Vec<String> = search
                .mapping_types
                .iter()
                .map(|t| t.as_str().to_string())
                .collect();
            if search.mapping_types_exact {
                qb.push(" AND p.mapping_types @> ")
                    .push_bind(types.clone())
                    .push(" AND p.mapping_types <@ ")
                    .push_bind(types);
            } else {
                qb.push(" AND p.mapping_types && ").push_bind(types);
            }
        }

        if let Some(org_id) = search.organisation_id {
            qb.push(" AND p.organisation_id = ").push_bind(org_id);
        }
        if let Some(org_name) = &search.organisation_name {
            qb.push(" AND o.name ILIKE ").push_bind(org_name.clone());
        }
        if let Some(campaign) = &search.campaign {
            qb.push(" AND p.campaign ILIKE ").push_bind(campaign.clone());
        }
        if let Some(country) = &search.country {
            qb.push(" AND p.country ILIKE ").push_bind(country.clone());
        }

        if let Some(text) = &search.text_search {
            let pattern = format!("%{}%", text.trim());
            qb.push(" AND (COALESCE(pi_pref.name, pi_def.name, p.name) ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR COALESCE(pi_pref.short_description, pi_def.short_description) ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(from) = search.created_from {
            qb.push(" AND p.created_at >= ").push_bind(from);
        }
        if let Some(to) = search.created_to {
            qb.push(" AND p.created_at <= ").push_bind(to);
        }
        if let Some(from) = search.last_updated_from {
            qb.push(" AND p.last_updated >= ").push_bind(from);
        }
        if let Some(to) = search.last_updated_to {
            qb.push(" AND p.last_updated <= ").push_bind(to);
        }

        if let Some(author) = search.created_by {
            qb.push(" AND p.author_id = ").push_bind(author);
        }
        if let Some(mapper) = search.mapped_by {
            qb.push(
                " AND EXISTS (SELECT 1 FROM project_contributions c \
                 WHERE c.project_id = p.id AND c.user_id = ",
            )
            .push_bind(mapper)
            .push(")");
        }
        if let Some(manager) = search.managed_by {
            qb.push(" AND (p.author_id = ")
                .push_bind(manager)
                .push(
                    " OR p.organisation_id IN (SELECT om.organisation_id \
                     FROM organisation_managers om WHERE om.user_id = ",
                )
                .push_bind(manager)
                .push("))");
        }

        qb.push(format!(
            " ORDER BY p.{} {}",
            search.order_by.as_column(),
            search.order_direction.as_sql()
        ));
        qb.push(" LIMIT ")
            .push_bind(i64::from(PAGE_SIZE))
            .push(" OFFSET ")
            .push_bind(search.offset());

        let rows: Vec<SearchRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        tracing::debug!(page = search.page, total, "project search executed");
        Ok(SearchPage {
            cards: rows.into_iter().map(Into::into).collect(),
            total,
        })
    }

    /// Featured published projects, freshest first.
    pub async fn featured(&self, locale: &str) -> Result<Vec<ProjectCard>, AppError> {
        let mut qb = card_select(locale);
        qb.push(" AND p.featured AND p.status = 'PUBLISHED'");
        qb.push(" ORDER BY p.last_updated DESC LIMIT 20");

        let rows: Vec<SearchRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Projects the user created or manages through an organisation.
    pub async fn owner_projects(
        &self,
        user_id: i64,
        locale: &str,
    ) -> Result<Vec<ProjectCard>, AppError> {
        let mut qb = card_select(locale);
        qb.push(" AND (p.author_id = ")
            .push_bind(user_id)
            .push(
                " OR p.organisation_id IN (SELECT om.organisation_id \
                 FROM organisation_managers om WHERE om.user_id = ",
            )
            .push_bind(user_id)
            .push("))");
        qb.push(" ORDER BY p.last_updated DESC LIMIT 200");

        let rows: Vec<SearchRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Projects whose AOI bounding box overlaps the query box.
    pub async fn bbox_projects(
        &self,
        search: &BboxSearch,
    ) -> Result<Vec<ProjectGeometry>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT p.id, p.name, p.aoi FROM projects p WHERE p.aoi_min_x <= ",
        );
        qb.push_bind(search.bbox.max_x)
            .push(" AND p.aoi_max_x >= ")
            .push_bind(search.bbox.min_x)
            .push(" AND p.aoi_min_y <= ")
            .push_bind(search.bbox.max_y)
            .push(" AND p.aoi_max_y >= ")
            .push_bind(search.bbox.min_y);
        if let Some(author) = search.author_id {
            qb.push(" AND p.author_id = ").push_bind(author);
        }
        qb.push(" ORDER BY p.id");

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    /// Published projects with contributions inside the interval.
    pub async fn active_projects(
        &self,
        interval_hours: i64,
    ) -> Result<Vec<ProjectGeometry>, AppError> {
        sqlx::query_as(
            r#"
            SELECT p.id, p.name, p.aoi
            FROM projects p
            WHERE p.status = 'PUBLISHED'
              AND EXISTS (
                  SELECT 1 FROM project_contributions c
                  WHERE c.project_id = p.id
                    AND c.contributed_at > NOW() - make_interval(hours => $1)
              )
            ORDER BY p.id
            "#,
        )
        .bind(interval_hours)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    /// Published candidates for similarity ranking, freshest first.
    pub async fn similar_candidates(
        &self,
        exclude_id: i64,
        include_private: bool,
    ) -> Result<Vec<Project>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE status = 'PUBLISHED' AND id <> "
        ));
        qb.push_bind(exclude_id);
        if !include_private {
            qb.push(" AND private = FALSE");
        }
        qb.push(" ORDER BY last_updated DESC LIMIT 50");

        let rows: Vec<ProjectRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Projects a user has contributed to.
    pub async fn touched_by(&self, user_id: i64) -> Result<Vec<TouchedProject>, AppError> {
        sqlx::query_as(
            r#"
            SELECT DISTINCT p.id, p.name, p.status, p.centroid_lon, p.centroid_lat
            FROM projects p
            JOIN project_contributions c ON c.project_id = p.id
            WHERE c.user_id = $1
            ORDER BY p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))
    }

    /// Flat project listing for CLI export.
    pub async fn export_rows(
        &self,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<ExportRow>, AppError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, name, status, priority, difficulty, campaign, country, \
             centroid_lon, centroid_lat, aoi FROM projects",
        );
        if let Some(status) = status {
            qb.push(" WHERE status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY id");

        qb.build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))
    }
}

// -- Query assembly helpers --

/// Shared SELECT head producing locale-resolved card rows.
fn card_select(locale: &str) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT p.id, COALESCE(pi_pref.name, pi_def.name, p.name) AS name, \
         COALESCE(pi_pref.short_description, pi_def.short_description) AS short_description, \
         o.name AS organisation_name, p.campaign, p.country, p.difficulty, p.priority, \
         p.status, p.due_date, p.last_updated, p.total_tasks, p.tasks_mapped, \
         p.tasks_validated, p.centroid_lon, p.centroid_lat, p.private, \
         COUNT(*) OVER () AS total_count \
         FROM projects p \
         LEFT JOIN organisations o ON o.id = p.organisation_id \
         LEFT JOIN project_info pi_pref ON pi_pref.project_id = p.id AND pi_pref.locale = ",
    );
    qb.push_bind(locale.to_string());
    qb.push(
        " LEFT JOIN project_info pi_def ON pi_def.project_id = p.id \
         AND pi_def.locale = p.default_locale WHERE 1 = 1",
    );
    qb
}

fn push_visibility(qb: &mut QueryBuilder<'static, Postgres>, viewer: Option<SearchViewer>) {
    match viewer {
        Some(viewer) if viewer.is_admin => {}
        Some(viewer) => {
            qb.push(" AND (p.private = FALSE OR p.author_id = ")
                .push_bind(viewer.user_id)
                .push(
                    " OR EXISTS (SELECT 1 FROM project_allowed_users pau \
                     WHERE pau.project_id = p.id AND pau.user_id = ",
                )
                .push_bind(viewer.user_id)
                .push(
                    ") OR EXISTS (SELECT 1 FROM organisation_managers om \
                     WHERE om.organisation_id = p.organisation_id AND om.user_id = ",
                )
                .push_bind(viewer.user_id)
                .push("))");
        }
        None => {
            qb.push(" AND p.private = FALSE");
        }
    }
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    id: i64,
    name: String,
    short_description: Option<String>,
    organisation_name: Option<String>,
    campaign: Option<String>,
    country: Option<String>,
    difficulty: String,
    priority: String,
    status: String,
    due_date: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
    total_tasks: i32,
    tasks_mapped: i32,
    tasks_validated: i32,
    centroid_lon: f64,
    centroid_lat: f64,
    private: bool,
    total_count: i64,
}

impl From<SearchRow> for ProjectCard {
    fn from(row: SearchRow) -> Self {
        ProjectCard {
            id: row.id,
            name: row.name,
            short_description: row.short_description,
            organisation_name: row.organisation_name,
            campaign: row.campaign,
            country: row.country,
            difficulty: row.difficulty.parse().unwrap_or(Difficulty::Moderate),
            priority: row.priority.parse().unwrap_or(ProjectPriority::Medium),
            status: row.status.parse().unwrap_or(ProjectStatus::Draft),
            due_date: row.due_date,
            last_updated: row.last_updated,
            total_tasks: row.total_tasks,
            tasks_mapped: row.tasks_mapped,
            tasks_validated: row.tasks_validated,
            centroid: (row.centroid_lon, row.centroid_lat),
            private: row.private,
        }
    }
}
