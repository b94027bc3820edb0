use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mapforge_core::error::AppError;
use mapforge_core::project::{Project, ProjectDetail, ProjectInfo, ProjectUpdate};
use mapforge_core::search::{OrderBy, OrderDirection, ProjectSearch};
use mapforge_core::user::User;
use mapforge_db::{ProjectCard, TouchedProject};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub project_name: String,
    /// GeoJSON Polygon, MultiPolygon or FeatureCollection.
    pub area_of_interest: Value,
    /// Optional pre-split task FeatureCollection.
    pub tasks: Option<Value>,
    #[serde(default)]
    pub arbitrary_tasks: bool,
    pub organisation: Option<i64>,
}

impl CreateProjectRequest {
    pub fn into_draft(self) -> mapforge_core::project::DraftProject {
        mapforge_core::project::DraftProject {
            name: self.project_name,
            area_of_interest: self.area_of_interest,
            tasks: self.tasks,
            arbitrary_tasks: self.arbitrary_tasks,
            organisation_id: self.organisation,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectResponse {
    pub project_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfoDto {
    pub locale: String,
    pub name: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub instructions: Option<String>,
}

impl From<ProjectInfo> for ProjectInfoDto {
    fn from(info: ProjectInfo) -> Self {
        Self {
            locale: info.locale,
            name: info.name,
            short_description: info.short_description,
            description: info.description,
            instructions: info.instructions,
        }
    }
}

impl From<ProjectInfoDto> for ProjectInfo {
    fn from(dto: ProjectInfoDto) -> Self {
        ProjectInfo {
            locale: dto.locale,
            name: dto.name,
            short_description: dto.short_description,
            description: dto.description,
            instructions: dto.instructions,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub project_status: Option<String>,
    pub project_priority: Option<String>,
    pub difficulty: Option<String>,
    pub default_locale: Option<String>,
    pub private: Option<bool>,
    pub changeset_comment: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub imagery: Option<String>,
    pub license_id: Option<i64>,
    pub campaign: Option<String>,
    pub organisation: Option<i64>,
    pub country: Option<String>,
    pub mapping_types: Option<Vec<String>>,
    pub allowed_usernames: Option<Vec<String>>,
    /// GeoJSON polygons marking areas to map first.
    pub priority_areas: Option<Vec<Value>>,
    pub project_info_locales: Option<Vec<ProjectInfoDto>>,
}

impl UpdateProjectRequest {
    pub fn into_update(self) -> Result<ProjectUpdate, AppError> {
        let status = self
            .project_status
            .map(|s| s.parse().map_err(AppError::InvalidData))
            .transpose()?;
        let priority = self
            .project_priority
            .map(|s| s.parse().map_err(AppError::InvalidData))
            .transpose()?;
        let difficulty = self
            .difficulty
            .map(|s| s.parse().map_err(AppError::InvalidData))
            .transpose()?;
        let mapping_types = self
            .mapping_types
            .map(|types| {
                types
                    .into_iter()
                    .map(|t| t.parse().map_err(AppError::InvalidData))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(ProjectUpdate {
            status,
            priority,
            difficulty,
            default_locale: self.default_locale,
            campaign: self.campaign,
            country: self.country,
            organisation_id: self.organisation,
            imagery: self.imagery,
            license_id: self.license_id,
            private: self.private,
            mapping_types,
            changeset_comment: self.changeset_comment,
            due_date: self.due_date,
            locales: self
                .project_info_locales
                .map(|infos| infos.into_iter().map(Into::into).collect()),
            allowed_usernames: self.allowed_usernames,
            priority_areas: self.priority_areas,
        })
    }
}

/// `{"Status": "Updated"}` acknowledgement body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatusResponse {
    #[serde(rename = "Status")]
    pub status: &'static str,
}

/// `{"Success": …}` acknowledgement body.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SuccessResponse {
    #[serde(rename = "Success")]
    pub success: &'static str,
}

/// Full project view served to mappers and admins.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub project_id: i64,
    pub status: String,
    pub project_priority: String,
    pub difficulty: String,
    pub default_locale: String,
    pub organisation: Option<i64>,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub mapping_types: Vec<String>,
    pub imagery: Option<String>,
    pub license_id: Option<i64>,
    pub changeset_comment: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub private: bool,
    pub featured: bool,
    pub allowed_usernames: Vec<String>,
    pub author: String,
    pub project_info: ProjectInfoDto,
    pub aoi_bbox: [f64; 4],
    pub area_of_interest: Value,
    /// Task FeatureCollection; omitted by the no-tasks and
    /// no-geometries views.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Value>,
    pub priority_areas: Vec<Value>,
    pub percent_mapped: u32,
    pub percent_validated: u32,
    pub total_tasks: i32,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl ProjectResponse {
    pub fn from_detail(detail: &ProjectDetail, locale: &str, include_tasks: bool) -> Self {
        let project = &detail.project;
        Self {
            project_id: project.id,
            status: project.status.to_string(),
            project_priority: project.priority.to_string(),
            difficulty: project.difficulty.to_string(),
            default_locale: project.default_locale.clone(),
            organisation: project.organisation_id,
            organisation_name: detail.organisation_name.clone(),
            campaign: project.campaign.clone(),
            country: project.country.clone(),
            mapping_types: project
                .mapping_types
                .iter()
                .map(ToString::to_string)
                .collect(),
            imagery: project.imagery.clone(),
            license_id: project.license_id,
            changeset_comment: project.changeset_comment.clone(),
            due_date: project.due_date,
            private: project.private,
            featured: project.featured,
            allowed_usernames: detail.allowed_usernames.clone(),
            author: detail.author_username.clone(),
            project_info: detail.info_for_locale(locale).into(),
            aoi_bbox: project.bbox.as_array(),
            area_of_interest: project.aoi.clone(),
            tasks: include_tasks.then(|| project.tasks.clone()),
            priority_areas: detail.priority_areas.clone(),
            percent_mapped: project.percent_mapped(),
            percent_validated: project.percent_validated(),
            total_tasks: project.total_tasks,
            created: project.created_at,
            last_updated: project.last_updated,
        }
    }
}

/// Abbreviated state-only view (`abbreviated=true`).
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStateResponse {
    pub project_id: i64,
    pub status: String,
    pub percent_mapped: u32,
    pub percent_validated: u32,
    pub last_updated: DateTime<Utc>,
}

impl ProjectStateResponse {
    pub fn from_detail(detail: &ProjectDetail) -> Self {
        let project = &detail.project;
        Self {
            project_id: project.id,
            status: project.status.to_string(),
            percent_mapped: project.percent_mapped(),
            percent_validated: project.percent_validated(),
            last_updated: project.last_updated,
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub difficulty: Option<String>,
    /// Comma-separated mapping types.
    pub mapping_types: Option<String>,
    pub mapping_types_exact: Option<bool>,
    /// Comma-separated project statuses.
    pub project_statuses: Option<String>,
    pub organisation_id: Option<i64>,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub text_search: Option<String>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    pub last_updated_from: Option<String>,
    pub last_updated_to: Option<String>,
    pub created_by_me: Option<bool>,
    pub mapped_by_me: Option<bool>,
    pub managed_by_me: Option<bool>,
    pub order_by: Option<String>,
    pub order_by_type: Option<String>,
    pub page: Option<u32>,
    pub omit_map_results: Option<bool>,
}

impl SearchQuery {
    /// Build the core filter set; "…ByMe" flags only apply to
    /// authenticated callers.
    pub fn into_search(
        self,
        viewer: Option<&User>,
        preferred_locale: String,
    ) -> Result<ProjectSearch, AppError> {
        let difficulty = self
            .difficulty
            .map(|s| s.parse().map_err(AppError::InvalidData))
            .transpose()?;
        let mapping_types = parse_csv(self.mapping_types.as_deref())?;
        let statuses = parse_csv(self.project_statuses.as_deref())?;
        let order_by = self
            .order_by
            .map(|s| s.parse::<OrderBy>().map_err(AppError::InvalidData))
            .transpose()?
            .unwrap_or_default();
        let order_direction = self
            .order_by_type
            .map(|s| s.parse::<OrderDirection>().map_err(AppError::InvalidData))
            .transpose()?
            .unwrap_or_default();

        let viewer_id = viewer.map(|u| u.id);
        let flag = |set: Option<bool>| {
            if set.unwrap_or(false) { viewer_id } else { None }
        };

        Ok(ProjectSearch {
            preferred_locale,
            difficulty,
            mapping_types,
            mapping_types_exact: self.mapping_types_exact.unwrap_or(false),
            statuses,
            organisation_id: self.organisation_id,
            organisation_name: self.organisation_name,
            campaign: self.campaign,
            country: self.country,
            text_search: self.text_search,
            created_from: parse_date(self.created_from.as_deref())?,
            created_to: parse_date(self.created_to.as_deref())?,
            last_updated_from: parse_date(self.last_updated_from.as_deref())?,
            last_updated_to: parse_date(self.last_updated_to.as_deref())?,
            created_by: flag(self.created_by_me),
            mapped_by: flag(self.mapped_by_me),
            managed_by: flag(self.managed_by_me),
            order_by,
            order_direction,
            page: self.page.unwrap_or(1).max(1),
            omit_map_results: self.omit_map_results.unwrap_or(false),
        })
    }
}

fn parse_csv<T: std::str::FromStr<Err = String>>(
    raw: Option<&str>,
) -> Result<Vec<T>, AppError> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().map_err(AppError::InvalidData))
            .collect(),
    }
}

/// Parse a date filter: RFC 3339, `YYYY-MM-DDTHH:MM:SS`, or `YYYY-MM-DD`.
fn parse_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Some(parsed.and_utc()));
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(parsed.and_hms_opt(0, 0, 0).expect("valid midnight").and_utc()));
    }
    Err(AppError::InvalidData(format!("Invalid date: {raw}")))
}

/// Search result card.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCardDto {
    pub project_id: i64,
    pub name: String,
    pub short_description: Option<String>,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub difficulty: String,
    pub priority: String,
    pub status: String,
    pub percent_mapped: u32,
    pub percent_validated: u32,
    pub total_tasks: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl From<ProjectCard> for ProjectCardDto {
    fn from(card: ProjectCard) -> Self {
        Self {
            project_id: card.id,
            name: card.name.clone(),
            short_description: card.short_description.clone(),
            organisation_name: card.organisation_name.clone(),
            campaign: card.campaign.clone(),
            country: card.country.clone(),
            difficulty: card.difficulty.to_string(),
            priority: card.priority.to_string(),
            status: card.status.to_string(),
            percent_mapped: card.percent_mapped(),
            percent_validated: card.percent_validated(),
            total_tasks: card.total_tasks,
            due_date: card.due_date,
            last_updated: card.last_updated,
        }
    }
}

impl ProjectCardDto {
    /// Card built from a bare project row (similar-projects results).
    pub fn from_project(project: &Project) -> Self {
        Self {
            project_id: project.id,
            name: project.name.clone(),
            short_description: None,
            organisation_name: None,
            campaign: project.campaign.clone(),
            country: project.country.clone(),
            difficulty: project.difficulty.to_string(),
            priority: project.priority.to_string(),
            status: project.status.to_string(),
            percent_mapped: project.percent_mapped(),
            percent_validated: project.percent_validated(),
            total_tasks: project.total_tasks,
            due_date: project.due_date,
            last_updated: project.last_updated,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDto {
    pub page: u32,
    pub pages: i64,
    pub total: i64,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<ProjectCardDto>,
    /// GeoJSON FeatureCollection of project centroids; `{}` when map
    /// results were omitted.
    pub map_results: Value,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub results: Vec<ProjectCardDto>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProjectsResponse {
    pub active_projects: Vec<ProjectCardDto>,
    pub draft_projects: Vec<ProjectCardDto>,
    pub archived_projects: Vec<ProjectCardDto>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct BboxQuery {
    /// Comma-separated `xmin,ymin,xmax,ymax`.
    pub bbox: String,
    /// SRID of the bbox coordinates; only 4326 is accepted.
    pub srid: Option<i32>,
    pub created_by_me: Option<bool>,
}

// ---------------------------------------------------------------------------
// Project queries
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct GetProjectQuery {
    /// Serve the body as an attachment download.
    pub as_file: Option<bool>,
    /// Return state information only.
    pub abbreviated: Option<bool>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub as_file: Option<bool>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SimilarQuery {
    /// Number of similar projects to return (default 4).
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ActiveQuery {
    /// Time interval in hours (1-24, default 24).
    pub interval: Option<String>,
}

/// Localized project summary; cached per `(project, locale)`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub project_id: i64,
    pub name: String,
    pub short_description: Option<String>,
    pub status: String,
    pub priority: String,
    pub difficulty: String,
    pub organisation_name: Option<String>,
    pub campaign: Option<String>,
    pub country: Option<String>,
    pub default_locale: String,
    pub percent_mapped: u32,
    pub percent_validated: u32,
    pub total_tasks: i32,
    pub aoi_centroid: Value,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
}

impl SummaryResponse {
    pub fn from_detail(detail: &ProjectDetail, locale: &str) -> Self {
        let project = &detail.project;
        let info = detail.info_for_locale(locale);
        Self {
            project_id: project.id,
            name: info.name,
            short_description: info.short_description,
            status: project.status.to_string(),
            priority: project.priority.to_string(),
            difficulty: project.difficulty.to_string(),
            organisation_name: detail.organisation_name.clone(),
            campaign: project.campaign.clone(),
            country: project.country.clone(),
            default_locale: project.default_locale.clone(),
            percent_mapped: project.percent_mapped(),
            percent_validated: project.percent_validated(),
            total_tasks: project.total_tasks,
            aoi_centroid: project.centroid_geojson(),
            created: project.created_at,
            last_updated: project.last_updated,
            due_date: project.due_date,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TouchedDto {
    pub project_id: i64,
    pub name: String,
    pub status: String,
    pub centroid: Value,
}

impl From<TouchedProject> for TouchedDto {
    fn from(row: TouchedProject) -> Self {
        Self {
            project_id: row.id,
            name: row.name,
            status: row.status,
            centroid: serde_json::json!({
                "type": "Point",
                "coordinates": [row.centroid_lon, row.centroid_lat]
            }),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TouchedResponse {
    pub mapped_projects: Vec<TouchedDto>,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Two-part error body: human-readable message plus stable sub-code.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "SubCode")]
    pub sub_code: String,
}
