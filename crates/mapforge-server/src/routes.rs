use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, get, on, post};
use serde::Serialize;
use serde_json::{Value, json};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use mapforge_core::error::AppError;
use mapforge_core::geo;
use mapforge_core::permission;
use mapforge_core::recommendation;
use mapforge_core::search::{BboxSearch, PAGE_SIZE, ProjectSearch};
use mapforge_core::user::User;
use mapforge_db::{ProjectCard, ProjectGeometry, SearchViewer};

use crate::auth::{AuthUser, MaybeUser};
use crate::dto::{
    ActiveQuery, BboxQuery, CreateProjectRequest, CreateProjectResponse, FileQuery,
    GetProjectQuery, HealthResponse, OwnerProjectsResponse, ProjectCardDto, ProjectListResponse,
    ProjectResponse, ProjectStateResponse, PaginationDto, SearchQuery, SearchResponse,
    SimilarQuery, StatusResponse, SuccessResponse, SummaryResponse, TouchedResponse,
    UpdateProjectRequest,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Task locks older than this are released by the read-path sweep.
const STALE_LOCK_HOURS: i64 = 2;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/projects", post(create_project).get(search_projects))
        .route(
            "/projects/{id}",
            on(MethodFilter::GET, get_project)
                .on(MethodFilter::HEAD, head_project)
                .patch(update_project)
                .delete(delete_project),
        )
        .route("/projects/queries/bbox", get(bbox_projects))
        .route("/projects/queries/myself/owner", get(owner_projects))
        .route("/projects/queries/featured", get(featured_projects))
        .route("/projects/queries/active", get(active_projects))
        .route("/projects/queries/{id}/touched", get(touched_projects))
        .route("/projects/queries/{id}/similar-projects", get(similar_projects))
        .route("/projects/{id}/queries/summary", get(project_summary))
        .route("/projects/{id}/queries/nogeometries", get(project_no_geometries))
        .route("/projects/{id}/queries/notasks", get(project_no_tasks))
        .route("/projects/{id}/queries/aoi", get(project_aoi))
        .route("/projects/{id}/queries/priority-areas", get(project_priority_areas));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.nest("/api/v2", api).with_state(state)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First language tag of the Accept-Language header, defaulting to "en".
fn preferred_locale(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|tag| tag.split(';').next().unwrap_or(tag).trim().to_string())
        .filter(|tag| !tag.is_empty())
        .unwrap_or_else(|| "en".to_string())
}

/// Serve a JSON body as an attachment download.
fn attachment(filename: &str, body: &impl Serialize) -> Result<Response, ApiError> {
    let bytes = serde_json::to_vec_pretty(body).map_err(AppError::from)?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Reject unless the user may administer the project.
async fn require_manager(
    state: &AppState,
    user: &User,
    project_id: i64,
) -> Result<(), ApiError> {
    let access = state
        .db
        .project_repo()
        .access(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;
    let managed = state.db.user_repo().managed_org_ids(user.id).await?;
    if permission::can_administer(user, &access, &managed) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied.into())
    }
}

/// Reject unless the project is visible to the (possibly anonymous) user.
async fn require_visible(
    state: &AppState,
    user: Option<&User>,
    project_id: i64,
) -> Result<(), ApiError> {
    let access = state
        .db
        .project_repo()
        .access(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;
    let managed = match user {
        Some(user) => state.db.user_repo().managed_org_ids(user.id).await?,
        None => Vec::new(),
    };
    if permission::can_view(user, &access, &managed) {
        Ok(())
    } else {
        Err(AppError::PrivateProject.into())
    }
}

/// Release task locks that outlived the lock TTL; failures are logged,
/// never surfaced to the caller.
async fn sweep_stale_locks(state: &AppState, project_id: i64) {
    if let Err(e) = state
        .db
        .project_repo()
        .release_stale_locks(project_id, STALE_LOCK_HOURS)
        .await
    {
        tracing::error!(project_id, error = %e, "stale lock release failed");
    }
}

fn centroid_map_results(cards: &[ProjectCard]) -> Value {
    let features = cards
        .iter()
        .map(|card| {
            geo::feature(
                json!({ "type": "Point", "coordinates": [card.centroid.0, card.centroid.1] }),
                json!({ "projectId": card.id, "name": card.name }),
            )
        })
        .collect();
    geo::feature_collection(features)
}

fn aoi_feature_collection(rows: Vec<ProjectGeometry>) -> Value {
    let features = rows
        .into_iter()
        .map(|row| geo::feature(row.aoi, json!({ "projectId": row.id, "name": row.name })))
        .collect();
    geo::feature_collection(features)
}

// ---------------------------------------------------------------------------
// Project CRUD
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v2/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Draft project created", body = CreateProjectResponse),
        (status = 400, description = "Invalid request", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    axum::Json(body): axum::Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let validated = body.into_draft().validate()?;
    let project_id = state
        .db
        .project_repo()
        .create(&validated, user.id, "en")
        .await?;

    Ok((
        StatusCode::CREATED,
        axum::Json(CreateProjectResponse { project_id }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}",
    params(
        ("id" = i64, Path, description = "Unique project ID"),
        GetProjectQuery,
    ),
    responses(
        (status = 200, description = "Project found", body = ProjectResponse),
        (status = 403, description = "Private project", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<GetProjectQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let detail = state
        .db
        .project_repo()
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    sweep_stale_locks(&state, id).await;

    require_visible(&state, user.as_ref(), id).await?;

    if query.abbreviated.unwrap_or(false) {
        return Ok(axum::Json(ProjectStateResponse::from_detail(&detail)).into_response());
    }

    let locale = preferred_locale(&headers);
    let body = ProjectResponse::from_detail(&detail, &locale, true);
    if query.as_file.unwrap_or(false) {
        return attachment(&format!("project_{id}.json"), &body);
    }
    Ok(axum::Json(body).into_response())
}

#[utoipa::path(
    head,
    path = "/api/v2/projects/{id}",
    params(("id" = i64, Path, description = "Unique project ID")),
    responses(
        (status = 200, description = "Caller may administer the project"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn head_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&state, &user, id).await?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    patch,
    path = "/api/v2/projects/{id}",
    params(("id" = i64, Path, description = "Unique project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = StatusResponse),
        (status = 400, description = "Invalid request", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    axum::Json(body): axum::Json<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&state, &user, id).await?;

    let update = body.into_update()?;
    update.validate()?;
    state.db.project_repo().update(id, &update).await?;

    state.summary_cache.invalidate_all();

    Ok(axum::Json(StatusResponse { status: "Updated" }))
}

#[utoipa::path(
    delete,
    path = "/api/v2/projects/{id}",
    params(("id" = i64, Path, description = "Unique project ID")),
    responses(
        (status = 200, description = "Project deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&state, &user, id).await?;

    if state.db.project_repo().has_mapping_activity(id).await? {
        return Err(AppError::HasMappedTasks.into());
    }
    state.db.project_repo().delete(id).await?;

    Ok(axum::Json(SuccessResponse {
        success: "Project deleted",
    }))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v2/projects",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results", body = SearchResponse),
        (status = 400, description = "Invalid filters", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn search_projects(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<SearchQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let locale = preferred_locale(&headers);
    let search = query.into_search(user.as_ref(), locale)?;
    let viewer = user.as_ref().map(|u| SearchViewer {
        user_id: u.id,
        is_admin: u.is_admin(),
    });

    let page = state.db.search_repo().search(&search, viewer).await?;

    let map_results = if search.omit_map_results {
        json!({})
    } else {
        centroid_map_results(&page.cards)
    };

    let pages = ProjectSearch::pages(page.total);
    let pagination = PaginationDto {
        page: search.page,
        pages,
        total: page.total,
        per_page: PAGE_SIZE,
        has_next: i64::from(search.page) < pages,
        has_prev: search.page > 1,
    };

    Ok(axum::Json(SearchResponse {
        results: page.cards.into_iter().map(Into::into).collect(),
        map_results,
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/bbox",
    params(BboxQuery),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of matching project AOIs"),
        (status = 400, description = "Invalid bbox", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn bbox_projects(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<BboxQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let managed = state.db.user_repo().managed_org_ids(user.id).await?;
    if !permission::is_org_manager(&user, &managed) {
        return Err(AppError::PermissionDenied.into());
    }

    let mut search = BboxSearch::parse(&query.bbox, query.srid.unwrap_or(4326))?;
    if query.created_by_me.unwrap_or(false) {
        search.author_id = Some(user.id);
    }

    let rows = state.db.search_repo().bbox_projects(&search).await?;
    Ok(axum::Json(aoi_feature_collection(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/myself/owner",
    responses(
        (status = 200, description = "Projects grouped by status", body = OwnerProjectsResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn owner_projects(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let managed = state.db.user_repo().managed_org_ids(user.id).await?;
    if !permission::is_org_manager(&user, &managed) {
        return Err(AppError::PermissionDenied.into());
    }

    let locale = preferred_locale(&headers);
    let cards = state.db.search_repo().owner_projects(user.id, &locale).await?;

    let mut response = OwnerProjectsResponse {
        active_projects: Vec::new(),
        draft_projects: Vec::new(),
        archived_projects: Vec::new(),
    };
    for card in cards {
        let dto = ProjectCardDto::from(card.clone());
        match card.status {
            mapforge_core::ProjectStatus::Published => response.active_projects.push(dto),
            mapforge_core::ProjectStatus::Draft => response.draft_projects.push(dto),
            mapforge_core::ProjectStatus::Archived => response.archived_projects.push(dto),
        }
    }

    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/{id}/touched",
    params(("id" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Projects the user has mapped", body = TouchedResponse),
        (status = 404, description = "User not found", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn touched_projects(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .user_repo()
        .get_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    let rows = state.db.search_repo().touched_by(user.id).await?;
    Ok(axum::Json(TouchedResponse {
        mapped_projects: rows.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/featured",
    responses(
        (status = 200, description = "Featured projects", body = ProjectListResponse),
    ),
    tag = "projects"
)]
pub async fn featured_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let locale = preferred_locale(&headers);
    let cards = state.db.search_repo().featured(&locale).await?;
    Ok(axum::Json(ProjectListResponse {
        results: cards.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/{id}/similar-projects",
    params(
        ("id" = i64, Path, description = "Project ID to find similar projects for"),
        SimilarQuery,
    ),
    responses(
        (status = 200, description = "Similar projects", body = ProjectListResponse),
        (status = 404, description = "Project not found or not published", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn similar_projects(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<SimilarQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let target = state
        .db
        .project_repo()
        .get(id)
        .await?
        .filter(|p| p.status == mapforge_core::ProjectStatus::Published)
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    let include_private = user.as_ref().is_some_and(User::is_admin);
    let candidates = state
        .db
        .search_repo()
        .similar_candidates(id, include_private)
        .await?;

    let limit = query.limit.unwrap_or(4).min(20);
    let ranked = recommendation::rank_similar(&target, candidates, limit);

    Ok(axum::Json(ProjectListResponse {
        results: ranked.iter().map(ProjectCardDto::from_project).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/queries/active",
    params(ActiveQuery),
    responses(
        (status = 200, description = "GeoJSON FeatureCollection of recently active projects"),
        (status = 400, description = "Invalid interval", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn active_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActiveQuery>,
) -> Result<impl IntoResponse, ApiError> {
    const INTERVAL_MESSAGE: &str =
        "Interval must be a number greater than 0 and less than or equal to 24";

    let raw = query.interval.unwrap_or_else(|| "24".to_string());
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::InvalidData(INTERVAL_MESSAGE.to_string()).into());
    }
    let interval: i64 = raw
        .parse()
        .map_err(|_| AppError::InvalidData(INTERVAL_MESSAGE.to_string()))?;
    if interval == 0 || interval > 24 {
        return Err(AppError::InvalidData(INTERVAL_MESSAGE.to_string()).into());
    }

    let rows = state.db.search_repo().active_projects(interval).await?;
    Ok(axum::Json(aoi_feature_collection(rows)))
}

// ---------------------------------------------------------------------------
// Project queries
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}/queries/summary",
    params(("id" = i64, Path, description = "Unique project ID")),
    responses(
        (status = 200, description = "Project summary", body = SummaryResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn project_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let locale = preferred_locale(&headers);
    let key = (id, locale.clone());

    if let Some(cached) = state.summary_cache.get(&key).await {
        return Ok(axum::Json(cached));
    }

    let detail = state
        .db
        .project_repo()
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    let summary = SummaryResponse::from_detail(&detail, &locale);
    state.summary_cache.insert(key, summary.clone()).await;
    Ok(axum::Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}/queries/nogeometries",
    params(
        ("id" = i64, Path, description = "Unique project ID"),
        FileQuery,
    ),
    responses(
        (status = 200, description = "Project without task geometries", body = ProjectResponse),
        (status = 403, description = "Private project", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn project_no_geometries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let detail = state
        .db
        .project_repo()
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    sweep_stale_locks(&state, id).await;

    require_visible(&state, None, id).await?;

    let locale = preferred_locale(&headers);
    let body = ProjectResponse::from_detail(&detail, &locale, false);
    if query.as_file.unwrap_or(false) {
        return attachment(&format!("project_{id}.json"), &body);
    }
    Ok(axum::Json(body).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}/queries/notasks",
    params(("id" = i64, Path, description = "Unique project ID")),
    responses(
        (status = 200, description = "Project without the task FeatureCollection", body = ProjectResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "projects"
)]
pub async fn project_no_tasks(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_manager(&state, &user, id).await?;

    let detail = state
        .db
        .project_repo()
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    let locale = preferred_locale(&headers);
    Ok(axum::Json(ProjectResponse::from_detail(&detail, &locale, false)))
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}/queries/aoi",
    params(
        ("id" = i64, Path, description = "Unique project ID"),
        FileQuery,
    ),
    responses(
        (status = 200, description = "AOI geometry as GeoJSON"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn project_aoi(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let project = state
        .db
        .project_repo()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    // File download is the default for the AOI endpoint.
    if query.as_file.unwrap_or(true) {
        return attachment(&format!("{id}.geojson"), &project.aoi);
    }
    Ok(axum::Json(project.aoi).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v2/projects/{id}/queries/priority-areas",
    params(("id" = i64, Path, description = "Unique project ID")),
    responses(
        (status = 200, description = "Priority-area polygons"),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "projects"
)]
pub async fn project_priority_areas(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db
        .project_repo()
        .get_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

    Ok(axum::Json(detail.priority_areas))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = match state.db.health_check().await {
        Ok(()) => "ok",
        Err(_) => "error",
    };

    let status = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        database: db_status,
    };

    (status, axum::Json(response))
}
