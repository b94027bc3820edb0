use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mapforge API",
        version = "0.2.0",
        description = "Crowdsourced mapping project management: create, search and administer geographic work units."
    ),
    paths(
        crate::routes::create_project,
        crate::routes::get_project,
        crate::routes::head_project,
        crate::routes::update_project,
        crate::routes::delete_project,
        crate::routes::search_projects,
        crate::routes::bbox_projects,
        crate::routes::owner_projects,
        crate::routes::touched_projects,
        crate::routes::featured_projects,
        crate::routes::similar_projects,
        crate::routes::active_projects,
        crate::routes::project_summary,
        crate::routes::project_no_geometries,
        crate::routes::project_no_tasks,
        crate::routes::project_aoi,
        crate::routes::project_priority_areas,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateProjectRequest,
        crate::dto::CreateProjectResponse,
        crate::dto::UpdateProjectRequest,
        crate::dto::ProjectInfoDto,
        crate::dto::ProjectResponse,
        crate::dto::ProjectStateResponse,
        crate::dto::ProjectCardDto,
        crate::dto::PaginationDto,
        crate::dto::SearchResponse,
        crate::dto::ProjectListResponse,
        crate::dto::OwnerProjectsResponse,
        crate::dto::SummaryResponse,
        crate::dto::TouchedDto,
        crate::dto::TouchedResponse,
        crate::dto::StatusResponse,
        crate::dto::SuccessResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "projects", description = "Project management and search"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some("Per-user API key."))
                        .build(),
                ),
            );
        }
    }
}
