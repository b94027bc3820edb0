use axum::http::StatusCode;
use serde_json::json;

use crate::common::{
    ADMIN_TOKEN, MANAGER_TOKEN, MAPPER_TOKEN, create_project, draft_body, get, get_authed,
    json_request, publish_project, send, setup_test_app,
};

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn create_project_requires_auth() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        json_request("POST", "/api/v2/projects", None, &draft_body("No auth", 0.0)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["SubCode"], "InvalidToken");
}

#[tokio::test]
async fn create_and_get_project() {
    let app = setup_test_app().await;

    let id = create_project(&app, MAPPER_TOKEN, "Village buildings", 12.0).await;

    let (status, json) = send(&app.router, get(&format!("/api/v2/projects/{id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["projectId"], id);
    assert_eq!(json["status"], "DRAFT");
    assert_eq!(json["author"], "mapper1");
    assert_eq!(json["projectInfo"]["name"], "Village buildings");
    assert_eq!(json["aoiBbox"][0], 12.0);
    assert_eq!(json["totalTasks"], 1);
    assert_eq!(json["tasks"]["type"], "FeatureCollection");
}

#[tokio::test]
async fn create_project_rejects_invalid_geojson() {
    let app = setup_test_app().await;

    let body = json!({
        "projectName": "Broken geometry",
        "areaOfInterest": { "type": "Point", "coordinates": [1.0, 2.0] },
        "arbitraryTasks": true
    });
    let (status, json) = send(
        &app.router,
        json_request("POST", "/api/v2/projects", Some(MAPPER_TOKEN), &body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["SubCode"], "InvalidGeoJson");
}

#[tokio::test]
async fn get_missing_project_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = send(&app.router, get("/api/v2/projects/9999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["SubCode"], "NotFound");
}

#[tokio::test]
async fn abbreviated_view_returns_state_only() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "State check", 3.0).await;

    let (status, json) = send(
        &app.router,
        get(&format!("/api/v2/projects/{id}?abbreviated=true")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["projectId"], id);
    assert_eq!(json["status"], "DRAFT");
    assert!(json.get("areaOfInterest").is_none());
}

#[tokio::test]
async fn as_file_download_sets_attachment_header() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Download me", 7.0).await;

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        get(&format!("/api/v2/projects/{id}?asFile=true")),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains(&format!("project_{id}.json")), "{disposition}");
}

#[tokio::test]
async fn private_project_is_gated() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Private effort", 4.0).await;

    let (status, _) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MAPPER_TOKEN),
            &json!({ "private": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Anonymous and unrelated callers are rejected.
    let (status, json) = send(&app.router, get(&format!("/api/v2/projects/{id}"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["SubCode"], "PrivateProject");

    let (status, _) = send(
        &app.router,
        get_authed(&format!("/api/v2/projects/{id}"), MANAGER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The author still sees it.
    let (status, _) = send(
        &app.router,
        get_authed(&format!("/api/v2/projects/{id}"), MAPPER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Allow-listed users regain access.
    let (status, _) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MAPPER_TOKEN),
            &json!({ "allowedUsernames": ["manager1"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        get_authed(&format!("/api/v2/projects/{id}"), MANAGER_TOKEN),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn update_requires_manager_permission() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Untouchable", 8.0).await;

    // An unrelated user may not update.
    let (status, json) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MANAGER_TOKEN),
            &json!({ "projectStatus": "PUBLISHED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["SubCode"], "UserPermissionError");

    // The author may.
    let (status, json) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MAPPER_TOKEN),
            &json!({ "projectStatus": "PUBLISHED", "campaign": "health" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Status"], "Updated");

    // So may a platform admin.
    let (status, _) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(ADMIN_TOKEN),
            &json!({ "projectPriority": "URGENT" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app.router, get(&format!("/api/v2/projects/{id}"))).await;
    assert_eq!(json["status"], "PUBLISHED");
    assert_eq!(json["projectPriority"], "URGENT");
    assert_eq!(json["campaign"], "health");
}

#[tokio::test]
async fn update_rejects_invalid_enum_values() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Bad patch", 9.0).await;

    let (status, json) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MAPPER_TOKEN),
            &json!({ "projectStatus": "LAUNCHED" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["SubCode"], "InvalidData");
}

#[tokio::test]
async fn localized_texts_follow_accept_language() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Localized", 5.0).await;

    let (status, _) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(MAPPER_TOKEN),
            &json!({
                "projectInfoLocales": [
                    { "locale": "en", "name": "Localized" },
                    { "locale": "pt", "name": "Localizado" }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = axum::http::Request::get(format!("/api/v2/projects/{id}"))
        .header("accept-language", "pt-BR,pt;q=0.9")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["projectInfo"]["name"], "Localizado");

    // Unknown locales fall back to the default one.
    let request = axum::http::Request::get(format!("/api/v2/projects/{id}"))
        .header("accept-language", "fr")
        .body(axum::body::Body::empty())
        .unwrap();
    let (_, json) = send(&app.router, request).await;
    assert_eq!(json["projectInfo"]["name"], "Localized");
}

#[tokio::test]
async fn head_probes_manager_permission() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Probe", 6.0).await;

    let request = axum::http::Request::head(format!("/api/v2/projects/{id}"))
        .header("authorization", format!("Bearer {MAPPER_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let request = axum::http::Request::head(format!("/api/v2/projects/{id}"))
        .header("authorization", format!("Bearer {MANAGER_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = axum::http::Request::head(format!("/api/v2/projects/{id}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_project_lifecycle() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Doomed", 2.0).await;

    // Unrelated users may not delete.
    let request = axum::http::Request::delete(format!("/api/v2/projects/{id}"))
        .header("authorization", format!("Bearer {MANAGER_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["SubCode"], "UserPermissionError");

    let request = axum::http::Request::delete(format!("/api/v2/projects/{id}"))
        .header("authorization", format!("Bearer {MAPPER_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["Success"], "Project deleted");

    let (status, _) = send(&app.router, get(&format!("/api/v2/projects/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_blocked_by_mapping_activity() {
    let app = setup_test_app().await;
    let id = create_project(&app, MAPPER_TOKEN, "Busy project", 1.0).await;
    publish_project(&app, MAPPER_TOKEN, id).await;
    crate::common::add_contribution(&app, id, app.manager.id).await;

    let request = axum::http::Request::delete(format!("/api/v2/projects/{id}"))
        .header("authorization", format!("Bearer {MAPPER_TOKEN}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["SubCode"], "HasMappedTasks");
}
