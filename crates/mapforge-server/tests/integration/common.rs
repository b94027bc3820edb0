use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tower::ServiceExt;

use mapforge_core::user::{Role, User, hash_token};
use mapforge_db::Database;
use mapforge_server::routes;
use mapforge_server::state::AppState;

pub const ADMIN_TOKEN: &str = "test-admin-key";
pub const MAPPER_TOKEN: &str = "test-mapper-key";
pub const MANAGER_TOKEN: &str = "test-manager-key";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub admin: User,
    pub mapper: User,
    pub manager: User,
    _container: ContainerAsync<GenericImage>,
}

/// Spin up PostgreSQL, migrate, seed three users, and build the router.
pub async fn setup_test_app() -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "mapforge_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/mapforge_test");
    let pool = retry_connect(&url).await;

    let db = Database::from_pool(pool);
    db.migrate().await.expect("Failed to run migrations");

    let admin = db
        .user_repo()
        .create("admin1", Role::Admin, &hash_token(ADMIN_TOKEN))
        .await
        .expect("seed admin");
    let mapper = db
        .user_repo()
        .create("mapper1", Role::Mapper, &hash_token(MAPPER_TOKEN))
        .await
        .expect("seed mapper");
    let manager = db
        .user_repo()
        .create("manager1", Role::Manager, &hash_token(MANAGER_TOKEN))
        .await
        .expect("seed manager");

    let state = Arc::new(AppState::new(db.clone()));

    TestApp {
        router: routes::router(state),
        db,
        admin,
        mapper,
        manager,
        _container: container,
    }
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}

/// Fire a request and return status + parsed JSON body (Null when empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn get_authed(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Standard draft payload over a 1x1 degree square at `offset`.
pub fn draft_body(name: &str, offset: f64) -> serde_json::Value {
    serde_json::json!({
        "projectName": name,
        "areaOfInterest": {
            "type": "Polygon",
            "coordinates": [[
                [offset, offset],
                [offset + 1.0, offset],
                [offset + 1.0, offset + 1.0],
                [offset, offset + 1.0],
                [offset, offset]
            ]]
        },
        "arbitraryTasks": true
    })
}

/// Create a draft project and return its id.
pub async fn create_project(app: &TestApp, token: &str, name: &str, offset: f64) -> i64 {
    let (status, json) = send(
        &app.router,
        json_request("POST", "/api/v2/projects", Some(token), &draft_body(name, offset)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "project creation failed: {json}");
    json["projectId"].as_i64().expect("projectId in response")
}

/// Publish a project through the PATCH endpoint.
pub async fn publish_project(app: &TestApp, token: &str, id: i64) {
    let (status, json) = send(
        &app.router,
        json_request(
            "PATCH",
            &format!("/api/v2/projects/{id}"),
            Some(token),
            &serde_json::json!({ "projectStatus": "PUBLISHED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "publish failed: {json}");
}

/// Record a mapping contribution directly in the database.
pub async fn add_contribution(app: &TestApp, project_id: i64, user_id: i64) {
    sqlx::query(
        "INSERT INTO project_contributions (project_id, user_id, action) VALUES ($1, $2, 'MAPPED')",
    )
    .bind(project_id)
    .bind(user_id)
    .execute(app.db.pool())
    .await
    .expect("insert contribution");
}
