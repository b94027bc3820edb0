use serde_json::json;

use mapforge_core::project::{DraftProject, ProjectInfo, ProjectStatus, ProjectUpdate};
use mapforge_core::search::{BboxSearch, ProjectSearch};
use mapforge_core::user::{Role, hash_token};

use crate::common::setup_test_db;

fn square_aoi(offset: f64) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [offset, offset],
            [offset + 1.0, offset],
            [offset + 1.0, offset + 1.0],
            [offset, offset + 1.0],
            [offset, offset]
        ]]
    })
}

fn draft(name: &str, offset: f64) -> DraftProject {
    DraftProject {
        name: name.to_string(),
        area_of_interest: square_aoi(offset),
        tasks: None,
        arbitrary_tasks: true,
        organisation_id: None,
    }
}

#[tokio::test]
async fn project_crud_round_trip() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author1", Role::Mapper, &hash_token("t1"))
        .await
        .unwrap();

    let validated = draft("Flood mapping", 10.0).validate().unwrap();
    let id = db
        .project_repo()
        .create(&validated, author.id, "en")
        .await
        .unwrap();

    let detail = db.project_repo().get_detail(id).await.unwrap().unwrap();
    assert_eq!(detail.project.name, "Flood mapping");
    assert_eq!(detail.project.status, ProjectStatus::Draft);
    assert_eq!(detail.project.total_tasks, 1);
    assert_eq!(detail.author_username, "author1");
    assert_eq!(detail.locales.len(), 1);
    assert_eq!(detail.project.bbox.as_array(), [10.0, 10.0, 11.0, 11.0]);

    let update = ProjectUpdate {
        status: Some(ProjectStatus::Published),
        campaign: Some("floods".to_string()),
        locales: Some(vec![
            ProjectInfo {
                locale: "en".to_string(),
                name: "Flood mapping 2024".to_string(),
                short_description: Some("Map the flood zone".to_string()),
                description: None,
                instructions: None,
            },
            ProjectInfo {
                locale: "pt".to_string(),
                name: "Mapeamento de enchentes".to_string(),
                short_description: None,
                description: None,
                instructions: None,
            },
        ]),
        ..Default::default()
    };
    db.project_repo().update(id, &update).await.unwrap();

    let detail = db.project_repo().get_detail(id).await.unwrap().unwrap();
    assert_eq!(detail.project.status, ProjectStatus::Published);
    assert_eq!(detail.project.campaign.as_deref(), Some("floods"));
    // Denormalized name follows the default-locale translation.
    assert_eq!(detail.project.name, "Flood mapping 2024");
    assert_eq!(detail.locales.len(), 2);
    assert_eq!(detail.info_for_locale("pt").name, "Mapeamento de enchentes");

    db.project_repo().delete(id).await.unwrap();
    assert!(db.project_repo().get_detail(id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_resolves_allowed_usernames() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author2", Role::Mapper, &hash_token("t2"))
        .await
        .unwrap();
    db.user_repo()
        .create("friend", Role::Mapper, &hash_token("t3"))
        .await
        .unwrap();

    let validated = draft("Private build", 0.0).validate().unwrap();
    let id = db
        .project_repo()
        .create(&validated, author.id, "en")
        .await
        .unwrap();

    let update = ProjectUpdate {
        private: Some(true),
        allowed_usernames: Some(vec!["friend".to_string()]),
        ..Default::default()
    };
    db.project_repo().update(id, &update).await.unwrap();

    let detail = db.project_repo().get_detail(id).await.unwrap().unwrap();
    assert!(detail.project.private);
    assert_eq!(detail.allowed_usernames, vec!["friend".to_string()]);

    let access = db.project_repo().access(id).await.unwrap().unwrap();
    assert!(access.private);
    assert_eq!(access.allowed_user_ids.len(), 1);

    // Unknown usernames roll the whole update back.
    let bad = ProjectUpdate {
        allowed_usernames: Some(vec!["nobody".to_string()]),
        ..Default::default()
    };
    assert!(db.project_repo().update(id, &bad).await.is_err());
    let detail = db.project_repo().get_detail(id).await.unwrap().unwrap();
    assert_eq!(detail.allowed_usernames, vec!["friend".to_string()]);
}

#[tokio::test]
async fn search_filters_and_visibility() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author3", Role::Mapper, &hash_token("t4"))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for (name, offset) in [("Kenya buildings", 30.0), ("Peru roads", -70.0)] {
        let validated = draft(name, offset).validate().unwrap();
        ids.push(
            db.project_repo()
                .create(&validated, author.id, "en")
                .await
                .unwrap(),
        );
    }
    // Publish only the first.
    db.project_repo()
        .update(
            ids[0],
            &ProjectUpdate {
                status: Some(ProjectStatus::Published),
                campaign: Some("missing maps".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Anonymous default search sees published projects only.
    let page = db
        .search_repo()
        .search(&ProjectSearch::default(), None)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.cards[0].id, ids[0]);
    assert_eq!(page.cards[0].campaign.as_deref(), Some("missing maps"));

    // Text search matches the project name.
    let search = ProjectSearch {
        text_search: Some("kenya".to_string()),
        ..Default::default()
    };
    assert_eq!(db.search_repo().search(&search, None).await.unwrap().total, 1);

    let search = ProjectSearch {
        text_search: Some("antarctica".to_string()),
        ..Default::default()
    };
    assert_eq!(db.search_repo().search(&search, None).await.unwrap().total, 0);

    // Campaign filter.
    let search = ProjectSearch {
        campaign: Some("missing maps".to_string()),
        ..Default::default()
    };
    assert_eq!(db.search_repo().search(&search, None).await.unwrap().total, 1);
}

#[tokio::test]
async fn bbox_query_uses_overlap() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author4", Role::Manager, &hash_token("t5"))
        .await
        .unwrap();

    let inside = draft("Inside box", 10.0).validate().unwrap();
    let outside = draft("Outside box", 50.0).validate().unwrap();
    let inside_id = db
        .project_repo()
        .create(&inside, author.id, "en")
        .await
        .unwrap();
    db.project_repo()
        .create(&outside, author.id, "en")
        .await
        .unwrap();

    let search = BboxSearch::parse("9.5,9.5,12.0,12.0", 4326).unwrap();
    let rows = db.search_repo().bbox_projects(&search).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, inside_id);
}

#[tokio::test]
async fn touched_and_active_follow_contributions() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author5", Role::Mapper, &hash_token("t6"))
        .await
        .unwrap();
    let mapper = db
        .user_repo()
        .create("mapper5", Role::Mapper, &hash_token("t7"))
        .await
        .unwrap();

    let validated = draft("Active area", 20.0).validate().unwrap();
    let id = db
        .project_repo()
        .create(&validated, author.id, "en")
        .await
        .unwrap();
    db.project_repo()
        .update(
            id,
            &ProjectUpdate {
                status: Some(ProjectStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(db.search_repo().touched_by(mapper.id).await.unwrap().is_empty());
    assert!(db.search_repo().active_projects(24).await.unwrap().is_empty());

    sqlx::query(
        "INSERT INTO project_contributions (project_id, user_id, action) VALUES ($1, $2, 'MAPPED')",
    )
    .bind(id)
    .bind(mapper.id)
    .execute(db.pool())
    .await
    .unwrap();

    let touched = db.search_repo().touched_by(mapper.id).await.unwrap();
    assert_eq!(touched.len(), 1);
    assert_eq!(touched[0].id, id);

    let active = db.search_repo().active_projects(24).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, id);

    // Deleting is now blocked by mapping activity.
    assert!(db.project_repo().has_mapping_activity(id).await.unwrap());
}

#[tokio::test]
async fn stale_locks_are_released() {
    let (db, _container) = setup_test_db().await;
    let author = db
        .user_repo()
        .create("author6", Role::Mapper, &hash_token("t8"))
        .await
        .unwrap();

    let validated = draft("Locked tasks", 5.0).validate().unwrap();
    let id = db
        .project_repo()
        .create(&validated, author.id, "en")
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO task_locks (project_id, task_id, user_id, locked_at)
        VALUES ($1, 1, $2, NOW() - INTERVAL '3 hours'),
               ($1, 2, $2, NOW())
        "#,
    )
    .bind(id)
    .bind(author.id)
    .execute(db.pool())
    .await
    .unwrap();

    let released = db.project_repo().release_stale_locks(id, 2).await.unwrap();
    assert_eq!(released, 1);

    let (remaining,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM task_locks WHERE project_id = $1")
            .bind(id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    assert_eq!(remaining, 1);
}

#[tokio::test]
async fn migrations_are_idempotent_and_tracked() {
    let (db, _container) = setup_test_db().await;
    assert!(db.pending_migrations().await.unwrap().is_empty());
    // Running again is a no-op.
    db.migrate().await.unwrap();
}
