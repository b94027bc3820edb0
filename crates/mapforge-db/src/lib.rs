pub mod config;
pub mod database;
pub mod project_repository;
pub mod search_repository;
pub mod user_repository;

pub use config::DatabaseConfig;
pub use database::Database;
pub use project_repository::ProjectRepository;
pub use search_repository::{
    ExportRow, ProjectCard, ProjectGeometry, ProjectSearchRepository, SearchPage, SearchViewer,
    TouchedProject,
};
pub use user_repository::UserRepository;
