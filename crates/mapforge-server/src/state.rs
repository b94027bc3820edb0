use std::time::Duration;

use moka::future::Cache;

use mapforge_db::Database;

use crate::dto::SummaryResponse;

/// How long cached project summaries stay fresh.
const SUMMARY_CACHE_TTL: Duration = Duration::from_secs(60);

/// Shared application state, available to all route handlers via
/// `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    /// Localized project summaries keyed by `(project_id, locale)`.
    pub summary_cache: Cache<(i64, String), SummaryResponse>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            summary_cache: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(SUMMARY_CACHE_TTL)
                .build(),
        }
    }
}
