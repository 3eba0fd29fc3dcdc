use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    db::{ActivityStore, InMemoryStore, MovieStore, PgStore, UserStore},
    services::{providers::CatalogProvider, ActivityService, RecommendationEngine},
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CatalogProvider>,
    pub movies: Arc<dyn MovieStore>,
    pub users: Arc<dyn UserStore>,
    pub activity: ActivityService,
    pub recommender: RecommendationEngine,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        movies: Arc<dyn MovieStore>,
        activity: Arc<dyn ActivityStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            activity: ActivityService::new(
                provider.clone(),
                movies.clone(),
                activity.clone(),
                users.clone(),
            ),
            recommender: RecommendationEngine::new(provider.clone(), movies.clone(), activity),
            provider,
            movies,
            users,
        }
    }

    /// State backed by a fresh process-local store
    pub fn in_memory(provider: Arc<dyn CatalogProvider>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(provider, store.clone(), store.clone(), store)
    }

    pub fn postgres(provider: Arc<dyn CatalogProvider>, pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(provider, store.clone(), store.clone(), store)
    }
}
