use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::{ActivityStore, MovieStore},
    error::AppResult,
    models::{Movie, NewMovie, TmdbMovie},
    services::providers::CatalogProvider,
};

/// Most recently watched movies used as seeds
pub const SEED_LIMIT: usize = 5;
/// Candidates taken from each seed's related list
pub const CANDIDATES_PER_SEED: usize = 3;

/// Where a seed's candidates came from, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateSource {
    Recommendations,
    Similar,
    None,
}

/// Personalized recommendations from a user's recent watches
///
/// Related titles for each seed come from the remote catalog and are
/// cached locally as they are discovered. The result is ranked by
/// `Movie::composite_score`. Whenever nothing personal can be produced, or
/// anything goes wrong on the way, the popularity fallback is returned
/// instead: `recommend` never fails.
#[derive(Clone)]
pub struct RecommendationEngine {
    provider: Arc<dyn CatalogProvider>,
    movies: Arc<dyn MovieStore>,
    activity: Arc<dyn ActivityStore>,
}

impl RecommendationEngine {
    pub fn new(
        provider: Arc<dyn CatalogProvider>,
        movies: Arc<dyn MovieStore>,
        activity: Arc<dyn ActivityStore>,
    ) -> Self {
        Self {
            provider,
            movies,
            activity,
        }
    }

    /// Up to `limit` movies for the user, best first
    pub async fn recommend(&self, user_id: i64, limit: usize) -> Vec<Movie> {
        match self.personalized(user_id, limit).await {
            Ok(Some(movies)) => {
                tracing::info!(user_id, count = movies.len(), "Personalized recommendations");
                movies
            }
            Ok(None) => {
                tracing::debug!(user_id, "No personal signal, using popularity fallback");
                self.popularity_fallback(limit).await
            }
            Err(e) => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    "Recommendation failed, degrading to popularity fallback"
                );
                self.popularity_fallback(limit).await
            }
        }
    }

    /// `None` when the user has no usable seeds or no seed yielded a new
    /// candidate
    async fn personalized(&self, user_id: i64, limit: usize) -> AppResult<Option<Vec<Movie>>> {
        let seeds = self
            .activity
            .recent_watched(user_id, SEED_LIMIT, true)
            .await?;
        if seeds.is_empty() {
            return Ok(None);
        }
        tracing::debug!(user_id, seeds = seeds.len(), "Collected seed movies");

        let mut seen: HashSet<i64> = seeds.iter().map(|movie| movie.tmdb_id).collect();
        let mut picked: Vec<Movie> = Vec::new();

        for seed in &seeds {
            let (source, candidates) = self.candidates_for(seed.tmdb_id).await;
            tracing::debug!(
                seed = seed.tmdb_id,
                ?source,
                candidates = candidates.len(),
                "Seed expanded"
            );

            for candidate in candidates {
                if seen.contains(&candidate.id) {
                    continue;
                }
                let movie = self.cache_candidate(&candidate).await?;
                seen.insert(candidate.id);
                picked.push(movie);
            }
        }

        if picked.is_empty() {
            return Ok(None);
        }

        // sort_by is stable: equal scores keep discovery order
        picked.sort_by(|a, b| b.composite_score().total_cmp(&a.composite_score()));
        picked.truncate(limit);
        Ok(Some(picked))
    }

    /// First non-adult entries of the seed's recommendations, or of its
    /// similar list when recommendations come back empty
    ///
    /// A failed remote call counts as an empty list.
    async fn candidates_for(&self, seed: i64) -> (CandidateSource, Vec<TmdbMovie>) {
        let recommended = match self.provider.recommendations(seed).await {
            Ok(page) => page.results,
            Err(e) => {
                tracing::warn!(seed, error = %e, "Recommendations unavailable for seed");
                Vec::new()
            }
        };

        let (source, list) = if !recommended.is_empty() {
            (CandidateSource::Recommendations, recommended)
        } else {
            match self.provider.similar(seed, 1).await {
                Ok(page) if !page.results.is_empty() => (CandidateSource::Similar, page.results),
                Ok(_) => (CandidateSource::None, Vec::new()),
                Err(e) => {
                    tracing::warn!(seed, error = %e, "Similar list unavailable for seed");
                    (CandidateSource::None, Vec::new())
                }
            }
        };

        let candidates = list
            .into_iter()
            .filter(|movie| !movie.adult)
            .take(CANDIDATES_PER_SEED)
            .collect();
        (source, candidates)
    }

    async fn cache_candidate(&self, candidate: &TmdbMovie) -> AppResult<Movie> {
        if let Some(movie) = self.movies.find_by_external_id(candidate.id).await? {
            return Ok(movie);
        }
        self.movies.insert_movie(&NewMovie::from(candidate)).await
    }

    /// Cached non-adult movies by popularity then rating
    ///
    /// A store failure here yields an empty list.
    pub async fn popularity_fallback(&self, limit: usize) -> Vec<Movie> {
        match self.movies.popular_cached(limit).await {
            Ok(movies) => movies,
            Err(e) => {
                tracing::error!(error = %e, "Popularity fallback unavailable");
                Vec::new()
            }
        }
    }
}
