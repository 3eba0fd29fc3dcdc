pub mod activity;
pub mod catalog;
pub mod providers;
pub mod recommendations;
pub mod users;

pub use activity::ActivityService;
pub use recommendations::RecommendationEngine;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{TmdbMovie, TmdbPage};

    /// A list-endpoint payload with a poster and no genres
    pub fn tmdb_movie(id: i64, vote_average: f64, popularity: f64) -> TmdbMovie {
        TmdbMovie {
            id,
            title: format!("Movie {}", id),
            overview: Some(String::new()),
            poster_path: Some(format!("/poster{}.jpg", id)),
            backdrop_path: None,
            release_date: Some("2001-09-14".to_string()),
            vote_average: Some(vote_average),
            vote_count: Some(100),
            popularity: Some(popularity),
            adult: false,
            genre_ids: Vec::new(),
            genres: Vec::new(),
        }
    }

    pub fn page_of(results: Vec<TmdbMovie>) -> TmdbPage<TmdbMovie> {
        TmdbPage {
            page: 1,
            total_pages: 1,
            total_results: results.len() as u32,
            results,
        }
    }
}
