use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::tmdb::{TmdbGenre, TmdbMovie};

/// Release dates arrive from TMDB as `YYYY-MM-DD` text
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a TMDB release date, yielding `None` for blank or malformed text
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), RELEASE_DATE_FORMAT).ok()
}

/// Genre keyed by TMDB's genre id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

impl From<TmdbGenre> for Genre {
    fn from(genre: TmdbGenre) -> Self {
        Self {
            id: genre.id,
            name: genre.name,
        }
    }
}

/// Locally cached movie, a best-effort mirror of the TMDB record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Movie {
    /// Internal row id
    pub id: i64,
    /// TMDB id, unique across the store
    pub tmdb_id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i32>,
    pub popularity: Option<f64>,
    pub adult: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub genres: Vec<Genre>,
}

impl Movie {
    /// Re-ranking score: `vote_average * popularity`
    ///
    /// A missing rating counts as 0 but a missing popularity counts as 1, so
    /// an unknown popularity leaves the rating unscaled instead of zeroing it.
    pub fn composite_score(&self) -> f64 {
        self.vote_average.unwrap_or(0.0) * self.popularity.unwrap_or(1.0)
    }
}

/// Fields for inserting a movie into the local catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i32>,
    pub popularity: Option<f64>,
    pub adult: bool,
    /// Named genres from a detail payload; upserted alongside the movie
    pub genres: Vec<Genre>,
    /// Bare genre ids from a list payload; linked only if already known
    pub genre_ids: Vec<i64>,
}

impl From<&TmdbMovie> for NewMovie {
    fn from(payload: &TmdbMovie) -> Self {
        Self {
            tmdb_id: payload.id,
            title: payload.title.clone(),
            overview: payload.overview.clone().unwrap_or_default(),
            poster_path: payload.poster_path.clone(),
            backdrop_path: payload.backdrop_path.clone(),
            release_date: payload
                .release_date
                .as_deref()
                .and_then(parse_release_date),
            vote_average: payload.vote_average,
            vote_count: payload
                .vote_count
                .and_then(|count| i32::try_from(count).ok()),
            popularity: payload.popularity,
            adult: payload.adult,
            genres: payload.genres.iter().cloned().map(Genre::from).collect(),
            genre_ids: payload.genre_ids.clone(),
        }
    }
}

impl NewMovie {
    /// Every genre id this movie should be linked to
    pub fn all_genre_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.genres.iter().map(|g| g.id).collect();
        for id in &self.genre_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Movie DTO returned to the frontend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieResponse {
    pub id: i64,
    pub tmdb_id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// `YYYY-MM-DD`
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub popularity: Option<f64>,
    pub genres: Vec<Genre>,
}

impl From<&Movie> for MovieResponse {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            release_date: movie
                .release_date
                .map(|date| date.format(RELEASE_DATE_FORMAT).to_string()),
            vote_average: movie.vote_average,
            popularity: movie.popularity,
            genres: movie.genres.clone(),
        }
    }
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        MovieResponse::from(&movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(vote_average: Option<f64>, popularity: Option<f64>) -> Movie {
        Movie {
            id: 1,
            tmdb_id: 100,
            title: "Heat".to_string(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            release_date: None,
            vote_average,
            vote_count: None,
            popularity,
            adult: false,
            created_at: Utc::now(),
            genres: Vec::new(),
        }
    }

    #[test]
    fn test_composite_score_multiplies() {
        assert_eq!(movie(Some(7.5), Some(20.0)).composite_score(), 150.0);
    }

    #[test]
    fn test_missing_popularity_is_neutral() {
        let unknown = movie(Some(8.0), None);
        let zero = movie(Some(8.0), Some(0.0));
        assert_eq!(unknown.composite_score(), 8.0);
        assert_eq!(zero.composite_score(), 0.0);
        assert!(unknown.composite_score() > zero.composite_score());
    }

    #[test]
    fn test_missing_rating_zeroes_score() {
        assert_eq!(movie(None, Some(500.0)).composite_score(), 0.0);
    }

    #[test]
    fn test_parse_release_date() {
        assert_eq!(
            parse_release_date("2010-07-15"),
            NaiveDate::from_ymd_opt(2010, 7, 15)
        );
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("2010"), None);
        assert_eq!(parse_release_date("15/07/2010"), None);
    }

    #[test]
    fn test_new_movie_from_payload() {
        let payload = TmdbMovie {
            id: 27205,
            title: "Inception".to_string(),
            overview: None,
            poster_path: Some("/p.jpg".to_string()),
            backdrop_path: None,
            release_date: Some("not-a-date".to_string()),
            vote_average: Some(8.4),
            vote_count: Some(35000),
            popularity: None,
            adult: false,
            genre_ids: vec![28, 878],
            genres: vec![TmdbGenre {
                id: 28,
                name: "Action".to_string(),
            }],
        };

        let new_movie = NewMovie::from(&payload);
        assert_eq!(new_movie.tmdb_id, 27205);
        assert_eq!(new_movie.overview, "");
        assert_eq!(new_movie.release_date, None);
        assert_eq!(new_movie.vote_count, Some(35000));
        assert_eq!(new_movie.popularity, None);
        assert_eq!(new_movie.all_genre_ids(), vec![28, 878]);
    }

    #[test]
    fn test_response_formats_release_date() {
        let mut m = movie(Some(6.0), Some(3.0));
        m.release_date = NaiveDate::from_ymd_opt(1995, 12, 15);

        let response = MovieResponse::from(&m);
        assert_eq!(response.release_date.as_deref(), Some("1995-12-15"));
        assert_eq!(response.tmdb_id, 100);
    }
}
