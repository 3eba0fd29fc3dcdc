use serde::{Deserialize, Serialize};

// ============================================================================
// TMDB API Types
// ============================================================================

/// A movie as returned by TMDB list endpoints and `/movie/{id}`
///
/// List endpoints carry `genre_ids`; the detail endpoint carries `genres`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbMovie {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

/// TMDB occasionally sends `"title": null`; treat it like a missing title
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

/// Response of `/genre/movie/list`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
}

/// Paged list response shared by search, popular, similar, recommendations
/// and discover
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> TmdbPage<T> {
    /// The "empty result object" callers get when the catalog is unavailable
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            results: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }

    /// Keeps matching results, recounting `total_results` for this page
    pub fn retain(mut self, keep: impl FnMut(&T) -> bool) -> Self {
        self.results.retain(keep);
        self.total_results = self.results.len() as u32;
        self
    }
}

impl TmdbPage<TmdbMovie> {
    pub fn without_adult(self) -> Self {
        self.retain(|movie| !movie.adult)
    }
}

/// Filters accepted by `/discover/movie`
///
/// There is intentionally no adult switch here: the client always sends
/// `include_adult=false` and filters cannot override it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DiscoverFilter {
    #[serde(default)]
    pub with_genres: Vec<i64>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub primary_release_year: Option<i32>,
    #[serde(default)]
    pub min_vote_average: Option<f64>,
}

impl DiscoverFilter {
    pub fn by_genres(genre_ids: Vec<i64>, page: u32) -> Self {
        Self {
            with_genres: genre_ids,
            sort_by: Some("popularity.desc".to_string()),
            page: Some(page),
            ..Default::default()
        }
    }

    /// Query pairs in a stable order, also used as the cache key
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.with_genres.is_empty() {
            let ids: Vec<String> = self.with_genres.iter().map(|id| id.to_string()).collect();
            params.push(("with_genres", ids.join(",")));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sort_by", sort_by.clone()));
        }
        if let Some(year) = self.primary_release_year {
            params.push(("primary_release_year", year.to_string()));
        }
        if let Some(min) = self.min_vote_average {
            params.push(("vote_average.gte", min.to_string()));
        }
        params.push(("page", self.page.unwrap_or(1).to_string()));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untitled_entry_does_not_poison_page() {
        let json = r#"{
            "page": 1,
            "results": [
                {"id": 1, "title": "Titled"},
                {"id": 2},
                {"id": 3, "title": null}
            ]
        }"#;

        let page: TmdbPage<TmdbMovie> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 3);
        assert_eq!(page.results[1].title, "");
        assert_eq!(page.results[2].title, "");
    }

    #[test]
    fn test_list_movie_deserialization() {
        let json = r#"{
            "adult": false,
            "backdrop_path": "/bd.jpg",
            "genre_ids": [28, 878],
            "id": 27205,
            "overview": "Cobb steals secrets.",
            "popularity": 83.95,
            "poster_path": "/inception.jpg",
            "release_date": "2010-07-15",
            "title": "Inception",
            "vote_average": 8.4,
            "vote_count": 35000
        }"#;

        let movie: TmdbMovie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 27205);
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.genre_ids, vec![28, 878]);
        assert!(movie.genres.is_empty());
        assert_eq!(movie.popularity, Some(83.95));
        assert!(!movie.adult);
    }

    #[test]
    fn test_sparse_movie_deserialization() {
        let json = r#"{ "id": 7, "title": "Untitled", "release_date": null }"#;

        let movie: TmdbMovie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.overview, None);
        assert_eq!(movie.release_date, None);
        assert_eq!(movie.vote_average, None);
        assert_eq!(movie.popularity, None);
        assert!(!movie.adult);
    }

    #[test]
    fn test_detail_genres_deserialization() {
        let json = r#"{
            "id": 603,
            "title": "The Matrix",
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}]
        }"#;

        let movie: TmdbMovie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.genres.len(), 2);
        assert_eq!(movie.genres[1].name, "Science Fiction");
    }

    #[test]
    fn test_page_defaults_when_fields_missing() {
        let page: TmdbPage<TmdbMovie> = serde_json::from_str("{}").unwrap();
        assert_eq!(page.page, 1);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_without_adult_recounts() {
        let json = r#"{
            "page": 2,
            "results": [
                {"id": 1, "title": "A", "adult": false},
                {"id": 2, "title": "B", "adult": true}
            ],
            "total_pages": 9,
            "total_results": 170
        }"#;

        let page: TmdbPage<TmdbMovie> = serde_json::from_str(json).unwrap();
        let page = page.without_adult();
        assert_eq!(page.page, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.total_results, 1);
        assert_eq!(page.total_pages, 9);
    }

    #[test]
    fn test_discover_filter_query() {
        let filter = DiscoverFilter::by_genres(vec![28, 12], 3);
        assert_eq!(
            filter.to_query(),
            vec![
                ("with_genres", "28,12".to_string()),
                ("sort_by", "popularity.desc".to_string()),
                ("page", "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_discover_filter_defaults_to_first_page() {
        let filter = DiscoverFilter {
            primary_release_year: Some(1999),
            ..Default::default()
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("primary_release_year", "1999".to_string()),
                ("page", "1".to_string()),
            ]
        );
    }
}
