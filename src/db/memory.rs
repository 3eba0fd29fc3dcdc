use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::store::{ActivityStore, MovieStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Genre, Movie, NewMovie, NewUser, ProfileUpdate, Rating, RatingOutcome, RatingValue, User,
        WatchHistoryEntry, WatchlistEntry,
    },
};

/// Process-local store used when no database is configured, and by tests
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<InMemoryInner>>,
}

#[derive(Default)]
struct InMemoryInner {
    next_movie_id: i64,
    next_user_id: i64,
    /// Monotonic counter breaking ties between equal timestamps
    sequence: u64,
    movies: HashMap<i64, Movie>,
    tmdb_index: HashMap<i64, i64>,
    genres: HashMap<i64, Genre>,
    movie_genres: HashMap<i64, Vec<i64>>,
    users: HashMap<i64, User>,
    watch_history: HashMap<i64, Vec<Stamped>>,
    watchlist: HashMap<i64, Vec<Stamped>>,
    ratings: HashMap<(i64, i64), StoredRating>,
}

/// A (movie, time) membership row
#[derive(Clone)]
struct Stamped {
    movie_id: i64,
    at: DateTime<Utc>,
    seq: u64,
}

#[derive(Clone)]
struct StoredRating {
    value: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InMemoryInner {
    fn next_seq(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn with_genres(&self, movie: &Movie) -> Movie {
        let mut movie = movie.clone();
        let mut genres: Vec<Genre> = self
            .movie_genres
            .get(&movie.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        movie.genres = genres;
        movie
    }

    fn movie_by_tmdb(&self, tmdb_id: i64) -> Option<&Movie> {
        self.tmdb_index
            .get(&tmdb_id)
            .and_then(|id| self.movies.get(id))
    }

    fn require_movie(&self, movie_id: i64) -> AppResult<()> {
        if self.movies.contains_key(&movie_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Movie {} is not cached", movie_id)))
        }
    }

    /// Membership rows for a user, newest first
    fn newest_first(&self, rows: Option<&Vec<Stamped>>) -> Vec<(Movie, DateTime<Utc>)> {
        let mut rows: Vec<Stamped> = rows.cloned().unwrap_or_default();
        rows.sort_by(|a, b| b.at.cmp(&a.at).then(b.seq.cmp(&a.seq)));
        rows.into_iter()
            .filter_map(|row| {
                self.movies
                    .get(&row.movie_id)
                    .map(|movie| (self.with_genres(movie), row.at))
            })
            .collect()
    }

    fn name_taken(
        &self,
        except: Option<i64>,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Option<String> {
        self.users
            .values()
            .filter(|user| Some(user.id) != except)
            .find_map(|user| {
                if username.is_some_and(|name| name == user.username) {
                    Some("Username already taken".to_string())
                } else if email.is_some_and(|mail| mail == user.email) {
                    Some("Email already taken".to_string())
                } else {
                    None
                }
            })
    }
}

/// Descending with `None` sorted after every value
fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl MovieStore for InMemoryStore {
    async fn find_by_external_id(&self, tmdb_id: i64) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movie_by_tmdb(tmdb_id).map(|m| inner.with_genres(m)))
    }

    async fn insert_movie(&self, movie: &NewMovie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.movie_by_tmdb(movie.tmdb_id) {
            tracing::debug!(tmdb_id = movie.tmdb_id, "Movie already cached");
            return Ok(inner.with_genres(existing));
        }

        inner.next_movie_id += 1;
        let id = inner.next_movie_id;
        let row = Movie {
            id,
            tmdb_id: movie.tmdb_id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            release_date: movie.release_date,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            adult: movie.adult,
            created_at: Utc::now(),
            genres: Vec::new(),
        };

        for genre in &movie.genres {
            inner.genres.entry(genre.id).or_insert_with(|| genre.clone());
        }
        let linked: Vec<i64> = movie
            .all_genre_ids()
            .into_iter()
            .filter(|genre_id| inner.genres.contains_key(genre_id))
            .collect();

        inner.movie_genres.insert(id, linked);
        inner.tmdb_index.insert(movie.tmdb_id, id);
        inner.movies.insert(id, row);

        let stored = inner.with_genres(&inner.movies[&id]);
        Ok(stored)
    }

    async fn popular_cached(&self, limit: usize) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        let mut movies: Vec<&Movie> = inner.movies.values().filter(|m| !m.adult).collect();
        movies.sort_by(|a, b| {
            desc_nulls_last(a.popularity, b.popularity)
                .then_with(|| desc_nulls_last(a.vote_average, b.vote_average))
                .then(a.id.cmp(&b.id))
        });
        Ok(movies
            .into_iter()
            .take(limit)
            .map(|m| inner.with_genres(m))
            .collect())
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let inner = self.inner.read().await;
        let mut genres: Vec<Genre> = inner.genres.values().cloned().collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn upsert_genres(&self, genres: &[Genre]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        for genre in genres {
            inner.genres.insert(genre.id, genre.clone());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ActivityStore for InMemoryStore {
    async fn recent_watched(
        &self,
        user_id: i64,
        cap: usize,
        exclude_adult: bool,
    ) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .newest_first(inner.watch_history.get(&user_id))
            .into_iter()
            .map(|(movie, _)| movie)
            .filter(|movie| !(exclude_adult && movie.adult))
            .take(cap)
            .collect())
    }

    async fn watch_history(&self, user_id: i64, limit: usize) -> AppResult<Vec<WatchHistoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .newest_first(inner.watch_history.get(&user_id))
            .into_iter()
            .take(limit)
            .map(|(movie, watched_at)| WatchHistoryEntry { movie, watched_at })
            .collect())
    }

    async fn add_watched(&self, user_id: i64, movie_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        inner.require_movie(movie_id)?;

        let seq = inner.next_seq();
        let history = inner.watch_history.entry(user_id).or_default();
        if history.iter().any(|row| row.movie_id == movie_id) {
            return Ok(false);
        }
        history.push(Stamped {
            movie_id,
            at: Utc::now(),
            seq,
        });
        Ok(true)
    }

    async fn remove_watched(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(movie_id) = inner.tmdb_index.get(&tmdb_id).copied() else {
            return Ok(false);
        };
        let Some(history) = inner.watch_history.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = history.len();
        history.retain(|row| row.movie_id != movie_id);
        Ok(history.len() != before)
    }

    async fn watchlist(&self, user_id: i64) -> AppResult<Vec<WatchlistEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .newest_first(inner.watchlist.get(&user_id))
            .into_iter()
            .map(|(movie, added_at)| WatchlistEntry { movie, added_at })
            .collect())
    }

    async fn is_in_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let inner = self.inner.read().await;
        let Some(movie_id) = inner.tmdb_index.get(&tmdb_id) else {
            return Ok(false);
        };
        Ok(inner
            .watchlist
            .get(&user_id)
            .is_some_and(|rows| rows.iter().any(|row| row.movie_id == *movie_id)))
    }

    async fn add_to_watchlist(&self, user_id: i64, movie_id: i64) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.require_movie(movie_id)?;

        let seq = inner.next_seq();
        let list = inner.watchlist.entry(user_id).or_default();
        if !list.iter().any(|row| row.movie_id == movie_id) {
            list.push(Stamped {
                movie_id,
                at: Utc::now(),
                seq,
            });
        }
        Ok(())
    }

    async fn remove_from_watchlist(&self, user_id: i64, tmdb_id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(movie_id) = inner.tmdb_index.get(&tmdb_id).copied() else {
            return Ok(false);
        };
        let Some(list) = inner.watchlist.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|row| row.movie_id != movie_id);
        Ok(list.len() != before)
    }

    async fn upsert_rating(
        &self,
        user_id: i64,
        movie_id: i64,
        rating: RatingValue,
    ) -> AppResult<RatingOutcome> {
        let mut inner = self.inner.write().await;
        inner.require_movie(movie_id)?;

        let now = Utc::now();
        match inner.ratings.get_mut(&(user_id, movie_id)) {
            Some(existing) => {
                existing.value = rating.get();
                existing.updated_at = now;
                Ok(RatingOutcome::Updated)
            }
            None => {
                inner.ratings.insert(
                    (user_id, movie_id),
                    StoredRating {
                        value: rating.get(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(RatingOutcome::Created)
            }
        }
    }

    async fn rating_for(&self, user_id: i64, tmdb_id: i64) -> AppResult<Option<Rating>> {
        let inner = self.inner.read().await;
        let Some(movie) = inner.movie_by_tmdb(tmdb_id) else {
            return Ok(None);
        };
        Ok(inner
            .ratings
            .get(&(user_id, movie.id))
            .map(|stored| Rating {
                movie: inner.with_genres(movie),
                rating: stored.value,
                rated_at: stored.created_at,
                updated_at: stored.updated_at,
            }))
    }

    async fn ratings(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let inner = self.inner.read().await;
        let mut ratings: Vec<Rating> = inner
            .ratings
            .iter()
            .filter(|((owner, _), _)| *owner == user_id)
            .filter_map(|((_, movie_id), stored)| {
                inner.movies.get(movie_id).map(|movie| Rating {
                    movie: inner.with_genres(movie),
                    rating: stored.value,
                    rated_at: stored.created_at,
                    updated_at: stored.updated_at,
                })
            })
            .collect();
        ratings.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(a.movie.id.cmp(&b.movie.id))
        });
        Ok(ratings)
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(reason) = inner.name_taken(None, Some(&user.username), Some(&user.email)) {
            return Err(AppError::Conflict(reason));
        }

        inner.next_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: inner.next_user_id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            hashed_password: user.hashed_password.clone(),
            avatar_url: None,
            location: user.location.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        if let Some(reason) = inner.name_taken(
            Some(user_id),
            update.username.as_deref(),
            update.email.as_deref(),
        ) {
            return Err(AppError::Conflict(reason));
        }

        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(username) = &update.username {
            user.username = username.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        if let Some(avatar_url) = &update.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        if !update.is_empty() {
            user.updated_at = Utc::now();
        }
        Ok(user.clone())
    }
}
