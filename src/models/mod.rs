mod activity;
mod movie;
mod tmdb;
mod user;

pub use activity::{
    MovieRef, RateMovieRequest, Rating, RatingItem, RatingOutcome, RatingValue,
    WatchHistoryEntry, WatchHistoryItem, WatchlistEntry, WatchlistItem, MAX_RATING, MIN_RATING,
};
pub use movie::{parse_release_date, Genre, Movie, MovieResponse, NewMovie};
pub use tmdb::{DiscoverFilter, TmdbGenre, TmdbGenreList, TmdbMovie, TmdbPage};
pub use user::{NewUser, ProfileUpdate, User, UserResponse};
