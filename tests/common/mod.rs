//! In-memory stores and a fixed movie catalog for driving the router in tests
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum_test::TestServer;
use bson::oid::ObjectId;
use serde_json::{json, Value};

use reelhouse_api::{
    auth::{PasswordHasher, TokenService, MIN_BCRYPT_COST},
    db::{CommentRepository, UserRepository},
    error::{AppError, AppResult},
    models::{
        Comment, FeedCursor, Genre, LibraryEntry, LibraryList, Movie, MovieCategory,
        MovieDetails, MoviePage, Rating, TmdbId, User,
    },
    routes::create_router,
    services::providers::MovieProvider,
    state::AppState,
};

#[derive(Default)]
pub struct MemoryUsers {
    users: Mutex<Vec<User>>,
}

impl MemoryUsers {
    fn update<R>(&self, id: ObjectId, f: impl FnOnce(&mut User) -> R) -> AppResult<R> {
        let mut users = self.users.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(f(user))
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> AppResult<Option<User>> {
        let users = self.users.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(users.iter().find(|u| pred(u)).cloned())
    }
}

fn list_mut(user: &mut User, list: LibraryList) -> &mut Vec<LibraryEntry> {
    match list {
        LibraryList::Favorites => &mut user.favorites,
        LibraryList::Watchlist => &mut user.watchlist,
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn insert(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AppError::Conflict("User already exists".into()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        self.find(|u| u.id == id)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.find(|u| u.email == email)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.find(|u| u.username == username)
    }

    async fn set_rating(&self, user_id: ObjectId, rating: Rating) -> AppResult<()> {
        self.update(user_id, |user| {
            user.ratings.retain(|r| r.tmdb_id != rating.tmdb_id);
            user.ratings.push(rating);
        })
    }

    async fn remove_rating(&self, user_id: ObjectId, tmdb_id: TmdbId) -> AppResult<bool> {
        self.update(user_id, |user| {
            let before = user.ratings.len();
            user.ratings.retain(|r| r.tmdb_id != tmdb_id);
            user.ratings.len() != before
        })
    }

    async fn add_to_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        entry: LibraryEntry,
    ) -> AppResult<bool> {
        self.update(user_id, |user| {
            let entries = list_mut(user, list);
            if entries.iter().any(|e| e.tmdb_id == entry.tmdb_id) {
                return false;
            }
            entries.push(entry);
            true
        })
    }

    async fn remove_from_list(
        &self,
        user_id: ObjectId,
        list: LibraryList,
        tmdb_id: TmdbId,
    ) -> AppResult<bool> {
        self.update(user_id, |user| {
            let entries = list_mut(user, list);
            let before = entries.len();
            entries.retain(|e| e.tmdb_id != tmdb_id);
            entries.len() != before
        })
    }
}

#[derive(Default)]
pub struct MemoryComments {
    comments: Mutex<Vec<Comment>>,
}

impl MemoryComments {
    fn snapshot(&self) -> AppResult<Vec<Comment>> {
        let comments = self.comments.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(comments.clone())
    }
}

fn newest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl CommentRepository for MemoryComments {
    async fn insert(&self, comment: &Comment) -> AppResult<()> {
        let mut comments = self.comments.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        comments.push(comment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<Comment>> {
        Ok(self.snapshot()?.into_iter().find(|c| c.id == id))
    }

    async fn delete(&self, id: ObjectId) -> AppResult<bool> {
        let mut comments = self.comments.lock().map_err(|e| AppError::Internal(e.to_string()))?;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }

    async fn for_movie(&self, tmdb_id: TmdbId, skip: u64, limit: i64) -> AppResult<Vec<Comment>> {
        let mut matching: Vec<Comment> = self
            .snapshot()?
            .into_iter()
            .filter(|c| c.tmdb_id == tmdb_id)
            .collect();
        newest_first(&mut matching);
        Ok(matching
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_for_movie(&self, tmdb_id: TmdbId) -> AppResult<u64> {
        Ok(self
            .snapshot()?
            .iter()
            .filter(|c| c.tmdb_id == tmdb_id)
            .count() as u64)
    }

    async fn recent(&self, before: Option<FeedCursor>, limit: i64) -> AppResult<Vec<Comment>> {
        let mut matching: Vec<Comment> = self
            .snapshot()?
            .into_iter()
            .filter(|c| before.map_or(true, |b| b.follows(c)))
            .collect();
        newest_first(&mut matching);
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn since(&self, cursor: FeedCursor, limit: i64) -> AppResult<Vec<Comment>> {
        let mut matching: Vec<Comment> = self
            .snapshot()?
            .into_iter()
            .filter(|c| cursor.precedes(c))
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

/// A tiny fixed catalog: 603 The Matrix, 604 The Matrix Reloaded, 27205 Inception
pub struct StubCatalog {
    movies: HashMap<TmdbId, MovieDetails>,
}

const SCIENCE_FICTION: (u32, &str) = (878, "Science Fiction");
const ACTION: (u32, &str) = (28, "Action");

fn stub_details(id: TmdbId, title: &str, year: i32, genres: &[(u32, &str)]) -> MovieDetails {
    MovieDetails {
        movie: Movie {
            id,
            title: title.to_string(),
            overview: Some(format!("{} overview", title)),
            poster_url: Some(format!("https://image.test/w500/{}.jpg", id)),
            backdrop_url: None,
            release_date: Some(format!("{}-01-01", year)),
            release_year: Some(year),
            vote_average: 8.1,
            vote_count: 1000,
            genre_ids: genres.iter().map(|(gid, _)| *gid).collect(),
        },
        tagline: None,
        runtime: Some(136),
        genres: genres
            .iter()
            .map(|(gid, name)| Genre {
                id: *gid,
                name: name.to_string(),
            })
            .collect(),
        director: Some("Somebody".to_string()),
        cast: vec![],
        trailer_key: None,
    }
}

impl Default for StubCatalog {
    fn default() -> Self {
        let movies = [
            stub_details(603, "The Matrix", 1999, &[ACTION, SCIENCE_FICTION]),
            stub_details(604, "The Matrix Reloaded", 2003, &[ACTION, SCIENCE_FICTION]),
            stub_details(27205, "Inception", 2010, &[SCIENCE_FICTION]),
        ]
        .into_iter()
        .map(|d| (d.movie.id, d))
        .collect();
        Self { movies }
    }
}

impl StubCatalog {
    fn page_of(&self, mut movies: Vec<Movie>, page: u32) -> MoviePage {
        movies.sort_by_key(|m| m.id);
        MoviePage {
            page,
            total_pages: 1,
            total_results: movies.len() as u64,
            results: movies,
        }
    }
}

#[async_trait]
impl MovieProvider for StubCatalog {
    async fn list(&self, _category: MovieCategory, page: u32) -> AppResult<MoviePage> {
        Ok(self.page_of(self.movies.values().map(|d| d.movie.clone()).collect(), page))
    }

    async fn search(&self, query: &str, page: u32) -> AppResult<MoviePage> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Search query cannot be empty".into()));
        }
        let hits = self
            .movies
            .values()
            .filter(|d| d.movie.title.to_lowercase().contains(&query))
            .map(|d| d.movie.clone())
            .collect();
        Ok(self.page_of(hits, page))
    }

    async fn genres(&self) -> AppResult<Vec<Genre>> {
        Ok(vec![
            Genre {
                id: ACTION.0,
                name: ACTION.1.into(),
            },
            Genre {
                id: SCIENCE_FICTION.0,
                name: SCIENCE_FICTION.1.into(),
            },
        ])
    }

    async fn discover(&self, genre_id: u32, page: u32) -> AppResult<MoviePage> {
        let hits = self
            .movies
            .values()
            .filter(|d| d.movie.genre_ids.contains(&genre_id))
            .map(|d| d.movie.clone())
            .collect();
        Ok(self.page_of(hits, page))
    }

    async fn details(&self, tmdb_id: TmdbId) -> AppResult<MovieDetails> {
        self.movies
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", tmdb_id)))
    }

    async fn similar(&self, tmdb_id: TmdbId, page: u32) -> AppResult<MoviePage> {
        self.details(tmdb_id).await?;
        let others = self
            .movies
            .values()
            .filter(|d| d.movie.id != tmdb_id)
            .map(|d| d.movie.clone())
            .collect();
        Ok(self.page_of(others, page))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn test_state() -> AppState {
    AppState {
        users: Arc::new(MemoryUsers::default()),
        comments: Arc::new(MemoryComments::default()),
        movies: Arc::new(StubCatalog::default()),
        tokens: TokenService::new("integration-secret", 1).unwrap(),
        hasher: PasswordHasher::new(MIN_BCRYPT_COST),
        feed_poll_interval: Duration::from_millis(20),
    }
}

pub fn create_test_server() -> TestServer {
    TestServer::new(create_router(test_state())).unwrap()
}

/// Registers a user and returns its bearer token
pub async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "hunter22",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
