use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Movie Router Module
///
/// | Verb   | Path           | Permission      |
/// |--------|----------------|-----------------|
/// | GET    | `/movies`      | `read:movies`   |
/// | POST   | `/movies`      | `create:movies` |
/// | PATCH  | `/movies/{id}` | `update:movies` |
/// | DELETE | `/movies/{id}` | `delete:movies` |
pub fn movie_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/movies",
            get(handlers::get_movies)
                .post(handlers::create_movie)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/movies/{id}",
            patch(handlers::update_movie)
                .delete(handlers::delete_movie)
                .fallback(handlers::method_not_allowed),
        )
}
