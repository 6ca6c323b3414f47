use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Actor Router Module
///
/// Mirrors the movie routes with the `actors` permissions.
pub fn actor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/actors",
            get(handlers::get_actors)
                .post(handlers::create_actor)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/actors/{id}",
            patch(handlers::update_actor)
                .delete(handlers::delete_actor)
                .fallback(handlers::method_not_allowed),
        )
}
