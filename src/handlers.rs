use crate::{
    AppState,
    auth::{Authorized, guard},
    error::{AppError, AppResult, ErrorBody},
    extract::{Payload, RecordId},
    models::{
        ActorChanges, ActorCreated, ActorList, ActorUpdated, Deleted, MovieChanges, MovieCreated,
        MovieList, MovieUpdated, NewActor, NewMovie,
    },
};
use axum::{Json, extract::State};

/// A failed write is always reported to the client as 422; the cause only goes to the log.
fn write_failed(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        tracing::error!(operation, error = %err, "write rejected by store");
        AppError::Unprocessable
    }
}

// --- Movies ---

/// get_movies
///
/// Lists every movie. Requires `read:movies`.
#[utoipa::path(
    get,
    path = "/movies",
    responses(
        (status = 200, description = "All movies", body = MovieList),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not found", body = ErrorBody)
    )
)]
pub async fn get_movies(
    _auth: Authorized<guard::ReadMovies>,
    State(state): State<AppState>,
) -> AppResult<Json<MovieList>> {
    let movies = state.repo.list_movies().await?;
    Ok(Json(MovieList {
        success: true,
        movies,
    }))
}

/// create_movie
///
/// Inserts a movie. Requires `create:movies`.
#[utoipa::path(
    post,
    path = "/movies",
    request_body = NewMovie,
    responses(
        (status = 200, description = "Created", body = MovieCreated),
        (status = 422, description = "Missing or invalid fields", body = ErrorBody)
    )
)]
pub async fn create_movie(
    Authorized { user, .. }: Authorized<guard::CreateMovies>,
    State(state): State<AppState>,
    Payload(movie): Payload<NewMovie>,
) -> AppResult<Json<MovieCreated>> {
    let movie = state
        .repo
        .insert_movie(movie)
        .await
        .map_err(write_failed("insert_movie"))?;

    tracing::info!(subject = %user.subject, id = movie.id, "movie created");
    Ok(Json(MovieCreated {
        success: true,
        created: movie.id,
        movie,
    }))
}

/// update_movie
///
/// Applies a partial update. Requires `update:movies`. An unknown id is a 422, not a 404.
#[utoipa::path(
    patch,
    path = "/movies/{id}",
    params(("id" = i32, Path, description = "Movie ID")),
    request_body = MovieChanges,
    responses(
        (status = 200, description = "Updated", body = MovieUpdated),
        (status = 422, description = "Unknown id or invalid fields", body = ErrorBody)
    )
)]
pub async fn update_movie(
    Authorized { user, .. }: Authorized<guard::UpdateMovies>,
    State(state): State<AppState>,
    RecordId(id): RecordId,
    Payload(changes): Payload<MovieChanges>,
) -> AppResult<Json<MovieUpdated>> {
    let movie = state
        .repo
        .update_movie(id, changes)
        .await
        .map_err(write_failed("update_movie"))?
        .ok_or(AppError::Unprocessable)?;

    tracing::info!(subject = %user.subject, id = movie.id, "movie updated");
    Ok(Json(MovieUpdated {
        success: true,
        movies: movie.id,
    }))
}

/// delete_movie
///
/// Requires `delete:movies`. Deleting an id that does not exist (including one deleted a
/// moment ago) is a 422.
#[utoipa::path(
    delete,
    path = "/movies/{id}",
    params(("id" = i32, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Deleted", body = Deleted),
        (status = 422, description = "Unknown id", body = ErrorBody)
    )
)]
pub async fn delete_movie(
    Authorized { user, .. }: Authorized<guard::DeleteMovies>,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> AppResult<Json<Deleted>> {
    let removed = state
        .repo
        .delete_movie(id)
        .await
        .map_err(write_failed("delete_movie"))?;
    if !removed {
        return Err(AppError::Unprocessable);
    }

    tracing::info!(subject = %user.subject, id, "movie deleted");
    Ok(Json(Deleted {
        success: true,
        deleted: id,
    }))
}

// --- Actors ---

/// get_actors
///
/// Lists every actor. Requires `read:actors`.
#[utoipa::path(
    get,
    path = "/actors",
    responses(
        (status = 200, description = "All actors", body = ActorList),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Permission not found", body = ErrorBody)
    )
)]
pub async fn get_actors(
    _auth: Authorized<guard::ReadActors>,
    State(state): State<AppState>,
) -> AppResult<Json<ActorList>> {
    let actors = state.repo.list_actors().await?;
    Ok(Json(ActorList {
        success: true,
        actors,
    }))
}

#[utoipa::path(
    post,
    path = "/actors",
    request_body = NewActor,
    responses(
        (status = 200, description = "Created", body = ActorCreated),
        (status = 422, description = "Missing or invalid fields", body = ErrorBody)
    )
)]
pub async fn create_actor(
    Authorized { user, .. }: Authorized<guard::CreateActors>,
    State(state): State<AppState>,
    Payload(actor): Payload<NewActor>,
) -> AppResult<Json<ActorCreated>> {
    let actor = state
        .repo
        .insert_actor(actor)
        .await
        .map_err(write_failed("insert_actor"))?;

    tracing::info!(subject = %user.subject, id = actor.id, "actor created");
    Ok(Json(ActorCreated {
        success: true,
        created: actor.id,
        actor,
    }))
}

#[utoipa::path(
    patch,
    path = "/actors/{id}",
    params(("id" = i32, Path, description = "Actor ID")),
    request_body = ActorChanges,
    responses(
        (status = 200, description = "Updated", body = ActorUpdated),
        (status = 422, description = "Unknown id or invalid fields", body = ErrorBody)
    )
)]
pub async fn update_actor(
    Authorized { user, .. }: Authorized<guard::UpdateActors>,
    State(state): State<AppState>,
    RecordId(id): RecordId,
    Payload(changes): Payload<ActorChanges>,
) -> AppResult<Json<ActorUpdated>> {
    let actor = state
        .repo
        .update_actor(id, changes)
        .await
        .map_err(write_failed("update_actor"))?
        .ok_or(AppError::Unprocessable)?;

    tracing::info!(subject = %user.subject, id = actor.id, "actor updated");
    Ok(Json(ActorUpdated {
        success: true,
        actors: actor.id,
    }))
}

#[utoipa::path(
    delete,
    path = "/actors/{id}",
    params(("id" = i32, Path, description = "Actor ID")),
    responses(
        (status = 200, description = "Deleted", body = Deleted),
        (status = 422, description = "Unknown id", body = ErrorBody)
    )
)]
pub async fn delete_actor(
    Authorized { user, .. }: Authorized<guard::DeleteActors>,
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> AppResult<Json<Deleted>> {
    let removed = state
        .repo
        .delete_actor(id)
        .await
        .map_err(write_failed("delete_actor"))?;
    if !removed {
        return Err(AppError::Unprocessable);
    }

    tracing::info!(subject = %user.subject, id, "actor deleted");
    Ok(Json(Deleted {
        success: true,
        deleted: id,
    }))
}

// --- Fallbacks ---

/// Answers any verb a resource path does not route. Runs without authentication.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Answers any path no router matches.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
