use crate::models::{Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

/// Repository Trait
///
/// Persistence contract for both record types. Handlers only ever see this trait, so the
/// Postgres implementation and the in-memory one used by tests are interchangeable.
///
/// Every write is a single statement committed on return. There is no version check:
/// concurrent updates to the same row resolve as last write wins.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Movies ---
    async fn list_movies(&self) -> Result<Vec<Movie>, sqlx::Error>;
    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, sqlx::Error>;
    // Assigns the id and returns the stored record. Constraint violations surface as errors.
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, sqlx::Error>;
    // `None` when no row has this id.
    async fn update_movie(
        &self,
        id: i32,
        changes: MovieChanges,
    ) -> Result<Option<Movie>, sqlx::Error>;
    // `false` when no row has this id.
    async fn delete_movie(&self, id: i32) -> Result<bool, sqlx::Error>;

    // --- Actors ---
    async fn list_actors(&self) -> Result<Vec<Actor>, sqlx::Error>;
    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, sqlx::Error>;
    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, sqlx::Error>;
    async fn update_actor(
        &self,
        id: i32,
        changes: ActorChanges,
    ) -> Result<Option<Actor>, sqlx::Error>;
    async fn delete_actor(&self, id: i32) -> Result<bool, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `movies` and `actors` tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_movies(&self) -> Result<Vec<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>("SELECT id, title, release_date FROM movies ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>("SELECT id, title, release_date FROM movies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, sqlx::Error> {
        sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (title, release_date)
            VALUES ($1, $2)
            RETURNING id, title, release_date
            "#,
        )
        .bind(movie.title)
        .bind(movie.release_date)
        .fetch_one(&self.pool)
        .await
    }

    /// update_movie
    ///
    /// `COALESCE` keeps the stored value for every field the request left out.
    async fn update_movie(
        &self,
        id: i32,
        changes: MovieChanges,
    ) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>(
            r#"
            UPDATE movies
            SET title = COALESCE($2, title),
                release_date = COALESCE($3, release_date)
            WHERE id = $1
            RETURNING id, title, release_date
            "#,
        )
        .bind(id)
        .bind(changes.title)
        .bind(changes.release_date)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_movie(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_actors(&self) -> Result<Vec<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>("SELECT id, name, age, gender FROM actors ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>("SELECT id, name, age, gender FROM actors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, sqlx::Error> {
        sqlx::query_as::<_, Actor>(
            r#"
            INSERT INTO actors (name, age, gender)
            VALUES ($1, $2, $3)
            RETURNING id, name, age, gender
            "#,
        )
        .bind(actor.name)
        .bind(actor.age)
        .bind(actor.gender)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_actor(
        &self,
        id: i32,
        changes: ActorChanges,
    ) -> Result<Option<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>(
            r#"
            UPDATE actors
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender)
            WHERE id = $1
            RETURNING id, name, age, gender
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.age)
        .bind(changes.gender)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_actor(&self, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-Memory Implementation (For Tests) ---

#[derive(Default)]
struct Tables {
    movies: BTreeMap<i32, Movie>,
    actors: BTreeMap<i32, Actor>,
    // Ids are never reused, matching a SERIAL column.
    last_movie_id: i32,
    last_actor_id: i32,
}

/// MemoryRepository
///
/// A `Repository` kept entirely in process memory. Lets the router and handlers be tested
/// without a database. Set `fail_writes` to simulate a store that refuses every write.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    pub fail_writes: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> Result<(), sqlx::Error> {
        if self.fail_writes {
            return Err(sqlx::Error::Protocol(
                "memory repository: writes disabled".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn movie_count(&self) -> usize {
        self.tables.read().await.movies.len()
    }

    pub async fn actor_count(&self) -> usize {
        self.tables.read().await.actors.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_movies(&self) -> Result<Vec<Movie>, sqlx::Error> {
        Ok(self.tables.read().await.movies.values().cloned().collect())
    }

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, sqlx::Error> {
        Ok(self.tables.read().await.movies.get(&id).cloned())
    }

    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, sqlx::Error> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.last_movie_id += 1;
        let stored = Movie {
            id: tables.last_movie_id,
            title: movie.title,
            release_date: movie.release_date,
        };
        tables.movies.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_movie(
        &self,
        id: i32,
        changes: MovieChanges,
    ) -> Result<Option<Movie>, sqlx::Error> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(movie) = tables.movies.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            movie.title = title;
        }
        if let Some(release_date) = changes.release_date {
            movie.release_date = release_date;
        }
        Ok(Some(movie.clone()))
    }

    async fn delete_movie(&self, id: i32) -> Result<bool, sqlx::Error> {
        self.check_writable()?;
        Ok(self.tables.write().await.movies.remove(&id).is_some())
    }

    async fn list_actors(&self) -> Result<Vec<Actor>, sqlx::Error> {
        Ok(self.tables.read().await.actors.values().cloned().collect())
    }

    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, sqlx::Error> {
        Ok(self.tables.read().await.actors.get(&id).cloned())
    }

    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, sqlx::Error> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.last_actor_id += 1;
        let stored = Actor {
            id: tables.last_actor_id,
            name: actor.name,
            age: actor.age,
            gender: actor.gender,
        };
        tables.actors.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_actor(
        &self,
        id: i32,
        changes: ActorChanges,
    ) -> Result<Option<Actor>, sqlx::Error> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(actor) = tables.actors.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            actor.name = name;
        }
        if let Some(age) = changes.age {
            actor.age = age;
        }
        if let Some(gender) = changes.gender {
            actor.gender = gender;
        }
        Ok(Some(actor.clone()))
    }

    async fn delete_actor(&self, id: i32) -> Result<bool, sqlx::Error> {
        self.check_writable()?;
        Ok(self.tables.write().await.actors.remove(&id).is_some())
    }
}
