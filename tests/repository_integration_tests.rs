use casting_agency::{
    MemoryRepository, PostgresRepository,
    models::{ActorChanges, MovieChanges, NewActor, NewMovie, parse_release_date},
    repository::Repository,
};
use sqlx::postgres::PgPoolOptions;

fn new_movie(title: &str) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        release_date: parse_release_date("2025-06-01").unwrap(),
    }
}

fn new_actor(name: &str) -> NewActor {
    NewActor {
        name: name.to_string(),
        age: "41".to_string(),
        gender: "female".to_string(),
    }
}

// --- In-Memory Repository ---

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let repo = MemoryRepository::new();

    let first = repo.insert_movie(new_movie("First")).await.unwrap();
    let second = repo.insert_movie(new_movie("Second")).await.unwrap();
    assert_eq!((first.id, second.id), (1, 2));

    assert!(repo.delete_movie(second.id).await.unwrap());
    let third = repo.insert_movie(new_movie("Third")).await.unwrap();

    assert_eq!(third.id, 3);
    let ids: Vec<i32> = repo
        .list_movies()
        .await
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_partial_update_keeps_untouched_fields() {
    let repo = MemoryRepository::new();
    let actor = repo.insert_actor(new_actor("Ama Owusu")).await.unwrap();

    let changes = ActorChanges {
        age: Some("42".to_string()),
        ..ActorChanges::default()
    };
    let updated = repo
        .update_actor(actor.id, changes)
        .await
        .unwrap()
        .expect("actor should exist");

    assert_eq!(updated.age, "42");
    assert_eq!(updated.name, "Ama Owusu");
    assert_eq!(updated.gender, "female");

    let stored = repo.get_actor(actor.id).await.unwrap().unwrap();
    assert_eq!(stored.age, "42");
}

#[tokio::test]
async fn test_missing_ids_report_absence() {
    let repo = MemoryRepository::new();

    let changes = MovieChanges {
        title: Some("Ghost".to_string()),
        ..MovieChanges::default()
    };
    assert!(repo.update_movie(99, changes).await.unwrap().is_none());
    assert!(!repo.delete_movie(99).await.unwrap());
    assert!(!repo.delete_actor(99).await.unwrap());
    assert!(repo.get_movie(99).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failing_repository_rejects_writes_only() {
    let repo = MemoryRepository::new_failing();

    assert!(repo.insert_movie(new_movie("Nope")).await.is_err());
    assert!(repo.insert_actor(new_actor("Nope")).await.is_err());
    assert!(repo.delete_actor(1).await.is_err());
    assert!(repo.list_movies().await.unwrap().is_empty());
    assert_eq!(repo.movie_count().await, 0);
    assert_eq!(repo.actor_count().await, 0);
}

// --- PostgreSQL Repository ---
// Requires a reachable database: `DATABASE_URL=... cargo test -- --ignored`

async fn postgres_repository() -> PostgresRepository {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to Postgres");

    let repo = PostgresRepository::new(pool);
    repo.ensure_schema().await.expect("Failed to run migrations");
    repo
}

#[tokio::test]
#[ignore]
async fn test_postgres_movie_lifecycle() {
    let repo = postgres_repository().await;

    let movie = repo.insert_movie(new_movie("Postgres Premiere")).await.unwrap();
    assert!(movie.id > 0);

    let changes = MovieChanges {
        title: Some("Postgres Premiere (Director's Cut)".to_string()),
        ..MovieChanges::default()
    };
    let updated = repo.update_movie(movie.id, changes).await.unwrap().unwrap();
    assert_eq!(updated.title, "Postgres Premiere (Director's Cut)");
    assert_eq!(updated.release_date, movie.release_date);

    assert!(repo.delete_movie(movie.id).await.unwrap());
    assert!(repo.get_movie(movie.id).await.unwrap().is_none());
    assert!(!repo.delete_movie(movie.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_postgres_rejects_oversized_gender() {
    let repo = postgres_repository().await;

    let mut actor = new_actor("Column Width");
    actor.gender = "unspecified".to_string();

    // VARCHAR(6) overflow is a data error from the database, not a panic.
    assert!(repo.insert_actor(actor).await.is_err());
}
