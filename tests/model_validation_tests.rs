use axum::{http::StatusCode, response::IntoResponse};
use casting_agency::{
    AppError,
    models::{
        Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie, Validate,
        parse_release_date,
    },
};
use chrono::NaiveDate;
use serde_json::{Value, json};

// --- Serialization ---

#[test]
fn test_movie_serializes_release_date_with_space() {
    let movie = Movie {
        id: 3,
        title: "Harbour Lights".to_string(),
        release_date: parse_release_date("2023-11-17").unwrap(),
    };

    let value = serde_json::to_value(&movie).unwrap();

    assert_eq!(
        value,
        json!({ "id": 3, "title": "Harbour Lights", "release date": "2023-11-17T00:00:00" })
    );
    assert!(value.get("release_date").is_none());
}

#[test]
fn test_actor_serializes_plain_fields() {
    let actor = Actor {
        id: 9,
        name: "Jo Mensah".to_string(),
        age: "52".to_string(),
        gender: "male".to_string(),
    };

    let value = serde_json::to_value(&actor).unwrap();

    assert_eq!(
        value,
        json!({ "id": 9, "name": "Jo Mensah", "age": "52", "gender": "male" })
    );
}

#[test]
fn test_change_sets_omit_absent_fields() {
    let changes = ActorChanges {
        gender: Some("female".to_string()),
        ..ActorChanges::default()
    };

    let json_output = serde_json::to_string(&changes).unwrap();

    assert_eq!(json_output, r#"{"gender":"female"}"#);
}

// --- Release Date Parsing ---

#[test]
fn test_release_date_formats() {
    let evening = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap();

    assert_eq!(parse_release_date("2024-05-01T20:00:00Z"), Some(evening));
    assert_eq!(parse_release_date("2024-05-01T22:00:00+02:00"), Some(evening));
    assert_eq!(parse_release_date("2024-05-01T20:00:00"), Some(evening));
    assert_eq!(parse_release_date("2024-05-01 20:00:00"), Some(evening));
    assert_eq!(
        parse_release_date("2024-05-01"),
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0)
    );

    assert_eq!(parse_release_date("01/05/2024"), None);
    assert_eq!(parse_release_date("2024-13-01"), None);
    assert_eq!(parse_release_date(""), None);
}

// --- Request Schemas ---

#[test]
fn test_new_movie_requires_all_fields() {
    assert!(serde_json::from_value::<NewMovie>(json!({ "title": "Only Title" })).is_err());
    assert!(serde_json::from_value::<NewMovie>(json!({ "release_date": "2024-01-01" })).is_err());

    let movie: NewMovie =
        serde_json::from_value(json!({ "title": "Both", "release_date": "2024-01-01" })).unwrap();
    assert!(movie.validate().is_ok());
}

#[test]
fn test_unknown_fields_are_rejected() {
    let result = serde_json::from_value::<NewMovie>(json!({
        "title": "Extra",
        "release_date": "2024-01-01",
        "director": "someone",
    }));
    assert!(result.is_err());

    let result = serde_json::from_value::<ActorChanges>(json!({ "height": 180 }));
    assert!(result.is_err());
}

#[test]
fn test_blank_title_fails_validation() {
    let movie: NewMovie =
        serde_json::from_value(json!({ "title": "   ", "release_date": "2024-01-01" })).unwrap();

    assert!(matches!(movie.validate(), Err(AppError::Unprocessable)));
}

#[test]
fn test_actor_age_rules() {
    let numeric: NewActor =
        serde_json::from_value(json!({ "name": "A", "age": 7, "gender": "f" })).unwrap();
    assert_eq!(numeric.age, "7");
    assert!(numeric.validate().is_ok());

    let too_long: NewActor =
        serde_json::from_value(json!({ "name": "A", "age": 1000, "gender": "f" })).unwrap();
    assert!(too_long.validate().is_err());

    let letters: NewActor =
        serde_json::from_value(json!({ "name": "A", "age": "4O", "gender": "f" })).unwrap();
    assert!(letters.validate().is_err());

    assert!(
        serde_json::from_value::<NewActor>(json!({ "name": "A", "age": -3, "gender": "f" }))
            .is_err()
    );
}

#[test]
fn test_actor_gender_width() {
    let ok: NewActor =
        serde_json::from_value(json!({ "name": "A", "age": "30", "gender": "female" })).unwrap();
    assert!(ok.validate().is_ok());

    let wide: NewActor =
        serde_json::from_value(json!({ "name": "A", "age": "30", "gender": "nonbinary" }))
            .unwrap();
    assert!(wide.validate().is_err());
}

#[test]
fn test_empty_change_set_fails_validation() {
    assert!(MovieChanges::default().validate().is_err());
    assert!(ActorChanges::default().validate().is_err());

    let changes: MovieChanges =
        serde_json::from_value(json!({ "release_date": "2030-01-01" })).unwrap();
    assert!(changes.validate().is_ok());

    // A null date is not "leave unchanged"; it is rejected outright.
    assert!(serde_json::from_value::<MovieChanges>(json!({ "release_date": null })).is_err());
}

// --- Error Rendering ---

async fn render(error: AppError) -> (StatusCode, Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_error_bodies() {
    let (status, body) = render(AppError::Unprocessable).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({ "success": false, "error": 422, "message": "unprocessable" })
    );

    let (status, body) = render(AppError::MethodNotAllowed).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["message"], "method not allowed");

    let (status, body) = render(AppError::Forbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "permission not found");

    let (status, body) = render(AppError::Unauthenticated("token expired".to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "token expired");
}

#[tokio::test]
async fn test_internal_details_are_not_leaked() {
    let (status, body) = render(AppError::Internal("pool exhausted".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "internal server error");

    let (status, body) = render(AppError::Database(sqlx::Error::Protocol(
        "connection reset".to_string(),
    )))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "internal server error");

    let (status, _) = render(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
