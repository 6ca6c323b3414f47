use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

// --- Stored Records ---

/// Movie
///
/// A row of the `movies` table. The `Serialize` impl is the record's public representation;
/// the release date is emitted under the key `"release date"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    #[serde(rename = "release date")]
    pub release_date: NaiveDateTime,
}

/// Actor
///
/// A row of the `actors` table. `age` is kept as text (at most three digits) to match the
/// column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub age: String,
    pub gender: String,
}

// --- Request Payloads (Input Schemas) ---

/// Validate
///
/// Second validation pass run after deserialization. Anything serde cannot express (empty
/// strings, column widths) is checked here. A failure is always reported as 422.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// NewMovie
///
/// Body of `POST /movies`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewMovie {
    pub title: String,
    #[serde(deserialize_with = "deserialize_release_date")]
    #[schema(value_type = String, example = "2024-05-01")]
    pub release_date: NaiveDateTime,
}

/// MovieChanges
///
/// Body of `PATCH /movies/{id}`. Only the provided fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct MovieChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_release_date",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, example = "2024-05-01")]
    pub release_date: Option<NaiveDateTime>,
}

/// NewActor
///
/// Body of `POST /actors`. `age` accepts either `"42"` or `42`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewActor {
    pub name: String,
    #[serde(deserialize_with = "deserialize_age")]
    #[schema(value_type = String, example = "42")]
    pub age: String,
    pub gender: String,
}

/// ActorChanges
///
/// Body of `PATCH /actors/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ActorChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_age",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>, example = "42")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

pub const MAX_AGE_LEN: usize = 3;
pub const MAX_GENDER_LEN: usize = 6;

fn reject(reason: &str) -> AppError {
    tracing::debug!(reason, "payload rejected");
    AppError::Unprocessable
}

fn check_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(reject(&format!("{field} must not be empty")));
    }
    Ok(())
}

fn check_age(value: &str) -> Result<(), AppError> {
    if value.is_empty() || value.len() > MAX_AGE_LEN || !value.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(reject("age must be 1-3 digits"));
    }
    Ok(())
}

fn check_gender(value: &str) -> Result<(), AppError> {
    check_text("gender", value)?;
    if value.chars().count() > MAX_GENDER_LEN {
        return Err(reject("gender is too long"));
    }
    Ok(())
}

impl Validate for NewMovie {
    fn validate(&self) -> Result<(), AppError> {
        check_text("title", &self.title)
    }
}

impl Validate for MovieChanges {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.is_none() && self.release_date.is_none() {
            return Err(reject("no fields to update"));
        }
        if let Some(title) = &self.title {
            check_text("title", title)?;
        }
        Ok(())
    }
}

impl Validate for NewActor {
    fn validate(&self) -> Result<(), AppError> {
        check_text("name", &self.name)?;
        check_age(&self.age)?;
        check_gender(&self.gender)
    }
}

impl Validate for ActorChanges {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.is_none() && self.age.is_none() && self.gender.is_none() {
            return Err(reject("no fields to update"));
        }
        if let Some(name) = &self.name {
            check_text("name", name)?;
        }
        if let Some(age) = &self.age {
            check_age(age)?;
        }
        if let Some(gender) = &self.gender {
            check_gender(gender)?;
        }
        Ok(())
    }
}

// --- Field Decoders ---

/// parse_release_date
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS` and bare `YYYY-MM-DD`
/// (midnight). Offsets are normalised to UTC before the zone is dropped.
pub fn parse_release_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn deserialize_release_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_release_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid release_date: {raw}")))
}

fn deserialize_optional_release_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_release_date(deserializer).map(Some)
}

/// AgeInput
///
/// Clients send age either as text or as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum AgeInput {
    Text(String),
    Number(u16),
}

fn deserialize_age<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match AgeInput::deserialize(deserializer)? {
        AgeInput::Text(text) => text.trim().to_string(),
        AgeInput::Number(n) => n.to_string(),
    })
}

fn deserialize_optional_age<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_age(deserializer).map(Some)
}

// --- Response Bodies (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovieList {
    pub success: bool,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorList {
    pub success: bool,
    pub actors: Vec<Actor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovieCreated {
    pub success: bool,
    pub created: i32,
    pub movie: Movie,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorCreated {
    pub success: bool,
    pub created: i32,
    pub actor: Actor,
}

/// MovieUpdated
///
/// `movies` carries the id of the updated record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovieUpdated {
    pub success: bool,
    pub movies: i32,
}

/// ActorUpdated
///
/// `actors` carries the id of the updated record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorUpdated {
    pub success: bool,
    pub actors: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Deleted {
    pub success: bool,
    pub deleted: i32,
}
