use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::{error::AppError, models::Validate};

/// Payload
///
/// A JSON body that deserialized cleanly into `T` and passed `T::validate`. Every failure
/// (missing body, wrong content type, syntax error, unknown or missing field, failed
/// validation) is reported as 422.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, "request body rejected");
                AppError::Unprocessable
            })?;
        value.validate()?;
        Ok(Payload(value))
    }
}

/// RecordId
///
/// The `{id}` path segment. A segment that is not a valid id is reported as 422, the same as
/// an id that matches no record.
#[derive(Debug, Clone, Copy)]
pub struct RecordId(pub i32);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, "record id rejected");
                AppError::Unprocessable
            })?;
        Ok(RecordId(id))
    }
}
