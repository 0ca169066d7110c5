//! Extractors whose rejections render as OperationOutcome bodies.
//!
//! axum's own `Query` and `Json` reject with plain-text bodies. These
//! wrappers run the same parsing and turn failures into [`Error`] so every
//! 4xx from the API carries the same JSON shape.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;

use crate::Error;

/// Query string extractor; a malformed query is a validation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// JSON body extractor. The body is parsed as JSON whatever the
/// content type says.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                Error::PayloadTooLarge(rejection.body_text())
            } else {
                Error::Validation(format!("Failed to read request body: {}", rejection.body_text()))
            }
        })?;

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| Error::Validation(format!("Invalid JSON in request body: {e}")))
    }
}
