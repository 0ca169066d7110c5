//! RID/DRID allocation handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ncez_rid::{classify, IdentifierKind, RidAllocation};
use serde::{Deserialize, Serialize};

use super::{offset, page_size};
use crate::api::extractors::ApiQuery;
use crate::{state::AppState, Error, Result};

const DEFAULT_LIST_TAKE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct CountParam {
    /// Values of 1 or less allocate a single identifier.
    pub count: Option<i64>,
}

/// Short form returned by the allocation endpoints.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedIdentifier {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drid: Option<String>,
}

impl From<RidAllocation> for IssuedIdentifier {
    fn from(allocation: RidAllocation) -> Self {
        let (rid, drid) = match allocation.kind {
            IdentifierKind::Rid => (Some(allocation.value), None),
            IdentifierKind::Drid => (None, Some(allocation.value)),
        };
        Self {
            id: allocation.id,
            rid,
            drid,
        }
    }
}

fn created(allocation: RidAllocation) -> Response {
    let location = format!("/api/v1/rid/{}", allocation.id);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(IssuedIdentifier::from(allocation)),
    )
        .into_response()
}

fn batch(allocations: Vec<RidAllocation>) -> Response {
    let issued: Vec<IssuedIdentifier> = allocations.into_iter().map(Into::into).collect();
    (StatusCode::OK, Json(issued)).into_response()
}

/// Requested batch size, or `None` for a single allocation.
fn batch_size(count: Option<i64>) -> Option<usize> {
    match count {
        Some(n) if n > 1 => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        _ => None,
    }
}

pub async fn allocate_rid(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CountParam>,
) -> Result<Response> {
    match batch_size(params.count) {
        None => Ok(created(state.allocator.allocate_rid().await?)),
        Some(count) => Ok(batch(state.allocator.allocate_rid_batch(count).await?)),
    }
}

pub async fn allocate_drid(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CountParam>,
) -> Result<Response> {
    match batch_size(params.count) {
        None => Ok(created(state.allocator.allocate_drid().await?)),
        Some(count) => Ok(batch(state.allocator.allocate_drid_batch(count).await?)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub take: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<RidAllocation>>> {
    let allocations = state
        .allocator
        .list(
            offset(params.skip),
            page_size(params.take, DEFAULT_LIST_TAKE),
        )
        .await?;
    Ok(Json(allocations))
}

pub async fn get_allocation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RidAllocation>> {
    state
        .allocator
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("RidAllocation/{id}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ValueParam {
    pub value: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classified {
    pub value: String,
    pub valid: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

pub async fn validate(ApiQuery(params): ApiQuery<ValueParam>) -> Json<Classified> {
    let value = params.value.unwrap_or_default();
    let classification = classify(&value);
    Json(Classified {
        valid: classification.is_valid(),
        kind: classification.as_str().to_string(),
        value,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteParams {
    pub patient_id: Option<String>,
}

pub async fn promote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<PromoteParams>,
) -> Result<Json<RidAllocation>> {
    Ok(Json(state.allocator.promote(&id, params.patient_id).await?))
}

pub async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RidAllocation>> {
    Ok(Json(state.allocator.release(&id).await?))
}
