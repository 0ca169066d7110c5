//! Code-set handlers: lookup, search, validation and concept mapping

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use ncez_terminology::{
    canonical_system, CodeEntry, CodeSystemMeta, ConceptMapEntry, OperationOutcome,
    SearchRequest, SortKey, ValidateCodesResult, DEFAULT_TAKE,
};
use serde::Deserialize;

use super::{offset, page_size};
use crate::api::extractors::{ApiJson, ApiQuery};
use crate::{state::AppState, Error, Result};

/// Default page size of `/suggest`.
const DEFAULT_SUGGEST_LIMIT: usize = 20;

pub async fn list_systems(State(state): State<AppState>) -> Json<Vec<CodeSystemMeta>> {
    Json(state.terminology.systems())
}

/// Full rebuild of the registry and the concept map.
pub async fn reload(State(state): State<AppState>) -> Result<StatusCode> {
    state.reload().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn versions(
    State(state): State<AppState>,
    Path(system): Path<String>,
) -> Json<Vec<String>> {
    Json(state.terminology.versions(&system))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub skip: Option<i64>,
    pub take: Option<i64>,
    pub version: Option<String>,
    pub regex: Option<String>,
    pub sort: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Path(system): Path<String>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<CodeEntry>>> {
    let request = SearchRequest {
        system,
        query: params.q,
        skip: offset(params.skip),
        take: page_size(params.take, DEFAULT_TAKE),
        version: params.version,
        regex: params.regex.filter(|r| !r.is_empty()),
        prefix_only: false,
        sort: params.sort.as_deref().and_then(SortKey::parse),
    };
    Ok(Json(state.terminology.search(&request)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub version: Option<String>,
}

pub async fn suggest(
    State(state): State<AppState>,
    Path(system): Path<String>,
    ApiQuery(params): ApiQuery<SuggestParams>,
) -> Result<Json<Vec<CodeEntry>>> {
    let entries = state.terminology.suggest(
        &system,
        params.q.as_deref().unwrap_or_default(),
        page_size(params.limit, DEFAULT_SUGGEST_LIMIT),
        params.version.as_deref(),
    )?;
    Ok(Json(entries))
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionParam {
    pub version: Option<String>,
}

pub async fn export(
    State(state): State<AppState>,
    Path(system): Path<String>,
    ApiQuery(params): ApiQuery<VersionParam>,
) -> Json<Vec<CodeEntry>> {
    Json(state.terminology.export(&system, params.version.as_deref()))
}

pub async fn get_code(
    State(state): State<AppState>,
    Path((system, code)): Path<(String, String)>,
    ApiQuery(params): ApiQuery<VersionParam>,
) -> Result<Json<CodeEntry>> {
    state
        .terminology
        .get(&system, &code, params.version.as_deref())
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("{}/{code}", canonical_system(&system))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodesRequest {
    #[serde(default)]
    pub codes: Vec<String>,
    pub version: Option<String>,
}

pub async fn batch_get(
    State(state): State<AppState>,
    Path(system): Path<String>,
    ApiJson(body): ApiJson<CodesRequest>,
) -> Json<Vec<CodeEntry>> {
    Json(
        state
            .terminology
            .batch_get(&system, &body.codes, body.version.as_deref()),
    )
}

pub async fn validate(
    State(state): State<AppState>,
    Path(system): Path<String>,
    ApiJson(body): ApiJson<CodesRequest>,
) -> Json<Vec<ValidateCodesResult>> {
    Json(
        state
            .terminology
            .validate(&system, &body.codes, body.version.as_deref()),
    )
}

/// Missing `system`/`code` are reported inside the outcome, not as 4xx.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateCodingRequest {
    pub system: String,
    pub code: String,
    pub display: Option<String>,
    pub version: Option<String>,
}

pub async fn validate_coding(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ValidateCodingRequest>,
) -> Json<OperationOutcome> {
    Json(state.terminology.validate_coding(
        &body.system,
        &body.code,
        body.display.as_deref(),
        body.version.as_deref(),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct MapParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub code: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn map(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<MapParams>,
) -> Result<Json<Vec<ConceptMapEntry>>> {
    let (Some(from), Some(to), Some(code)) = (
        required(params.from),
        required(params.to),
        required(params.code),
    ) else {
        return Err(Error::Validation(
            "Missing query parameters. Use ?from=<system>&to=<system>&code=<code>".to_string(),
        ));
    };
    Ok(Json(state.terminology.map(&from, &to, &code)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBatchRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub codes: Vec<String>,
}

pub async fn map_batch(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<MapBatchRequest>,
) -> Result<Json<BTreeMap<String, Vec<ConceptMapEntry>>>> {
    if body.from.trim().is_empty() || body.to.trim().is_empty() {
        return Err(Error::Validation("'from' and 'to' are required".to_string()));
    }
    Ok(Json(
        state
            .terminology
            .map_batch(&body.from, &body.to, &body.codes),
    ))
}
