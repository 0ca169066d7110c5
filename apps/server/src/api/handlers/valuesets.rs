//! Value-set handlers

use axum::{
    extract::{Path, State},
    Json,
};
use ncez_terminology::{CodeEntry, Compose, DEFAULT_COMPOSE_TAKE, DEFAULT_EXPAND_TAKE};
use serde::Deserialize;

use super::page_size;
use crate::api::extractors::{ApiJson, ApiQuery};
use crate::{state::AppState, Error, Result};

pub async fn list(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.terminology.value_set_names())
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpandParams {
    pub filter: Option<String>,
    pub take: Option<i64>,
}

pub async fn expand(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiQuery(params): ApiQuery<ExpandParams>,
) -> Result<Json<Vec<CodeEntry>>> {
    state
        .terminology
        .expand_value_set(
            &name,
            params.filter.as_deref(),
            page_size(params.take, DEFAULT_EXPAND_TAKE),
        )
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("ValueSet/{name}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct TakeParam {
    pub take: Option<i64>,
}

pub async fn expand_compose(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TakeParam>,
    ApiJson(compose): ApiJson<Compose>,
) -> Result<Json<Vec<CodeEntry>>> {
    let take = page_size(params.take, DEFAULT_COMPOSE_TAKE);
    Ok(Json(state.terminology.expand_compose(&compose, take)?))
}
