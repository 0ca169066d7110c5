#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use ncez_simulator::{api::create_router, AppState, Config};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub root: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> anyhow::Result<Value> {
        serde_json::from_slice(&self.body).context("parse response body as JSON")
    }
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    /// App over a fresh temporary data tree seeded with the standard fixtures.
    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let root = tempfile::tempdir().context("create temp data root")?;
        write_fixtures(root.path()).context("write fixtures")?;

        let mut config = Config::default();
        config.terminology.codesets_dir = root.path().join("CodeSets");
        config.terminology.valuesets_dir = root.path().join("ValueSets");
        config.terminology.conceptmaps_dir = root.path().join("ConceptMaps");
        config.terminology.watch_enabled = false;
        config.storage.data_root = root.path().join("runtime");
        configure(&mut config);

        let state = AppState::new(config)
            .await
            .context("initialize AppState")?;
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            root,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> anyhow::Result<TestResponse> {
        let body = match body {
            Some(value) => Body::from(serde_json::to_vec(&value).context("encode body")?),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("content-type", "application/json")
            .body(body)
            .context("build request")?;
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<TestResponse> {
        self.request(Method::GET, path_and_query, None).await
    }

    pub async fn post(&self, path_and_query: &str, body: Value) -> anyhow::Result<TestResponse> {
        self.request(Method::POST, path_and_query, Some(body)).await
    }

    /// POST a raw (possibly malformed) body.
    pub async fn post_raw(&self, path_and_query: &str, body: &str) -> anyhow::Result<TestResponse> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path_and_query)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .context("build request")?;
        self.dispatch(request).await
    }

    pub async fn post_empty(&self, path_and_query: &str) -> anyhow::Result<TestResponse> {
        self.request(Method::POST, path_and_query, None).await
    }
}
