use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::models::Record;
use crate::pipeline::{Pipeline, Snapshot};

pub struct AppState {
    pub pipeline: Pipeline,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CompaniesResponse {
    pub fetched_at: DateTime<Utc>,
    pub total: usize,
    /// Records the search source tied to the cohort.
    pub corroborated: usize,
    pub companies: Vec<Record>,
}

impl From<Snapshot<Vec<Record>>> for CompaniesResponse {
    fn from(snapshot: Snapshot<Vec<Record>>) -> Self {
        let companies = snapshot.value.as_ref().clone();
        Self {
            fetched_at: snapshot.fetched_at,
            total: companies.len(),
            corroborated: companies.iter().filter(|r| r.corroborated).count(),
            companies,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(list_companies, refresh_companies),
    components(schemas(CompaniesResponse, Record)),
    tags((name = "companies", description = "Cohort company harvest"))
)]
pub struct ApiDoc;

/// Cached companies; the first call (or the first after expiry) runs a harvest.
#[utoipa::path(
    get,
    path = "/companies",
    responses(
        (status = 200, description = "Reconciled company list", body = CompaniesResponse)
    ),
    tag = "companies"
)]
pub async fn list_companies(State(state): State<Arc<AppState>>) -> Json<CompaniesResponse> {
    Json(state.pipeline.companies().await.into())
}

/// Discard the cached list and harvest again.
#[utoipa::path(
    post,
    path = "/companies/refresh",
    responses(
        (status = 200, description = "Freshly harvested company list", body = CompaniesResponse)
    ),
    tag = "companies"
)]
pub async fn refresh_companies(State(state): State<Arc<AppState>>) -> Json<CompaniesResponse> {
    Json(state.pipeline.refresh().await.into())
}
