// HTTP request handlers
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::application::listing_service::{JobsPage, WorkspacesPage};
use crate::application::overview_service::CombinedData;
use crate::application::workspace_service::{
    WorkspaceDetails, WorkspaceFiles, WorkspaceHyperlinks, WorkspacePermissions,
};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub database: Option<String>,
}

#[derive(Deserialize)]
pub struct ScopeQuery {
    pub database: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct CardQueryBody {
    #[serde(default)]
    pub parameters: Vec<Value>,
}

/// Liveness probe, constant 200.
pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": chrono::Utc::now().to_rfc3339() }))
}

/// Upstream connectivity probe via the current-user endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.repository.current_user().await {
        Ok(user) => (
            StatusCode::OK,
            Json(json!({
                "status": "connected",
                "metabaseUrl": state.settings.base_url(),
                "user": user.display(),
            })),
        ),
        Err(err) => {
            tracing::error!("health check failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "disconnected", "error": err.to_string() })),
            )
        }
    }
}

pub async fn config_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "metabaseUrl": state.settings.base_url(),
        "dashboardIds": state.settings.dashboard_id_list(),
        "dashboardConfig": state.registry.as_ref(),
        "hasCredentials": state.settings.has_credentials(),
    }))
}

pub async fn combined_data(State(state): State<Arc<AppState>>) -> Json<CombinedData> {
    Json(state.overview_service.combined_data().await)
}

pub async fn jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<JobsPage>, ApiError> {
    let page = state
        .listing_service
        .jobs(query.status.as_deref(), query.database.as_deref())
        .await?;
    Ok(Json(page))
}

pub async fn workspaces(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<WorkspacesPage>, ApiError> {
    let page = state
        .listing_service
        .workspaces(query.status.as_deref(), query.database.as_deref())
        .await?;
    Ok(Json(page))
}

pub async fn workspace_details(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<WorkspaceDetails>, ApiError> {
    let details = state
        .workspace_service
        .details(&workspace_id, query.database.as_deref())
        .await?;
    Ok(Json(details))
}

pub async fn workspace_files(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<WorkspaceFiles>, ApiError> {
    let files = state
        .workspace_service
        .files(&workspace_id, query.database.as_deref(), query.status.as_deref())
        .await?;
    Ok(Json(files))
}

pub async fn workspace_hyperlinks(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<WorkspaceHyperlinks>, ApiError> {
    let hyperlinks = state
        .workspace_service
        .hyperlinks(&workspace_id, query.database.as_deref(), query.status.as_deref())
        .await?;
    Ok(Json(hyperlinks))
}

pub async fn workspace_permissions(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<WorkspacePermissions>, ApiError> {
    let permissions = state
        .workspace_service
        .permissions(&workspace_id, query.database.as_deref(), query.status.as_deref())
        .await?;
    Ok(Json(permissions))
}

/// Every configured summary dashboard; failed fetches become error
/// placeholders instead of failing the listing.
pub async fn list_dashboards(State(state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    let fetches = state.settings.dashboard_id_list().into_iter().map(|id| {
        let repository = state.repository.clone();
        async move {
            match repository.dashboard(id).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::error!("failed to fetch dashboard {id}: {err}");
                    json!({ "id": id, "name": format!("Dashboard {id}"), "error": true })
                }
            }
        }
    });
    Json(join_all(fetches).await)
}

pub async fn dashboard_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.repository.dashboard(id).await?))
}

pub async fn card_query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.repository.query_card_raw(id, Vec::new()).await?))
}

pub async fn card_query_with_params(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Option<Json<CardQueryBody>>,
) -> Result<Json<Value>, ApiError> {
    let parameters = body.map(|Json(body)| body.parameters).unwrap_or_default();
    Ok(Json(state.repository.query_card_raw(id, parameters).await?))
}
