// Main entry point - dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::application::card_repository::CardRepository;
use crate::application::listing_service::ListingService;
use crate::application::overview_service::OverviewService;
use crate::application::workspace_service::WorkspaceService;
use crate::infrastructure::config::{load_registry, load_settings};
use crate::infrastructure::metabase_repository::MetabaseRepository;
use crate::infrastructure::session::SessionManager;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    card_query, card_query_with_params, combined_data, config_info, dashboard_by_id, health, jobs,
    list_dashboards, liveness, workspace_details, workspace_files, workspace_hyperlinks,
    workspace_permissions, workspaces,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let settings = load_settings()?;
    let registry = Arc::new(load_registry()?);

    // Create repository (infrastructure layer)
    let session = SessionManager::new(settings.base_url(), settings.auth_mode());
    let repository: Arc<dyn CardRepository> =
        Arc::new(MetabaseRepository::new(settings.base_url(), session));

    // Create services (application layer)
    let overview_service = OverviewService::new(
        repository.clone(),
        registry.clone(),
        settings.dashboard_id_list(),
    );
    let listing_service = ListingService::new(repository.clone(), registry.clone());
    let workspace_service = WorkspaceService::new(repository.clone(), registry.clone());

    // Create application state
    let state = Arc::new(AppState {
        repository,
        overview_service,
        listing_service,
        workspace_service,
        settings: settings.clone(),
        registry,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/health", get(liveness))
        .route("/api/health", get(health))
        .route("/api/config", get(config_info))
        .route("/api/combined-data", get(combined_data))
        .route("/api/jobs", get(jobs))
        .route("/api/workspaces", get(workspaces))
        .route("/api/workspace/:id/details", get(workspace_details))
        .route("/api/workspace/:id/files", get(workspace_files))
        .route("/api/workspace/:id/hyperlinks", get(workspace_hyperlinks))
        .route("/api/workspace/:id/permissions", get(workspace_permissions))
        .route("/api/dashboards", get(list_dashboards))
        .route("/api/dashboard/:id", get(dashboard_by_id))
        .route("/api/card/:id/query", get(card_query).post(card_query_with_params))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    println!("Starting workspace-dashboard gateway on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
