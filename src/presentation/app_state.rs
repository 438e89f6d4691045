// Application state for HTTP handlers
use std::sync::Arc;

use crate::application::card_repository::CardRepository;
use crate::application::listing_service::ListingService;
use crate::application::overview_service::OverviewService;
use crate::application::workspace_service::WorkspaceService;
use crate::infrastructure::config::{GroupRegistry, Settings};

pub struct AppState {
    pub repository: Arc<dyn CardRepository>,
    pub overview_service: OverviewService,
    pub listing_service: ListingService,
    pub workspace_service: WorkspaceService,
    pub settings: Settings,
    pub registry: Arc<GroupRegistry>,
}
