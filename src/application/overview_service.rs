// Combined-data use case - cross-group metric aggregation
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::application::card_repository::CardRepository;
use crate::domain::dashboard::{CardRef, DashboardDefinition};
use crate::domain::metrics::{
    CombinedMetrics, GroupStatusCounts, GroupStatusSizes, GroupValue, MetricKind, StatusCount,
    StatusSize, Totals, classify_card, scalar_metric, status_counts, status_sizes, summed_metric,
};
use crate::infrastructure::config::GroupRegistry;

#[derive(Clone)]
pub struct OverviewService {
    repository: Arc<dyn CardRepository>,
    registry: Arc<GroupRegistry>,
    dashboard_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedData {
    pub dashboard_names: Vec<String>,
    pub metrics: CombinedMetrics,
    pub totals: Totals,
    pub aggregated_status: Vec<StatusCount>,
    pub aggregated_file_size: Vec<StatusSize>,
    pub dashboard_config: GroupRegistry,
    pub last_updated: String,
}

impl OverviewService {
    pub fn new(
        repository: Arc<dyn CardRepository>,
        registry: Arc<GroupRegistry>,
        dashboard_ids: Vec<i64>,
    ) -> Self {
        Self {
            repository,
            registry,
            dashboard_ids,
        }
    }

    /// Aggregate every configured summary dashboard into combined totals
    /// and status breakdowns. Recomputed from scratch on every call; a
    /// failing dashboard or card degrades to a gap, never an error.
    pub async fn combined_data(&self) -> CombinedData {
        let dashboards = self.fetch_dashboards().await;

        let mut dashboard_names = Vec::new();
        let mut worklist: Vec<CardRef> = Vec::new();
        for (index, dashboard) in dashboards.iter().enumerate() {
            let Some(dashboard) = dashboard else { continue };
            let name = dashboard
                .name
                .clone()
                .unwrap_or_else(|| format!("Database {}", index + 1));
            dashboard_names.push(name.clone());

            for dashcard in dashboard.cards() {
                let Some(card) = &dashcard.card else { continue };
                let Some(card_id) = card.id else { continue };
                worklist.push(CardRef {
                    card_id,
                    card_name: card.name.clone().unwrap_or_default(),
                    dashboard_name: name.clone(),
                    dashboard_index: index,
                });
            }
        }

        let queries = worklist.iter().map(|card| {
            let repository = self.repository.clone();
            let card_id = card.card_id;
            async move { repository.query_card_unfiltered(card_id).await }
        });
        let results = join_all(queries).await;

        let mut metrics = CombinedMetrics::default();
        for (card, result) in worklist.iter().zip(&results) {
            let Some(data) = result.as_ref().and_then(|r| r.data.as_ref()) else {
                continue;
            };
            let Some(kind) = classify_card(&card.card_name) else {
                continue;
            };

            let group_value = |value: i64| GroupValue {
                database: card.dashboard_name.clone(),
                db_index: card.dashboard_index,
                value,
            };
            match kind {
                MetricKind::TotalJobs => metrics.total_jobs.push(group_value(summed_metric(data))),
                MetricKind::CompletedJobs => {
                    metrics.completed_jobs.push(group_value(scalar_metric(data)));
                }
                MetricKind::InProgressJobs => {
                    metrics
                        .in_progress_jobs
                        .push(group_value(scalar_metric(data)));
                }
                MetricKind::PartiallyCompletedJobs => {
                    metrics
                        .partially_completed_jobs
                        .push(group_value(scalar_metric(data)));
                }
                MetricKind::WorkspaceStatusCount => {
                    metrics.workspace_status_count.push(GroupStatusCounts {
                        database: card.dashboard_name.clone(),
                        db_index: card.dashboard_index,
                        data: status_counts(data),
                    });
                }
                MetricKind::WorkspaceFileSize => {
                    metrics.workspace_file_size.push(GroupStatusSizes {
                        database: card.dashboard_name.clone(),
                        db_index: card.dashboard_index,
                        data: status_sizes(data),
                    });
                }
            }
        }

        let totals = metrics.totals();
        let aggregated_status = metrics.aggregated_status();
        let aggregated_file_size = metrics.aggregated_file_size();

        CombinedData {
            dashboard_names,
            metrics,
            totals,
            aggregated_status,
            aggregated_file_size,
            dashboard_config: (*self.registry).clone(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failed fetches keep their slot so later dashboards keep their
    /// ordinal index.
    async fn fetch_dashboards(&self) -> Vec<Option<DashboardDefinition>> {
        let fetches = self.dashboard_ids.iter().map(|id| {
            let repository = self.repository.clone();
            let id = *id;
            async move {
                match repository.dashboard(id).await {
                    Ok(value) => match serde_json::from_value::<DashboardDefinition>(value) {
                        Ok(definition) => Some(definition),
                        Err(err) => {
                            tracing::error!("dashboard {id} has an unexpected shape: {err}");
                            None
                        }
                    },
                    Err(err) => {
                        tracing::error!("failed to fetch dashboard {id}: {err}");
                        None
                    }
                }
            }
        });
        join_all(fetches).await
    }
}
