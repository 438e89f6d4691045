// Shared test doubles for service-level tests
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::application::card_repository::{CardRepository, UpstreamUser};
use crate::domain::error::GatewayError;
use crate::domain::record::TabularResult;
use crate::infrastructure::config::{
    DashboardGroup, FileCards, GroupRegistry, HyperlinkCards, JobCards, PermissionCards,
    WorkspaceCards,
};

/// Canned-response repository. Dashboard definitions are keyed by
/// dashboard id, card results by card id; anything not seeded fails (for
/// dashboards) or degrades to `None` (for cards). Calls are recorded for
/// assertions.
#[derive(Default)]
pub struct FakeRepository {
    pub dashboards: HashMap<i64, Value>,
    pub card_results: HashMap<i64, Value>,
    pub status_results: HashMap<i64, Value>,
    pub calls: Mutex<Vec<CallRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRecord {
    Card {
        card_id: i64,
        params: Vec<(String, String)>,
    },
    CardWithStatus {
        card_id: i64,
        status: String,
    },
    Unfiltered {
        card_id: i64,
    },
}

/// Build a card-query payload from column names and rows.
pub fn tabular(cols: &[&str], rows: Vec<Vec<Value>>) -> Value {
    json!({
        "data": {
            "cols": cols.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>(),
            "rows": rows,
        }
    })
}

fn result_for(map: &HashMap<i64, Value>, card_id: i64) -> Option<TabularResult> {
    map.get(&card_id)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

#[async_trait]
impl CardRepository for FakeRepository {
    async fn current_user(&self) -> Result<UpstreamUser, GatewayError> {
        Ok(UpstreamUser {
            common_name: Some("Test User".to_string()),
            email: None,
        })
    }

    async fn dashboard(&self, dashboard_id: i64) -> Result<Value, GatewayError> {
        self.dashboards
            .get(&dashboard_id)
            .cloned()
            .ok_or_else(|| GatewayError::Upstream(format!("dashboard {dashboard_id} unavailable")))
    }

    async fn query_card(
        &self,
        card_id: i64,
        params: &HashMap<String, String>,
    ) -> Option<TabularResult> {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.sort();
        self.calls
            .lock()
            .unwrap()
            .push(CallRecord::Card { card_id, params });
        result_for(&self.card_results, card_id)
    }

    async fn query_card_with_status(&self, card_id: i64, status: &str) -> Option<TabularResult> {
        self.calls.lock().unwrap().push(CallRecord::CardWithStatus {
            card_id,
            status: status.to_string(),
        });
        result_for(&self.status_results, card_id)
    }

    async fn query_card_unfiltered(&self, card_id: i64) -> Option<TabularResult> {
        self.calls
            .lock()
            .unwrap()
            .push(CallRecord::Unfiltered { card_id });
        result_for(&self.card_results, card_id)
    }

    async fn query_card_raw(
        &self,
        card_id: i64,
        _parameters: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        self.card_results
            .get(&card_id)
            .cloned()
            .ok_or_else(|| GatewayError::Upstream(format!("card {card_id} unavailable")))
    }
}

fn test_group(key: &str, base: i64) -> DashboardGroup {
    DashboardGroup {
        key: key.to_string(),
        jobs: JobCards {
            dashboard_id: base,
            job_list_card: base + 1,
        },
        workspaces: WorkspaceCards {
            dashboard_id: base,
            workspace_list_card: base + 2,
            file_folder_status_card: base + 3,
            hyperlinks_status_card: base + 4,
            permissions_status_card: base + 5,
            total_file_size_card: base + 6,
        },
        files: FileCards {
            dashboard_id: base,
            conflicts_card: base + 7,
            files_list_card: base + 8,
        },
        hyperlinks: HyperlinkCards {
            dashboard_id: base,
            hyperlinks_list_card: base + 9,
        },
        permissions: PermissionCards {
            dashboard_id: base,
            permissions_list_card: base + 10,
        },
    }
}

/// Two-group registry with predictable card ids: WP1 cards are 101..110,
/// WP2 cards are 201..210.
pub fn test_registry() -> GroupRegistry {
    GroupRegistry {
        groups: vec![test_group("WP1", 100), test_group("WP2", 200)],
    }
}
