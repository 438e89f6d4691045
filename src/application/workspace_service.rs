// Workspace-scoped detail use cases - files, hyperlinks, permissions
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::application::card_repository::CardRepository;
use crate::domain::error::GatewayError;
use crate::domain::record::{Record, normalize};
use crate::infrastructure::config::{DashboardGroup, GroupRegistry};

#[derive(Clone)]
pub struct WorkspaceService {
    repository: Arc<dyn CardRepository>,
    registry: Arc<GroupRegistry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDetails {
    pub workspace_id: String,
    pub database: String,
    pub file_folder_status: Vec<Record>,
    pub hyperlinks_status: Vec<Record>,
    pub permissions_status: Vec<Record>,
    pub total_file_size: Vec<Record>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFiles {
    pub workspace_id: String,
    pub database: String,
    pub status: Option<String>,
    pub conflicts: Vec<Record>,
    pub files: Vec<Record>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceHyperlinks {
    pub workspace_id: String,
    pub database: String,
    pub hyperlinks: Vec<Record>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePermissions {
    pub workspace_id: String,
    pub database: String,
    pub permissions: Vec<Record>,
}

/// Upstream parameter names for a workspace id have drifted across card
/// revisions; every known alias is sent and tag matching picks the one
/// the card declares.
const WORKSPACE_ID_ALIASES: &[&str] = &[
    "workspaceId",
    "moveWorkSpaceId",
    "workspace_id",
    "move_workspace_id",
];

fn workspace_params(workspace_id: &str, status: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for alias in WORKSPACE_ID_ALIASES {
        params.insert(alias.to_string(), workspace_id.to_string());
    }
    if let Some(status) = status {
        params.insert("processStatus".to_string(), status.to_string());
        params.insert("process_status".to_string(), status.to_string());
    }
    params
}

impl WorkspaceService {
    pub fn new(repository: Arc<dyn CardRepository>, registry: Arc<GroupRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    fn group(&self, database: Option<&str>) -> Result<&DashboardGroup, GatewayError> {
        let key = database.ok_or(GatewayError::MissingParameter("database"))?;
        self.registry
            .group(key)
            .ok_or_else(|| GatewayError::UnknownGroup(key.to_string()))
    }

    /// Per-workspace status breakdowns, one card each, fetched in parallel.
    pub async fn details(
        &self,
        workspace_id: &str,
        database: Option<&str>,
    ) -> Result<WorkspaceDetails, GatewayError> {
        let group = self.group(database)?;
        let cards = &group.workspaces;
        let params = workspace_params(workspace_id, None);

        let (file_folder, hyperlinks, permissions, total_size) = tokio::join!(
            self.repository.query_card(cards.file_folder_status_card, &params),
            self.repository.query_card(cards.hyperlinks_status_card, &params),
            self.repository.query_card(cards.permissions_status_card, &params),
            self.repository.query_card(cards.total_file_size_card, &params),
        );

        Ok(WorkspaceDetails {
            workspace_id: workspace_id.to_string(),
            database: group.key.clone(),
            file_folder_status: normalize(file_folder.as_ref()),
            hyperlinks_status: normalize(hyperlinks.as_ref()),
            permissions_status: normalize(permissions.as_ref()),
            total_file_size: normalize(total_size.as_ref()),
        })
    }

    pub async fn files(
        &self,
        workspace_id: &str,
        database: Option<&str>,
        status: Option<&str>,
    ) -> Result<WorkspaceFiles, GatewayError> {
        let group = self.group(database)?;
        let cards = &group.files;
        let params = workspace_params(workspace_id, status);

        let (conflicts, files) = tokio::join!(
            self.repository.query_card(cards.conflicts_card, &params),
            self.repository.query_card(cards.files_list_card, &params),
        );

        Ok(WorkspaceFiles {
            workspace_id: workspace_id.to_string(),
            database: group.key.clone(),
            status: status.map(str::to_string),
            conflicts: normalize(conflicts.as_ref()),
            files: normalize(files.as_ref()),
        })
    }

    pub async fn hyperlinks(
        &self,
        workspace_id: &str,
        database: Option<&str>,
        status: Option<&str>,
    ) -> Result<WorkspaceHyperlinks, GatewayError> {
        let group = self.group(database)?;
        let params = workspace_params(workspace_id, status);
        let result = self
            .repository
            .query_card(group.hyperlinks.hyperlinks_list_card, &params)
            .await;

        Ok(WorkspaceHyperlinks {
            workspace_id: workspace_id.to_string(),
            database: group.key.clone(),
            hyperlinks: normalize(result.as_ref()),
        })
    }

    pub async fn permissions(
        &self,
        workspace_id: &str,
        database: Option<&str>,
        status: Option<&str>,
    ) -> Result<WorkspacePermissions, GatewayError> {
        let group = self.group(database)?;
        let params = workspace_params(workspace_id, status);
        let result = self
            .repository
            .query_card(group.permissions.permissions_list_card, &params)
            .await;

        Ok(WorkspacePermissions {
            workspace_id: workspace_id.to_string(),
            database: group.key.clone(),
            permissions: normalize(result.as_ref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{CallRecord, FakeRepository, tabular, test_registry};
    use serde_json::json;

    // Test registry card ids for WP1: details cards 103-106, files 107/108,
    // hyperlinks 109, permissions 110.
    fn service(repo: Arc<FakeRepository>) -> WorkspaceService {
        WorkspaceService::new(repo, Arc::new(test_registry()))
    }

    #[tokio::test]
    async fn details_fetch_all_four_cards_with_every_id_alias() {
        let mut repo = FakeRepository::default();
        repo.card_results.insert(
            103,
            tabular(&["status", "count"], vec![vec![json!("COMPLETED"), json!(3)]]),
        );
        let repo = Arc::new(repo);

        let details = service(repo.clone())
            .details("ws-9", Some("WP1"))
            .await
            .unwrap();

        assert_eq!(details.database, "WP1");
        assert_eq!(details.file_folder_status.len(), 1);
        assert!(details.hyperlinks_status.is_empty());

        let calls = repo.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        for call in calls.iter() {
            let CallRecord::Card { params, .. } = call else {
                panic!("expected a parameterized card call, got {call:?}");
            };
            for alias in super::WORKSPACE_ID_ALIASES {
                assert!(params.iter().any(|(k, v)| k == alias && v == "ws-9"));
            }
        }
        let queried: Vec<i64> = calls
            .iter()
            .map(|call| match call {
                CallRecord::Card { card_id, .. } => *card_id,
                _ => unreachable!(),
            })
            .collect();
        for card_id in [103, 104, 105, 106] {
            assert!(queried.contains(&card_id));
        }
    }

    #[tokio::test]
    async fn files_pass_the_status_filter_through_to_both_cards() {
        let repo = Arc::new(FakeRepository::default());
        let files = service(repo.clone())
            .files("ws-1", Some("WP1"), Some("CONFLICT"))
            .await
            .unwrap();

        assert_eq!(files.status.as_deref(), Some("CONFLICT"));
        assert!(files.conflicts.is_empty());
        assert!(files.files.is_empty());

        let calls = repo.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        for call in calls.iter() {
            let CallRecord::Card { params, .. } = call else {
                panic!("expected a parameterized card call, got {call:?}");
            };
            assert!(params.iter().any(|(k, v)| k == "processStatus" && v == "CONFLICT"));
            assert!(params.iter().any(|(k, v)| k == "process_status" && v == "CONFLICT"));
        }
    }

    #[tokio::test]
    async fn database_is_required_and_must_be_known() {
        let svc = service(Arc::new(FakeRepository::default()));

        assert!(matches!(
            svc.hyperlinks("ws-1", None, None).await.unwrap_err(),
            GatewayError::MissingParameter("database")
        ));
        assert!(matches!(
            svc.permissions("ws-1", Some("WP9"), None).await.unwrap_err(),
            GatewayError::UnknownGroup(_)
        ));
    }
}
