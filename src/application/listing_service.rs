// Jobs and workspaces listing use cases
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::application::card_repository::CardRepository;
use crate::domain::error::GatewayError;
use crate::domain::record::{Record, normalize};
use crate::infrastructure::config::{ALL, DashboardGroup, GroupRegistry};

#[derive(Clone)]
pub struct ListingService {
    repository: Arc<dyn CardRepository>,
    registry: Arc<GroupRegistry>,
}

#[derive(Debug, Serialize)]
pub struct ListFilter {
    pub status: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobsPage {
    pub jobs: Vec<Record>,
    pub total: usize,
    pub filter: ListFilter,
}

#[derive(Debug, Serialize)]
pub struct WorkspacesPage {
    pub workspaces: Vec<Record>,
    pub total: usize,
    pub filter: ListFilter,
}

/// Exact-match re-filter applied after upstream filtering; some list cards
/// ignore their status parameter.
fn matches_status(record: &Record, fields: &[&str], status: &str) -> bool {
    fields
        .iter()
        .any(|field| record.get(*field).and_then(Value::as_str) == Some(status))
}

impl ListingService {
    pub fn new(repository: Arc<dyn CardRepository>, registry: Arc<GroupRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    pub async fn jobs(
        &self,
        status: Option<&str>,
        database: Option<&str>,
    ) -> Result<JobsPage, GatewayError> {
        let jobs = self
            .collect(
                status,
                database,
                |group| group.jobs.job_list_card,
                &["jobStatus", "job_status"],
            )
            .await?;
        Ok(JobsPage {
            total: jobs.len(),
            jobs,
            filter: ListFilter {
                status: status.map(str::to_string),
                database: database.map(str::to_string),
            },
        })
    }

    pub async fn workspaces(
        &self,
        status: Option<&str>,
        database: Option<&str>,
    ) -> Result<WorkspacesPage, GatewayError> {
        let workspaces = self
            .collect(
                status,
                database,
                |group| group.workspaces.workspace_list_card,
                &["processStatus", "process_status"],
            )
            .await?;
        Ok(WorkspacesPage {
            total: workspaces.len(),
            workspaces,
            filter: ListFilter {
                status: status.map(str::to_string),
                database: database.map(str::to_string),
            },
        })
    }

    /// Fan out over the selected groups, projecting every row into a flat
    /// record tagged with its group key. With a status filter the list card
    /// is queried with the status substituted; a null or empty result falls
    /// back to an unfiltered query, re-filtered here.
    async fn collect(
        &self,
        status: Option<&str>,
        database: Option<&str>,
        card_of: impl Fn(&DashboardGroup) -> i64,
        status_fields: &[&str],
    ) -> Result<Vec<Record>, GatewayError> {
        let filter = status.filter(|s| *s != ALL);
        let groups = self.registry.select(database)?;

        let fetches = groups.into_iter().map(|group| {
            let repository = self.repository.clone();
            let card_id = card_of(group);
            let key = group.key.clone();
            async move {
                let mut result = match filter {
                    Some(status) => repository.query_card_with_status(card_id, status).await,
                    None => None,
                };
                if result.as_ref().and_then(|r| r.data.as_ref()).is_none() {
                    result = repository.query_card_unfiltered(card_id).await;
                }

                normalize(result.as_ref())
                    .into_iter()
                    .map(|row| {
                        let mut record = Record::new();
                        record.insert("database".to_string(), Value::String(key.clone()));
                        record.extend(row);
                        record
                    })
                    .collect::<Vec<Record>>()
            }
        });

        let mut records: Vec<Record> = join_all(fetches).await.into_iter().flatten().collect();
        if let Some(status) = filter {
            records.retain(|record| matches_status(record, status_fields, status));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{CallRecord, FakeRepository, tabular, test_registry};
    use serde_json::json;

    fn service(repo: FakeRepository) -> ListingService {
        ListingService::new(Arc::new(repo), Arc::new(test_registry()))
    }

    // The test registry maps WP1 jobs to card 101 and WP2 jobs to card 201.
    fn job_rows(repo: &mut FakeRepository) {
        repo.card_results.insert(
            101,
            tabular(
                &["jobId", "jobStatus"],
                vec![
                    vec![json!("a"), json!("COMPLETED")],
                    vec![json!("b"), json!("IN_PROGRESS")],
                ],
            ),
        );
        repo.card_results.insert(
            201,
            tabular(&["jobId", "jobStatus"], vec![vec![json!("c"), json!("COMPLETED")]]),
        );
    }

    #[tokio::test]
    async fn rows_are_tagged_with_their_group_key() {
        let mut repo = FakeRepository::default();
        job_rows(&mut repo);

        let page = service(repo).jobs(None, None).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.jobs[0]["database"], json!("WP1"));
        assert_eq!(page.jobs[2]["database"], json!("WP2"));
        // The group tag is the first key in each record.
        assert_eq!(page.jobs[0].keys().next().unwrap(), "database");
    }

    #[tokio::test]
    async fn status_filter_keeps_only_matching_records() {
        let mut repo = FakeRepository::default();
        job_rows(&mut repo);
        // No status_results seeded: the status query misses and the
        // unfiltered fallback is re-filtered client-side.
        let page = service(repo).jobs(Some("COMPLETED"), None).await.unwrap();

        assert_eq!(page.total, 2);
        assert!(page.jobs.iter().all(|job| job["jobStatus"] == json!("COMPLETED")));
    }

    #[tokio::test]
    async fn all_sentinel_disables_filtering() {
        let mut repo = FakeRepository::default();
        job_rows(&mut repo);
        let page = service(repo).jobs(Some("ALL"), Some("ALL")).await.unwrap();
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn successful_status_query_skips_the_fallback() {
        let mut repo = FakeRepository::default();
        repo.status_results.insert(
            101,
            tabular(&["jobId", "jobStatus"], vec![vec![json!("a"), json!("CONFLICT")]]),
        );
        repo.status_results.insert(
            201,
            tabular(&["jobId", "jobStatus"], vec![vec![json!("z"), json!("CONFLICT")]]),
        );

        let repo = Arc::new(repo);
        let svc = ListingService::new(repo.clone(), Arc::new(test_registry()));
        let page = svc.jobs(Some("CONFLICT"), Some("WP1")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.jobs[0]["jobId"], json!("a"));

        let calls = repo.calls.lock().unwrap();
        assert_eq!(
            *calls,
            [CallRecord::CardWithStatus { card_id: 101, status: "CONFLICT".into() }]
        );
    }

    #[tokio::test]
    async fn unknown_group_is_rejected() {
        let mut repo = FakeRepository::default();
        job_rows(&mut repo);
        let err = service(repo).jobs(None, Some("WP9")).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownGroup(_)));
    }

    #[tokio::test]
    async fn workspaces_refilter_on_process_status() {
        let mut repo = FakeRepository::default();
        repo.card_results.insert(
            102,
            tabular(
                &["workspaceId", "processStatus"],
                vec![
                    vec![json!("w1"), json!("COMPLETED")],
                    vec![json!("w2"), json!("CONFLICT")],
                ],
            ),
        );
        repo.card_results.insert(
            202,
            tabular(&["workspaceId", "process_status"], vec![vec![json!("w3"), json!("CONFLICT")]]),
        );

        let page = service(repo)
            .workspaces(Some("CONFLICT"), None)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.workspaces.iter().all(|ws| ws["database"] != json!("")));
    }
}
