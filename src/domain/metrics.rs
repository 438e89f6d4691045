// Metric classification and cross-group aggregation
use serde::Serialize;
use serde_json::Value;

use super::record::{TabularData, value_as_i64};

const STATUS_COLUMNS: &[&str] = &["processStatus", "status"];
const COUNT_COLUMNS: &[&str] = &["totalCount", "count"];
const SIZE_COLUMNS: &[&str] = &["totalFileSize", "size", "totalSize"];

/// Metric families recognized on the summary dashboards. Card display
/// names decide membership; anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    TotalJobs,
    CompletedJobs,
    InProgressJobs,
    PartiallyCompletedJobs,
    WorkspaceStatusCount,
    WorkspaceFileSize,
}

/// Classify a card by case-insensitive substring matching on its display
/// name.
pub fn classify_card(name: &str) -> Option<MetricKind> {
    let name = name.to_lowercase();
    if name.contains("total jobs") {
        Some(MetricKind::TotalJobs)
    } else if name.contains("completed jobs") && !name.contains("partially") {
        Some(MetricKind::CompletedJobs)
    } else if name.contains("in progress") || name.contains("in_progress") {
        Some(MetricKind::InProgressJobs)
    } else if name.contains("partially completed") {
        Some(MetricKind::PartiallyCompletedJobs)
    } else if name.contains("status count") && name.contains("workspace") {
        Some(MetricKind::WorkspaceStatusCount)
    } else if name.contains("file size") && name.contains("workspace") {
        Some(MetricKind::WorkspaceFileSize)
    } else {
        None
    }
}

/// Scalar metric value: last column of the first row, integer-coerced.
pub fn scalar_metric(data: &TabularData) -> i64 {
    data.rows
        .first()
        .and_then(|row| row.last())
        .map(value_as_i64)
        .unwrap_or(0)
}

/// Sum of the count column across all rows, falling back to the last
/// column when no count column is declared.
pub fn summed_metric(data: &TabularData) -> i64 {
    let idx = data
        .column_index(COUNT_COLUMNS)
        .unwrap_or(data.cols.len().saturating_sub(1));
    data.rows
        .iter()
        .map(|row| row.get(idx).map(value_as_i64).unwrap_or(0))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSize {
    pub status: String,
    pub size: i64,
}

fn status_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Decompose status-count rows into label/count pairs. The status label
/// comes from `processStatus`/`status` (else the first column) and the
/// count from `totalCount`/`count` (else the second column).
pub fn status_counts(data: &TabularData) -> Vec<StatusCount> {
    let status_idx = data.column_index(STATUS_COLUMNS).unwrap_or(0);
    let count_idx = data.column_index(COUNT_COLUMNS).unwrap_or(1);
    data.rows
        .iter()
        .map(|row| StatusCount {
            status: status_label(row.get(status_idx)),
            count: row.get(count_idx).map(value_as_i64).unwrap_or(0),
        })
        .collect()
}

/// Same decomposition for file-size rows, with the size column resolved
/// from `totalFileSize`/`size`/`totalSize`.
pub fn status_sizes(data: &TabularData) -> Vec<StatusSize> {
    let status_idx = data.column_index(STATUS_COLUMNS).unwrap_or(0);
    let size_idx = data.column_index(SIZE_COLUMNS).unwrap_or(1);
    data.rows
        .iter()
        .map(|row| StatusSize {
            status: status_label(row.get(status_idx)),
            size: row.get(size_idx).map(value_as_i64).unwrap_or(0),
        })
        .collect()
}

/// Per-status sums, preserving first-seen label order across groups.
#[derive(Debug, Default)]
pub struct OrderedTally {
    entries: Vec<(String, i64)>,
}

impl OrderedTally {
    pub fn add(&mut self, label: &str, value: i64) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, total)) => *total += value,
            None => self.entries.push((label.to_string(), value)),
        }
    }

    pub fn into_counts(self) -> Vec<StatusCount> {
        self.entries
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect()
    }

    pub fn into_sizes(self) -> Vec<StatusSize> {
        self.entries
            .into_iter()
            .map(|(status, size)| StatusSize { status, size })
            .collect()
    }
}

/// One group's contribution to a scalar metric.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupValue {
    pub database: String,
    pub db_index: usize,
    pub value: i64,
}

/// One group's status-count breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusCounts {
    pub database: String,
    pub db_index: usize,
    pub data: Vec<StatusCount>,
}

/// One group's file-size breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusSizes {
    pub database: String,
    pub db_index: usize,
    pub data: Vec<StatusSize>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedMetrics {
    pub total_jobs: Vec<GroupValue>,
    pub completed_jobs: Vec<GroupValue>,
    pub in_progress_jobs: Vec<GroupValue>,
    pub partially_completed_jobs: Vec<GroupValue>,
    pub workspace_status_count: Vec<GroupStatusCounts>,
    pub workspace_file_size: Vec<GroupStatusSizes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub in_progress_jobs: i64,
    pub partially_completed_jobs: i64,
}

impl CombinedMetrics {
    pub fn totals(&self) -> Totals {
        let sum = |values: &[GroupValue]| values.iter().map(|v| v.value).sum();
        Totals {
            total_jobs: sum(&self.total_jobs),
            completed_jobs: sum(&self.completed_jobs),
            in_progress_jobs: sum(&self.in_progress_jobs),
            partially_completed_jobs: sum(&self.partially_completed_jobs),
        }
    }

    pub fn aggregated_status(&self) -> Vec<StatusCount> {
        let mut tally = OrderedTally::default();
        for group in &self.workspace_status_count {
            for entry in &group.data {
                tally.add(&entry.status, entry.count);
            }
        }
        tally.into_counts()
    }

    pub fn aggregated_file_size(&self) -> Vec<StatusSize> {
        let mut tally = OrderedTally::default();
        for group in &self.workspace_file_size {
            for entry in &group.data {
                tally.add(&entry.status, entry.size);
            }
        }
        tally.into_sizes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: serde_json::Value) -> TabularData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classification_follows_display_name_substrings() {
        assert_eq!(classify_card("Total Jobs Per Status"), Some(MetricKind::TotalJobs));
        assert_eq!(classify_card("COMPLETED JOBS"), Some(MetricKind::CompletedJobs));
        assert_eq!(
            classify_card("Partially Completed Jobs"),
            Some(MetricKind::PartiallyCompletedJobs)
        );
        assert_eq!(classify_card("Jobs In Progress"), Some(MetricKind::InProgressJobs));
        assert_eq!(classify_card("jobs in_progress"), Some(MetricKind::InProgressJobs));
        assert_eq!(
            classify_card("Workspace Status Count"),
            Some(MetricKind::WorkspaceStatusCount)
        );
        assert_eq!(
            classify_card("Workspace Total File Size"),
            Some(MetricKind::WorkspaceFileSize)
        );
        assert_eq!(classify_card("Random Chart"), None);
    }

    #[test]
    fn scalar_metric_reads_last_column_of_first_row() {
        let data = data(json!({
            "cols": [{ "name": "label" }, { "name": "value" }],
            "rows": [["done", 12], ["ignored", 99]],
        }));
        assert_eq!(scalar_metric(&data), 12);
        assert_eq!(scalar_metric(&TabularData::default()), 0);
    }

    #[test]
    fn summed_metric_prefers_the_count_column() {
        let with_count = data(json!({
            "cols": [{ "name": "day" }, { "name": "totalCount" }],
            "rows": [["mon", 10], ["tue", 5]],
        }));
        assert_eq!(summed_metric(&with_count), 15);

        let without_count = data(json!({
            "cols": [{ "name": "day" }, { "name": "n" }],
            "rows": [["mon", 3], ["tue", "4"]],
        }));
        assert_eq!(summed_metric(&without_count), 7);
    }

    #[test]
    fn status_rows_fall_back_to_positional_columns() {
        let named = data(json!({
            "cols": [{ "name": "other" }, { "name": "processStatus" }, { "name": "totalCount" }],
            "rows": [["x", "COMPLETED", 10]],
        }));
        assert_eq!(
            status_counts(&named),
            [StatusCount { status: "COMPLETED".into(), count: 10 }]
        );

        let positional = data(json!({
            "cols": [{ "name": "a" }, { "name": "b" }],
            "rows": [["CONFLICT", "2"]],
        }));
        assert_eq!(
            status_counts(&positional),
            [StatusCount { status: "CONFLICT".into(), count: 2 }]
        );
    }

    #[test]
    fn file_size_rows_resolve_their_own_value_column() {
        let data = data(json!({
            "cols": [{ "name": "status" }, { "name": "totalFileSize" }],
            "rows": [["COMPLETED", 2048], ["CONFLICT", 512]],
        }));
        assert_eq!(
            status_sizes(&data),
            [
                StatusSize { status: "COMPLETED".into(), size: 2048 },
                StatusSize { status: "CONFLICT".into(), size: 512 },
            ]
        );
    }

    #[test]
    fn tally_sums_per_label_in_first_seen_order() {
        let mut tally = OrderedTally::default();
        tally.add("COMPLETED", 10);
        tally.add("CONFLICT", 2);
        tally.add("COMPLETED", 5);
        assert_eq!(
            tally.into_counts(),
            [
                StatusCount { status: "COMPLETED".into(), count: 15 },
                StatusCount { status: "CONFLICT".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn totals_sum_each_metric_across_groups() {
        let metrics = CombinedMetrics {
            total_jobs: vec![
                GroupValue { database: "WP1".into(), db_index: 0, value: 100 },
                GroupValue { database: "WP2".into(), db_index: 1, value: 150 },
            ],
            completed_jobs: vec![GroupValue { database: "WP1".into(), db_index: 0, value: 40 }],
            ..Default::default()
        };
        let totals = metrics.totals();
        assert_eq!(totals.total_jobs, 250);
        assert_eq!(totals.completed_jobs, 40);
        assert_eq!(totals.in_progress_jobs, 0);
    }
}
