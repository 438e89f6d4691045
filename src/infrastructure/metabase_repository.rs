// Metabase repository - authenticated card queries and pass-throughs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::application::card_repository::{CardRepository, UpstreamUser};
use crate::domain::error::GatewayError;
use crate::domain::record::TabularResult;
use crate::infrastructure::session::SessionManager;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Substituted for declared parameters the caller did not supply.
const FALLBACK_VALUE: &str = "ALL";

/// Declared template tags for one card, cached for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct CardMetadata {
    pub tags: Vec<TemplateTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateTag {
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

pub struct MetabaseRepository {
    base_url: String,
    http: reqwest::Client,
    session: SessionManager,
    metadata_cache: RwLock<HashMap<i64, CardMetadata>>,
}

fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_lowercase()
}

/// Best-effort lookup of a caller-supplied value for a declared tag:
/// exact name first, then case-insensitive, then underscore-insensitive.
fn match_tag_value<'a>(tag: &str, params: &'a HashMap<String, String>) -> Option<&'a str> {
    if let Some(value) = params.get(tag) {
        return Some(value.as_str());
    }
    let lowered = tag.to_lowercase();
    if let Some(value) = params
        .iter()
        .find(|(key, _)| key.to_lowercase() == lowered)
        .map(|(_, value)| value.as_str())
    {
        return Some(value);
    }
    let folded = fold_name(tag);
    params
        .iter()
        .find(|(key, _)| fold_name(key) == folded)
        .map(|(_, value)| value.as_str())
}

fn parameter_entry(tag: &TemplateTag, value: &str) -> Value {
    let kind = match tag.tag_type.as_deref() {
        Some("text") => "text",
        _ => "category",
    };
    json!({
        "type": kind,
        "value": value,
        "target": ["variable", ["template-tag", tag.name]],
    })
}

/// One entry per declared tag that either matched a supplied value or is
/// required (those default to "ALL"). Unmatched optional tags are omitted.
fn build_parameters(tags: &[TemplateTag], params: &HashMap<String, String>) -> Vec<Value> {
    let mut entries = Vec::new();
    for tag in tags {
        match match_tag_value(&tag.name, params) {
            Some(value) => entries.push(parameter_entry(tag, value)),
            None if tag.required => entries.push(parameter_entry(tag, FALLBACK_VALUE)),
            None => {}
        }
    }
    entries
}

/// Substitution restricted to status-named tags; every other declared tag
/// gets the "ALL" sentinel.
fn build_status_parameters(tags: &[TemplateTag], status: &str) -> Vec<Value> {
    tags.iter()
        .map(|tag| {
            if tag.name.to_lowercase().contains("status") {
                parameter_entry(tag, status)
            } else {
                parameter_entry(tag, FALLBACK_VALUE)
            }
        })
        .collect()
}

impl MetabaseRepository {
    pub fn new(base_url: String, session: SessionManager) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
            session,
            metadata_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        force_refresh: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let credential = self.session.credential(force_refresh).await?;
        let (header, value) = credential.header();
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .timeout(REQUEST_TIMEOUT)
            .header(header, value);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    /// Authenticated request against the upstream API. A 401 forces one
    /// credential refresh and a single retry; the retry's outcome is final.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let mut response = self.send(method.clone(), path, body, false).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("session expired, refreshing");
            response = self.send(method, path, body, true).await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(format!(
                "{path} returned {status}: {text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Template tags for a card, fetched once and cached. A failed fetch
    /// degrades to zero declared parameters and is not cached, so a later
    /// call gets another chance.
    async fn card_metadata(&self, card_id: i64) -> CardMetadata {
        if let Some(metadata) = self.metadata_cache.read().await.get(&card_id) {
            return metadata.clone();
        }

        match self.fetch_card_metadata(card_id).await {
            Ok(metadata) => {
                self.metadata_cache
                    .write()
                    .await
                    .insert(card_id, metadata.clone());
                metadata
            }
            Err(err) => {
                tracing::error!("failed to fetch metadata for card {card_id}: {err}");
                CardMetadata::default()
            }
        }
    }

    async fn fetch_card_metadata(&self, card_id: i64) -> Result<CardMetadata, GatewayError> {
        let card = self
            .request(Method::GET, &format!("/api/card/{card_id}"), None)
            .await?;

        let tags = card
            .pointer("/dataset_query/native/template-tags")
            .and_then(Value::as_object)
            .map(|tags| {
                tags.values()
                    .filter_map(|tag| serde_json::from_value(tag.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(CardMetadata { tags })
    }

    async fn run_query(&self, card_id: i64, parameters: Vec<Value>) -> Result<Value, GatewayError> {
        self.request(
            Method::POST,
            &format!("/api/card/{card_id}/query"),
            Some(&json!({ "parameters": parameters })),
        )
        .await
    }

    async fn query_with(&self, card_id: i64, parameters: Vec<Value>) -> Option<TabularResult> {
        match self.run_query(card_id, parameters).await {
            Ok(value) => match serde_json::from_value(value) {
                Ok(result) => Some(result),
                Err(err) => {
                    tracing::error!("card {card_id} returned an unexpected shape: {err}");
                    None
                }
            },
            Err(err) => {
                tracing::error!("failed to query card {card_id}: {err}");
                None
            }
        }
    }
}

#[async_trait]
impl CardRepository for MetabaseRepository {
    async fn current_user(&self) -> Result<UpstreamUser, GatewayError> {
        let value = self.request(Method::GET, "/api/user/current", None).await?;
        serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn dashboard(&self, dashboard_id: i64) -> Result<Value, GatewayError> {
        self.request(Method::GET, &format!("/api/dashboard/{dashboard_id}"), None)
            .await
    }

    async fn query_card(
        &self,
        card_id: i64,
        params: &HashMap<String, String>,
    ) -> Option<TabularResult> {
        let metadata = self.card_metadata(card_id).await;
        self.query_with(card_id, build_parameters(&metadata.tags, params))
            .await
    }

    async fn query_card_with_status(&self, card_id: i64, status: &str) -> Option<TabularResult> {
        let metadata = self.card_metadata(card_id).await;
        self.query_with(card_id, build_status_parameters(&metadata.tags, status))
            .await
    }

    async fn query_card_unfiltered(&self, card_id: i64) -> Option<TabularResult> {
        self.query_with(card_id, Vec::new()).await
    }

    async fn query_card_raw(
        &self,
        card_id: i64,
        parameters: Vec<Value>,
    ) -> Result<Value, GatewayError> {
        self.run_query(card_id, parameters).await
    }
}
