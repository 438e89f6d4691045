// Repository trait for upstream card and dashboard access
use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::GatewayError;
use crate::domain::record::TabularResult;

/// The authenticated upstream user, reported by the health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamUser {
    pub common_name: Option<String>,
    pub email: Option<String>,
}

impl UpstreamUser {
    pub fn display(&self) -> String {
        self.common_name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Identify the authenticated upstream user.
    async fn current_user(&self) -> Result<UpstreamUser, GatewayError>;

    /// Full upstream dashboard definition by id.
    async fn dashboard(&self, dashboard_id: i64) -> Result<Value, GatewayError>;

    /// Query a card, substituting its declared template tags from the
    /// supplied parameter map. Failures degrade to `None`.
    async fn query_card(
        &self,
        card_id: i64,
        params: &HashMap<String, String>,
    ) -> Option<TabularResult>;

    /// Query a card, substituting only status-named template tags.
    async fn query_card_with_status(&self, card_id: i64, status: &str) -> Option<TabularResult>;

    /// Query a card with an empty parameter list.
    async fn query_card_unfiltered(&self, card_id: i64) -> Option<TabularResult>;

    /// Forward a caller-assembled parameter array straight to the card
    /// query endpoint.
    async fn query_card_raw(
        &self,
        card_id: i64,
        parameters: Vec<Value>,
    ) -> Result<Value, GatewayError>;
}
