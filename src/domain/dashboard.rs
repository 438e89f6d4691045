// Upstream dashboard definition shapes
use serde::Deserialize;

/// The subset of an upstream dashboard definition the aggregator reads.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardDefinition {
    pub name: Option<String>,
    #[serde(default)]
    pub dashcards: Vec<DashCard>,
    // Older upstream versions report cards under this field instead.
    #[serde(default)]
    pub ordered_cards: Vec<DashCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashCard {
    pub card: Option<CardSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardSummary {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl DashboardDefinition {
    pub fn cards(&self) -> &[DashCard] {
        if self.dashcards.is_empty() {
            &self.ordered_cards
        } else {
            &self.dashcards
        }
    }
}

/// A card flattened out of a dashboard, tagged with its owner.
#[derive(Debug, Clone)]
pub struct CardRef {
    pub card_id: i64,
    pub card_name: String,
    pub dashboard_name: String,
    pub dashboard_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cards_fall_back_to_the_legacy_field() {
        let dashboard: DashboardDefinition = serde_json::from_value(json!({
            "id": 42,
            "name": "Group One",
            "ordered_cards": [{ "card": { "id": 7, "name": "Total Jobs" } }],
        }))
        .unwrap();

        assert_eq!(dashboard.cards().len(), 1);
        assert_eq!(dashboard.cards()[0].card.as_ref().unwrap().id, Some(7));
    }

    #[test]
    fn dashcards_take_precedence_when_present() {
        let dashboard: DashboardDefinition = serde_json::from_value(json!({
            "dashcards": [{ "card": { "id": 1 } }, { "card": { "id": 2 } }],
            "ordered_cards": [{ "card": { "id": 9 } }],
        }))
        .unwrap();

        let ids: Vec<i64> = dashboard
            .cards()
            .iter()
            .filter_map(|dc| dc.card.as_ref().and_then(|c| c.id))
            .collect();
        assert_eq!(ids, [1, 2]);
    }
}
