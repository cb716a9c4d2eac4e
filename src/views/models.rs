use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::EntityKind;

/// One accepted view, as stored in a ledger. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub id: i64,
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub visitor_user_id: Option<i64>,
    pub visitor_address: String,
    pub visitor_signature: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of one `record_view` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub views: i64,
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub views: i64,
}

/// Read-only aggregation over one entity's ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStats {
    pub total_views: i64,
    pub unique_users: i64,
    pub unique_addresses: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(RecordOutcome {
            views: 3,
            is_new: true,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "views": 3, "isNew": true }));
    }

    #[test]
    fn test_empty_stats_json_shape() {
        let json = serde_json::to_value(ViewStats::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalViews": 0,
                "uniqueUsers": 0,
                "uniqueAddresses": 0,
                "lastViewedAt": null
            })
        );
    }
}
