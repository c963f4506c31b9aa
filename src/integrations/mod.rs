//! Third-party integrations and the item shape they all normalize into.

pub mod hubspot;

use serde::{Deserialize, Serialize};

/// Provider-agnostic record fetched from an integration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
    pub creation_time: Option<String>,
    pub last_modified_time: Option<String>,
    pub parent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_serialization() {
        let item = IntegrationItem {
            id: "101".to_string(),
            item_type: "contact".to_string(),
            name: "Ada Lovelace".to_string(),
            creation_time: Some("2026-01-01T00:00:00Z".to_string()),
            last_modified_time: None,
            parent_id: None,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "contact");
        assert_eq!(json["name"], "Ada Lovelace");
        assert!(json["parent_id"].is_null());
        assert!(json["last_modified_time"].is_null());
        assert!(json.get("item_type").is_none());
    }
}
