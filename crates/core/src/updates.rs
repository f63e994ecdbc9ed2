#![forbid(unsafe_code)]

use crate::local::LocalCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A local-shape operation a device applies to catch up. Both variants are idempotent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientUpdate {
    Overwrite {
        collection: LocalCollection,
        object: Value,
    },
    Delete {
        collection: LocalCollection,
        #[serde(rename = "where")]
        criteria: Value,
    },
}

impl ClientUpdate {
    pub fn collection(&self) -> LocalCollection {
        match self {
            ClientUpdate::Overwrite { collection, .. }
            | ClientUpdate::Delete { collection, .. } => *collection,
        }
    }
}

/// Position in a user's change log. Ordered by time first, log id second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub time: i64,
    pub log_id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBatch {
    pub batch: Vec<ClientUpdate>,
    /// Last scanned entry, including entries that produced no update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    pub maybe_has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_update_wire_shape() {
        let overwrite = ClientUpdate::Overwrite {
            collection: LocalCollection::Pages,
            object: json!({ "url": "a.com" }),
        };
        assert_eq!(
            serde_json::to_value(&overwrite).expect("serialize overwrite"),
            json!({ "type": "Overwrite", "collection": "pages", "object": { "url": "a.com" } })
        );

        let delete = ClientUpdate::Delete {
            collection: LocalCollection::PageListEntries,
            criteria: json!({ "listId": 1, "pageUrl": "a.com" }),
        };
        assert_eq!(
            serde_json::to_value(&delete).expect("serialize delete"),
            json!({
                "type": "Delete",
                "collection": "pageListEntries",
                "where": { "listId": 1, "pageUrl": "a.com" },
            })
        );
    }

    #[test]
    fn checkpoints_order_by_time_then_log_id() {
        let a = Checkpoint { time: 5, log_id: 9 };
        let b = Checkpoint { time: 6, log_id: 1 };
        let c = Checkpoint { time: 6, log_id: 2 };
        assert!(a < b);
        assert!(b < c);
    }
}
