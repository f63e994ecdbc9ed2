#![forbid(unsafe_code)]

//! Device-side (denormalized) collection shapes.
//!
//! These are the records a device stores and the shapes the downloader rebuilds. Field
//! names are camelCase on the wire because devices persist them verbatim.

use crate::model::PrivacyLevel;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocalCollection {
    Pages,
    Visits,
    Annotations,
    Tags,
    CustomLists,
    PageListEntries,
}

impl LocalCollection {
    pub const ALL: [LocalCollection; 6] = [
        LocalCollection::Pages,
        LocalCollection::Visits,
        LocalCollection::Annotations,
        LocalCollection::Tags,
        LocalCollection::CustomLists,
        LocalCollection::PageListEntries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LocalCollection::Pages => "pages",
            LocalCollection::Visits => "visits",
            LocalCollection::Annotations => "annotations",
            LocalCollection::Tags => "tags",
            LocalCollection::CustomLists => "customLists",
            LocalCollection::PageListEntries => "pageListEntries",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == value)
    }

    /// Fields that identify a row of this collection on every device.
    pub fn identity_fields(self) -> &'static [&'static str] {
        match self {
            LocalCollection::Pages => &["url"],
            LocalCollection::Visits => &["url", "time"],
            LocalCollection::Annotations => &["url"],
            LocalCollection::Tags => &["url", "name"],
            LocalCollection::CustomLists => &["id"],
            LocalCollection::PageListEntries => &["listId", "pageUrl"],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Normalized url; the page's identity on every device.
    pub url: String,
    pub full_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRecord {
    pub url: String,
    pub time: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_perc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_max_perc: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    /// `pageUrl` followed by a device-generated suffix, e.g. `example.com/a/#1614...`.
    pub url: String,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Value>,
    pub created_when: i64,
    pub last_edited: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_level: Option<PrivacyLevel>,
}

impl AnnotationRecord {
    pub fn local_id(&self) -> Option<&str> {
        annotation_local_id(&self.url, &self.page_url)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    /// Url of either a page or an annotation.
    pub url: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomListRecord {
    /// Generated once by the creating device and kept by every other device.
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListEntryRecord {
    pub list_id: i64,
    pub page_url: String,
    pub full_url: String,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LocalChange {
    Create { object: Value },
    Update { before: Value, after: Value },
    Delete { object: Value },
}

/// One committed write against a device collection, with every field before and after.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalMutation {
    pub collection: String,
    #[serde(flatten)]
    pub change: LocalChange,
}

impl LocalMutation {
    pub fn create(collection: impl Into<String>, object: Value) -> Self {
        Self {
            collection: collection.into(),
            change: LocalChange::Create { object },
        }
    }

    pub fn update(collection: impl Into<String>, before: Value, after: Value) -> Self {
        Self {
            collection: collection.into(),
            change: LocalChange::Update { before, after },
        }
    }

    pub fn delete(collection: impl Into<String>, object: Value) -> Self {
        Self {
            collection: collection.into(),
            change: LocalChange::Delete { object },
        }
    }
}

pub fn annotation_url(page_url: &str, local_id: &str) -> String {
    format!("{page_url}{local_id}")
}

/// The suffix that distinguishes an annotation from its page, if `url` extends `page_url`.
pub fn annotation_local_id<'a>(url: &'a str, page_url: &str) -> Option<&'a str> {
    url.strip_prefix(page_url).filter(|suffix| !suffix.is_empty())
}
