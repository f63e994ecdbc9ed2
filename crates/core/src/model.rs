#![forbid(unsafe_code)]

use crate::ids::{DeviceId, EntityId, UserId};
use crate::updates::Checkpoint;
use serde::{Deserialize, Serialize};

/// Normalized cloud entity kinds. The string form is what the change log stores in `collection`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "personalContentMetadata")]
    ContentMetadata,
    #[serde(rename = "personalContentLocator")]
    ContentLocator,
    #[serde(rename = "personalContentRead")]
    ContentRead,
    #[serde(rename = "personalAnnotation")]
    Annotation,
    #[serde(rename = "personalAnnotationSelector")]
    AnnotationSelector,
    #[serde(rename = "personalTag")]
    Tag,
    #[serde(rename = "personalTagConnection")]
    TagConnection,
    #[serde(rename = "personalList")]
    List,
    #[serde(rename = "personalListEntry")]
    ListEntry,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::ContentMetadata,
        Collection::ContentLocator,
        Collection::ContentRead,
        Collection::Annotation,
        Collection::AnnotationSelector,
        Collection::Tag,
        Collection::TagConnection,
        Collection::List,
        Collection::ListEntry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::ContentMetadata => "personalContentMetadata",
            Collection::ContentLocator => "personalContentLocator",
            Collection::ContentRead => "personalContentRead",
            Collection::Annotation => "personalAnnotation",
            Collection::AnnotationSelector => "personalAnnotationSelector",
            Collection::Tag => "personalTag",
            Collection::TagConnection => "personalTagConnection",
            Collection::List => "personalList",
            Collection::ListEntry => "personalListEntry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|collection| collection.as_str() == value)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataChangeType {
    Create,
    Modify,
    Delete,
}

impl DataChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataChangeType::Create => "create",
            DataChangeType::Modify => "modify",
            DataChangeType::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(DataChangeType::Create),
            "modify" => Some(DataChangeType::Modify),
            "delete" => Some(DataChangeType::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivacyLevel {
    #[default]
    Private,
    Protected,
    Shared,
}

impl PrivacyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivacyLevel::Private => "private",
            PrivacyLevel::Protected => "protected",
            PrivacyLevel::Shared => "shared",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(PrivacyLevel::Private),
            "protected" => Some(PrivacyLevel::Protected),
            "shared" => Some(PrivacyLevel::Shared),
            _ => None,
        }
    }
}

/// What a tag connection points at. One join table serves both target kinds, so the
/// target is stored as `(collection, objectId)` but handled as a closed set here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagTarget {
    ContentMetadata(EntityId),
    Annotation(EntityId),
}

impl TagTarget {
    pub fn collection(self) -> Collection {
        match self {
            TagTarget::ContentMetadata(_) => Collection::ContentMetadata,
            TagTarget::Annotation(_) => Collection::Annotation,
        }
    }

    pub fn id(self) -> EntityId {
        match self {
            TagTarget::ContentMetadata(id) | TagTarget::Annotation(id) => id,
        }
    }

    pub fn from_parts(collection: Collection, id: EntityId) -> Option<Self> {
        match collection {
            Collection::ContentMetadata => Some(TagTarget::ContentMetadata(id)),
            Collection::Annotation => Some(TagTarget::Annotation(id)),
            _ => None,
        }
    }
}

/// Device-independent identity of an entity.
///
/// Delete entries carry one of these as `info`, captured before the row goes away, so a
/// device can match its local row without knowing any server id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum NaturalKey {
    Content { normalized_url: String },
    Locator { location: String },
    Visit { url: String, time: i64 },
    Annotation { url: String },
    Selector { annotation_url: String },
    Tag { name: String },
    TagConnection { url: String, name: String },
    List { id: i64 },
    ListEntry { list_id: i64, page_url: String },
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NaturalKey::Content { normalized_url } => write!(f, "content:{normalized_url}"),
            NaturalKey::Locator { location } => write!(f, "locator:{location}"),
            NaturalKey::Visit { url, time } => write!(f, "visit:{url}@{time}"),
            NaturalKey::Annotation { url } => write!(f, "annotation:{url}"),
            NaturalKey::Selector { annotation_url } => write!(f, "selector:{annotation_url}"),
            NaturalKey::Tag { name } => write!(f, "tag:{name}"),
            NaturalKey::TagConnection { url, name } => write!(f, "tag:{name}->{url}"),
            NaturalKey::List { id } => write!(f, "list:{id}"),
            NaturalKey::ListEntry { list_id, page_url } => {
                write!(f, "list:{list_id}->{page_url}")
            }
        }
    }
}

/// One change-log entry. Appended once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChange {
    pub log_id: i64,
    pub user_id: UserId,
    pub created_when: i64,
    pub created_by_device: DeviceId,
    #[serde(rename = "type")]
    pub change_type: DataChangeType,
    pub collection: Collection,
    pub object_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<NaturalKey>,
}

impl DataChange {
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            time: self.created_when,
            log_id: self.log_id,
        }
    }
}
