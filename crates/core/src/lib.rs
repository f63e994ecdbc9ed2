#![forbid(unsafe_code)]

pub mod ids;
pub mod local;
pub mod model;
pub mod replica;
pub mod updates;

pub use ids::{DeviceId, EntityId, IdError, UserId};
pub use local::{
    AnnotationRecord, CustomListRecord, LocalChange, LocalCollection, LocalMutation,
    PageListEntryRecord, PageRecord, TagRecord, VisitRecord,
};
pub use model::{Collection, DataChange, DataChangeType, NaturalKey, PrivacyLevel, TagTarget};
pub use replica::{LocalReplica, ReplicaError};
pub use updates::{Checkpoint, ClientUpdate, UpdateBatch};
