#![forbid(unsafe_code)]

//! Row-level access to the normalized tables. Lookups by natural key only see live rows;
//! lookups by id also return tombstones so deleted state stays readable.

pub(crate) mod annotations;
pub(crate) mod content;
pub(crate) mod lists;
pub(crate) mod tags;
