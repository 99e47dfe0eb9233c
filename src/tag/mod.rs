//! Path-addressed tag documents
//!
//! A tag document is a tree of named, typed fields. Fields are addressed
//! with path expressions such as
//! `Block:scenery[0]/Struct:object data/RealPoint3d:position`.

pub mod document;
pub mod path;
pub mod store;
pub mod types;

pub use document::{FieldValue, TagBlock, TagDocument, TagField, TagFunction, TagReference, TagStruct};
pub use path::{FieldPath, PathSegment};
pub use store::{FileTagStore, MemoryTagStore, OpenTag, OpenTags, TagStore};
pub use types::{FieldClass, FieldKind, SchemaGeneration};
