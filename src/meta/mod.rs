//! Runtime table metadata: catalog introspection, grouping into typed
//! descriptors, and TTL caching.

pub mod cache;
pub mod catalog;
pub mod descriptor;
pub mod ttl;

pub use cache::SchemaCache;
pub use catalog::{QueryKind, RawColumnRow};
pub use descriptor::{ColumnDescriptor, ForeignKeyRef};
pub use ttl::TtlCache;
