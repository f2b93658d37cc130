//! Metadata-driven CRUD gateway over PostgreSQL.
//!
//! The gateway introspects table metadata at runtime through `meta.*` catalog
//! functions, caches it with a short TTL, and exposes dynamic REST endpoints
//! for single, bulk, and multi-step transactional operations. No table gets
//! hand-written code: identifiers are sanitized and allow-listed, values are
//! always bound parameters, and per-role connection pools let the database's
//! own grants decide who may touch what.

pub mod auth;
pub mod config;
pub mod crud;
pub mod error;
pub mod handlers;
pub mod ident;
pub mod meta;
pub mod pool;
pub mod records;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod value;
pub mod wizard;

pub use config::Settings;
pub use crud::{CrudEngine, SelectQuery};
pub use error::AppError;
pub use records::{DataOnly, KeyedData, KeysOnly, Records};
pub use state::AppState;
pub use value::{FieldMap, FieldValue};
pub use wizard::{WizardResult, WizardStep};
