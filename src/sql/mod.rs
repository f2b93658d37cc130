//! SQL synthesis: identifier-safe fragment builders and cached per-table
//! statement templates.

pub mod builder;
pub mod templates;

pub use templates::{CrudTemplates, TableQueries, TemplateCache};
