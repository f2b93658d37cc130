//! Dynamic CRUD: planning, execution, and orchestration over validated
//! table metadata.

pub mod engine;
pub mod exec;
pub mod plan;

pub use engine::CrudEngine;
pub use exec::{Statement, StatementRunner};
pub use plan::SelectQuery;
