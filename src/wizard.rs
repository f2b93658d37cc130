//! Multi-step transactional orchestration. A wizard runs an ordered list of
//! insert-or-select steps on one transaction, collecting each step's resolved
//! primary key so later steps (and the caller) can reference earlier rows.
//!
//! Steps run strictly in caller-supplied order. A step referencing another
//! step's generated key must come after it; the orchestrator does not reorder
//! or detect missing dependencies, and an ordering mistake surfaces as the
//! database's own foreign-key failure.

use crate::crud::exec::StatementRunner;
use crate::crud::{plan, CrudEngine};
use crate::error::AppError;
use crate::records::{keyed_from_row, DataOnly, Records};
use crate::sql::TableQueries;
use crate::value::FieldMap;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    Insert,
    Select,
}

/// One wizard step. `insert` writes `data` as a new row; `select` asserts an
/// existing row and contributes `record_id` as its resolved key verbatim.
#[derive(Clone, Debug, Deserialize)]
pub struct WizardStep {
    pub entity: String,
    pub mode: StepMode,
    #[serde(default)]
    pub data: FieldMap,
    #[serde(default, rename = "recordId")]
    pub record_id: FieldMap,
}

#[derive(Clone, Debug, Serialize)]
pub struct WizardResult {
    pub entity: String,
    pub keys: FieldMap,
    #[serde(rename = "allKeys")]
    pub all_keys: IndexMap<String, FieldMap>,
}

/// Table-name to statement-snapshot resolution, separated from the run loop
/// so the loop is testable without a database.
#[async_trait]
pub trait TableResolver: Send + Sync {
    async fn queries(&self, table: &str) -> Result<Arc<TableQueries>, AppError>;
}

/// Execute the steps in order against one runner, threading resolved keys.
pub async fn run_steps<R>(
    resolver: &dyn TableResolver,
    runner: &mut R,
    main_entity: &str,
    steps: Vec<WizardStep>,
) -> Result<WizardResult, AppError>
where
    R: StatementRunner,
{
    let mut resolved: IndexMap<String, FieldMap> = IndexMap::new();
    for step in steps {
        tracing::debug!(entity = %step.entity, mode = ?step.mode, "wizard step");
        match step.mode {
            StepMode::Select => {
                if step.record_id.is_empty() {
                    return Err(AppError::BadRequest(format!(
                        "select step for \"{}\" requires recordId",
                        step.entity
                    )));
                }
                resolved.insert(step.entity, step.record_id);
            }
            StepMode::Insert => {
                let queries = resolver.queries(&step.entity).await?;
                let stmt = plan::plan_insert(&queries, Records::one(DataOnly { data: step.data }))?;
                let mut rows = runner.run(&stmt).await?;
                if rows.is_empty() {
                    return Err(AppError::InsertFailed(step.entity));
                }
                let record = keyed_from_row(rows.remove(0), &queries.pk_columns);
                resolved.insert(step.entity, record.keys);
            }
        }
    }
    let keys = resolved
        .get(main_entity)
        .cloned()
        .ok_or_else(|| AppError::MissingMainEntity(main_entity.to_string()))?;
    Ok(WizardResult {
        entity: main_entity.to_string(),
        keys,
        all_keys: resolved,
    })
}

struct LiveResolver<'a> {
    engine: &'a CrudEngine,
    pool: &'a PgPool,
    role: &'a str,
}

#[async_trait]
impl TableResolver for LiveResolver<'_> {
    async fn queries(&self, table: &str) -> Result<Arc<TableQueries>, AppError> {
        self.engine.table_queries(self.pool, self.role, table).await
    }
}

/// Run a wizard on one transaction: all steps commit together or none do.
pub async fn run_wizard(
    engine: &CrudEngine,
    pool: &PgPool,
    role: &str,
    main_entity: &str,
    steps: Vec<WizardStep>,
) -> Result<WizardResult, AppError> {
    let resolver = LiveResolver { engine, pool, role };
    let mut tx = pool.begin().await.map_err(AppError::from_db)?;
    match run_steps(&resolver, &mut *tx, main_entity, steps).await {
        Ok(result) => {
            tx.commit().await.map_err(AppError::from_db)?;
            Ok(result)
        }
        Err(e) => {
            // explicit for the log; drop would roll back anyway
            if let Err(rb) = tx.rollback().await {
                tracing::error!(error = %rb, "wizard rollback failed");
            }
            Err(e)
        }
    }
}
