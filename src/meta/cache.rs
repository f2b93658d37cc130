//! Schema cache: TTL-bounded memoization of visible tables (per role) and
//! grouped column descriptors (per role and table).

use crate::error::AppError;
use crate::ident::sanitize;
use crate::meta::catalog::{self, QueryKind};
use crate::meta::descriptor::{group_columns, ColumnDescriptor};
use crate::meta::ttl::TtlCache;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub struct SchemaCache {
    tables: TtlCache<String, Arc<Vec<String>>>,
    columns: TtlCache<(String, String), Arc<Vec<ColumnDescriptor>>>,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        SchemaCache {
            tables: TtlCache::new(ttl),
            columns: TtlCache::new(ttl),
        }
    }

    /// Tables visible to the role, cached per role. A fetch failure
    /// propagates to every caller racing on the slot; nothing is cached.
    pub async fn visible_tables(
        &self,
        pool: &PgPool,
        role: &str,
    ) -> Result<Arc<Vec<String>>, AppError> {
        if let Some(hit) = self.tables.get(role).await {
            return Ok(hit);
        }
        let fetched = Arc::new(catalog::fetch_visible_tables(pool, role, QueryKind::Select).await?);
        self.tables.insert(role.to_string(), fetched.clone()).await;
        Ok(fetched)
    }

    /// Sanitize an externally supplied table name, then require it to be in
    /// the role's visible set.
    pub async fn validate_table(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
    ) -> Result<String, AppError> {
        let name = sanitize(table);
        let visible = self.visible_tables(pool, role).await?;
        if name.is_empty() || !visible.iter().any(|t| *t == name) {
            return Err(AppError::InvalidTable(name));
        }
        Ok(name)
    }

    /// Grouped column descriptors for a validated table, cached per
    /// (role, table). Empty metadata is a configuration fault.
    pub async fn table_columns(
        &self,
        pool: &PgPool,
        role: &str,
        table: &str,
    ) -> Result<Arc<Vec<ColumnDescriptor>>, AppError> {
        let key = (role.to_string(), table.to_string());
        if let Some(hit) = self.columns.get(&key).await {
            return Ok(hit);
        }
        let raw = catalog::fetch_relation_metadata(pool, table)
            .await
            .map_err(|e| {
                tracing::error!(table, error = %e, "metadata fetch failed");
                AppError::NoSchema(table.to_string())
            })?;
        if raw.is_empty() {
            return Err(AppError::NoSchema(table.to_string()));
        }
        let grouped = Arc::new(group_columns(&raw));
        self.columns.insert(key, grouped.clone()).await;
        Ok(grouped)
    }

    /// Drop every cached entry. Only used by tests and administrative
    /// endpoints; normal coherency relies on TTL expiry.
    pub async fn clear(&self) {
        self.tables.clear().await;
        self.columns.clear().await;
    }
}
