//! Role-keyed connection pools. Each database role gets its own pool so the
//! database's own grants do the authorization; pools are created lazily on
//! first use and live for the process.

use crate::config::Settings;
use crate::error::AppError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct PoolRegistry {
    settings: Arc<Settings>,
    pools: RwLock<HashMap<String, PgPool>>,
}

impl PoolRegistry {
    pub fn new(settings: Arc<Settings>) -> Self {
        PoolRegistry {
            settings,
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Pool for an already-initialized role. Roles only enter the registry
    /// through login or guest access, so a miss here means the token outlived
    /// its pool (process restart) and the caller must log in again.
    pub async fn get(&self, role: &str) -> Result<PgPool, AppError> {
        self.pools
            .read()
            .await
            .get(role)
            .cloned()
            .ok_or_else(|| AppError::Auth(format!("no active pool for role {}", role)))
    }

    /// Create the role's pool if absent. The public role uses configured
    /// credentials; any other role must bring its own from login.
    pub async fn get_or_create(
        &self,
        role: &str,
        credentials: Option<(&str, &str)>,
    ) -> Result<PgPool, AppError> {
        if role.is_empty() {
            return Err(AppError::Auth("role is required".to_string()));
        }
        if let Some(pool) = self.pools.read().await.get(role) {
            return Ok(pool.clone());
        }
        let mut pools = self.pools.write().await;
        // double check: another request may have won the race
        if let Some(pool) = pools.get(role) {
            return Ok(pool.clone());
        }
        let (uname, pword) = match credentials {
            Some((u, p)) => (u.to_string(), p.to_string()),
            None if role == self.settings.public_role => (
                self.settings.public_role.clone(),
                self.settings.public_password.clone(),
            ),
            None => {
                return Err(AppError::Auth(format!(
                    "credentials required to open a pool for role {}",
                    role
                )))
            }
        };
        let pool = PgPoolOptions::new()
            .min_connections(self.settings.pool_min_size)
            .max_connections(self.settings.pool_max_size)
            .acquire_timeout(self.settings.acquire_timeout)
            .connect(&self.settings.dsn(&uname, &pword))
            .await
            .map_err(|e| {
                tracing::error!(role, error = %e, "pool creation failed");
                AppError::Auth("authentication failed".to_string())
            })?;
        tracing::info!(role, "created connection pool");
        pools.insert(role.to_string(), pool.clone());
        Ok(pool)
    }

    pub async fn close(&self, role: &str) {
        if let Some(pool) = self.pools.write().await.remove(role) {
            pool.close().await;
            tracing::info!(role, "closed connection pool");
        }
    }

    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (role, pool) in pools.drain() {
            pool.close().await;
            tracing::info!(role = %role, "closed connection pool");
        }
    }
}
