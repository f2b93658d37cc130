//! Shared application state handed to every handler.

use crate::config::Settings;
use crate::crud::CrudEngine;
use crate::meta::SchemaCache;
use crate::pool::PoolRegistry;
use crate::sql::TemplateCache;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pools: Arc<PoolRegistry>,
    pub engine: Arc<CrudEngine>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let schema = Arc::new(SchemaCache::new(settings.cache_ttl));
        let templates = Arc::new(TemplateCache::new(
            settings.cache_ttl,
            settings.data_schema.clone(),
        ));
        AppState {
            pools: Arc::new(PoolRegistry::new(settings.clone())),
            engine: Arc::new(CrudEngine::new(schema, templates)),
            settings,
        }
    }
}
