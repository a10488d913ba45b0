use crate::config::AppConfig;
use anyhow::Context;
use graphpath_core::Catalog;
use graphpath_policy::MiddlewareRegistry;
use graphpath_runtime::{GraphEngine, MemoryStore, registry_from_catalog};

/// Shared application state.
pub struct AppState {
    pub cfg: AppConfig,
    pub engine: GraphEngine,
}

impl AppState {
    /// Load the catalog named by the config and build the engine over it.
    pub fn init(cfg: &AppConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::from_file(&cfg.server.catalog_path)
            .with_context(|| format!("failed to load catalog {}", cfg.server.catalog_path))?;
        Self::from_catalog(cfg, &catalog)
    }

    pub fn from_catalog(cfg: &AppConfig, catalog: &Catalog) -> anyhow::Result<Self> {
        let store = MemoryStore::from_catalog(catalog);
        let services = registry_from_catalog(catalog, &store)?;
        let middleware = MiddlewareRegistry::with_builtins();

        tracing::info!(
            services = ?services.names(),
            middleware = ?middleware.names(),
            "graph engine ready"
        );

        Ok(Self {
            cfg: cfg.clone(),
            engine: GraphEngine::new(services, middleware, cfg.graph.clone()),
        })
    }
}
