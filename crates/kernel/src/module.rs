use async_trait::async_trait;
use axum::Router;

/// Context handed to modules during `init` and `start`.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Forward-only schema change contributed by a module.
///
/// `id` must sort in application order within its module, e.g. `001_create_books`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// A self-contained feature slice: routes, API docs, schema and lifecycle hooks.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module, also used as its URL segment
    fn name(&self) -> &'static str;

    /// Path the module's router is nested under
    fn mount_path(&self) -> String {
        format!("/api/{}", self.name())
    }

    /// Called once at startup, after migrations have been applied
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Router for this module, relative to [`Module::mount_path`]
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) merged into the server document
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Schema migrations, applied in the order returned
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Called after every module has been initialised, before serving
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, in reverse registration order
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
