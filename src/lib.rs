//! Bookshelf application library
//!
//! Wires project modules into the kernel registry and drives the process
//! lifecycle: connect, migrate, init, start, serve, stop.

pub mod modules;

use anyhow::Context;

use bookshelf_db::DbPool;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every project module.
pub fn registry(pool: &DbPool) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool)?;
    Ok(registry)
}

/// Apply pending schema migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let applied = apply_migrations(&registry(&pool)?, &pool).await;
    pool.close().await;
    applied
}

/// Report `(module, id, applied)` for every known migration.
pub async fn migration_status(settings: &Settings) -> anyhow::Result<Vec<(String, String, bool)>> {
    let pool = bookshelf_db::connect(&settings.database).await?;
    let all = registry(&pool)?.collect_migrations();
    let applied = bookshelf_db::migrate::applied(&pool).await;
    pool.close().await;
    let applied = applied?;

    Ok(all
        .into_iter()
        .map(|(module, migration)| {
            let done = applied.contains(&(module.clone(), migration.id.to_string()));
            (module, migration.id.to_string(), done)
        })
        .collect())
}

async fn apply_migrations(registry: &ModuleRegistry, pool: &DbPool) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let count = bookshelf_db::migrate::run(pool, &migrations)
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied = count, known = migrations.len(), "migrations up to date");
    Ok(count)
}

/// Run the HTTP service until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = settings.environment.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "bookshelf starting"
    );

    let pool = bookshelf_db::connect(&settings.database).await?;
    let registry = registry(&pool)?;

    if settings.database.run_migrations {
        apply_migrations(&registry, &pool).await?;
    }

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    let stopped = registry.stop_all().await;
    pool.close().await;
    tracing::info!("bookshelf stopped");

    served?;
    stopped
}
