//! Forward-only migrations contributed by modules.
//!
//! Each `(module, id)` pair is applied at most once, inside its own
//! transaction, and recorded in `_bookshelf_migrations`.

use std::collections::HashSet;

use anyhow::Context;

use bookshelf_kernel::Migration;

use crate::DbPool;

const LEDGER_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS _bookshelf_migrations (
        module text NOT NULL,
        id text NOT NULL,
        applied_at timestamptz NOT NULL DEFAULT now(),
        PRIMARY KEY (module, id)
    )
"#;

/// Migrations from `all` not present in `applied`, preserving order.
pub fn pending<'a>(
    all: &'a [(String, Migration)],
    applied: &HashSet<(String, String)>,
) -> Vec<&'a (String, Migration)> {
    all.iter()
        .filter(|(module, migration)| {
            !applied.contains(&(module.clone(), migration.id.to_string()))
        })
        .collect()
}

/// `(module, id)` pairs already recorded in the ledger.
pub async fn applied(pool: &DbPool) -> anyhow::Result<HashSet<(String, String)>> {
    sqlx::query(LEDGER_DDL)
        .execute(pool)
        .await
        .with_context(|| "failed to create migration ledger")?;

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT module, id FROM _bookshelf_migrations")
            .fetch_all(pool)
            .await
            .with_context(|| "failed to read migration ledger")?;

    Ok(rows.into_iter().collect())
}

/// Apply every pending migration and return how many ran.
pub async fn run(pool: &DbPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    let applied = applied(pool).await?;
    let pending = pending(migrations, &applied);

    for (module, migration) in &pending {
        let mut tx = pool
            .begin()
            .await
            .with_context(|| "failed to open migration transaction")?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;

        sqlx::query("INSERT INTO _bookshelf_migrations (module, id) VALUES ($1, $2)")
            .bind(module.as_str())
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to record migration {}/{}", module, migration.id))?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {}/{}", module, migration.id))?;

        tracing::info!(
            target: "bookshelf-db",
            module = %module,
            migration = migration.id,
            "migration applied"
        );
    }

    Ok(pending.len())
}
