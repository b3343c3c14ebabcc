use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Applied versus embedded migration counts for one database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: i64,
    pub expected: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        usize::try_from(self.applied).is_ok_and(|applied| applied >= self.expected)
    }
}

pub fn expected_migrations() -> usize {
    MIGRATOR.iter().filter(|migration| migration.migration_type.is_up_migration()).count()
}

/// Reads the migration ledger; a database that was never migrated reports zero.
pub async fn status(pool: &DbPool) -> Result<MigrationStatus, sqlx::Error> {
    let ledger: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied = if ledger == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(1) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok(MigrationStatus { applied, expected: expected_migrations() })
}
