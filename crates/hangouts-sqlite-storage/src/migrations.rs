use rusqlite::Connection;

use crate::error::Error;

// Embed the SQL migrations
refinery::embed_migrations!("migrations");

/// Run database migrations to set up or upgrade the database schema.
///
/// The history table gets its own name so the cache can share a database
/// file with other refinery users.
pub fn run_migrations(conn: &mut Connection) -> Result<(), Error> {
    let migration_table_name = "_refinery_schema_history_hangouts";
    let report = migrations::runner()
        .set_migration_table_name(migration_table_name)
        .run(conn)?;

    for migration in report.applied_migrations() {
        tracing::info!(
            "Applied migration: {} (version: {})",
            migration.name(),
            migration.version()
        );
    }

    Ok(())
}
