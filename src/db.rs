use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use crate::error::AppResult;

pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let db = Database::connect(database_url).await?;
    apply_pragmas(&db).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

async fn apply_pragmas(db: &DatabaseConnection) -> AppResult<()> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA journal_mode=WAL".to_string(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA synchronous=NORMAL".to_string(),
    ))
    .await?;

    // Association rows cascade on movie deletion; SQLite needs this on.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys=ON".to_string(),
    ))
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn connect_in_memory() -> DatabaseConnection {
    let mut opts = sea_orm::ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);
    let db = Database::connect(opts).await.expect("in-memory sqlite");
    apply_pragmas(&db).await.expect("pragmas");
    Migrator::up(&db, None).await.expect("migrations");
    db
}
