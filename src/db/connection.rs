//! Database connection setup and schema bootstrap.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::StoreError;
use crate::models::RelationTag;

/// Store configuration.
///
/// Built once by the caller and handed to [`CatalogStore::open`]; the library never reads
/// process-wide settings on its own.
///
/// [`CatalogStore::open`]: crate::db::CatalogStore::open
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file (or `:memory:`).
    pub database_url: String,
    /// How long SQLite waits on a locked database before failing, in milliseconds.
    pub busy_timeout_ms: u32,
    /// Create any missing tables when the store is opened.
    pub bootstrap_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "apollo.db".to_string(),
            busy_timeout_ms: 5_000,
            bootstrap_schema: true,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Open a connection to the configured target.
    ///
    /// Foreign keys are switched on for the connection so that relation rows can only
    /// reference existing users and albums.
    pub fn establish(&self) -> Result<SqliteConnection, StoreError> {
        let mut conn = SqliteConnection::establish(&self.database_url)?;

        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))?;

        if self.bootstrap_schema {
            create_schema(&mut conn)?;
        }

        Ok(conn)
    }
}

/// Create the catalog tables if they do not exist yet.
pub fn create_schema(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            album_id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            name TEXT NOT NULL,
            artist TEXT NOT NULL,
            uri TEXT NOT NULL,
            image_link TEXT NOT NULL
        )
        "#,
    )
    .execute(conn)?;

    // Not UNIQUE: duplicate URIs are accepted and lookups see the first match
    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_albums_uri ON albums(uri)")
        .execute(conn)?;

    for tag in RelationTag::ALL {
        let table = tag.table_name();

        diesel::sql_query(format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                user_id INTEGER NOT NULL REFERENCES users(user_id),
                album_id INTEGER NOT NULL REFERENCES albums(album_id),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, album_id)
            )
            "#
        ))
        .execute(conn)?;

        diesel::sql_query(format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_album_id ON {table}(album_id)"
        ))
        .execute(conn)?;
    }

    Ok(())
}
