//! The catalog store: accounts and albums.
//!
//! Relationship operations live in `relationships.rs` as a second `impl` block on the
//! same type.
//!
//! Failure signalling differs per operation and is part of the contract:
//!
//! | Operation            | Failure is reported as                                   |
//! |----------------------|----------------------------------------------------------|
//! | `get_user_id`, `get_email`, `get_user`, `get_album` | `Err(StoreError::NotFound)` |
//! | `login`              | `Err(NotFound)` or `Err(InvalidCredentials)`             |
//! | `change_password`    | `Ok(false)` on a wrong old password or unexpected row count; store errors propagate |
//! | `change_email`       | `false`, including for store errors                      |
//! | `register`, `insert_album` | store errors propagate                             |

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::crypto::{Argon2Hasher, PasswordHasher};
use crate::db::schema::{albums, users};
use crate::db::{StoreConfig, StoreError};
use crate::models::{Album, NewAlbum, User, UserId};

/// Database row representation for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct UserRow {
    user_id: i32,
    username: String,
    email: String,
    created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.user_id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

/// Data for inserting a new user.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
struct NewUserRow<'a> {
    username: &'a str,
    password_hash: &'a str,
    email: &'a str,
}

/// Database row representation for albums.
///
/// Also loadable by name so the hand-written relation joins can reuse it.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = albums)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct AlbumRow {
    pub album_id: i32,
    pub name: String,
    pub artist: String,
    pub uri: String,
    pub image_link: String,
}

impl From<AlbumRow> for Album {
    fn from(row: AlbumRow) -> Self {
        Album {
            id: row.album_id,
            name: row.name,
            artist: row.artist,
            uri: row.uri,
            image_link: row.image_link,
        }
    }
}

/// Data for inserting a new album.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = albums)]
struct NewAlbumRow<'a> {
    name: &'a str,
    artist: &'a str,
    uri: &'a str,
    image_link: &'a str,
}

impl<'a> From<&'a NewAlbum> for NewAlbumRow<'a> {
    fn from(album: &'a NewAlbum) -> Self {
        Self {
            name: &album.name,
            artist: &album.artist,
            uri: &album.uri,
            image_link: &album.image_link,
        }
    }
}

#[derive(QueryableByName)]
struct LastInsertId {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    id: i32,
}

/// Accounts, albums and user/album relations over one owned SQLite connection.
///
/// The connection is opened in [`CatalogStore::open`] and closed exactly once, when the
/// store is dropped or passed to [`CatalogStore::close`]. Every operation takes
/// `&mut self`, so concurrent callers must serialize on one store or open their own.
pub struct CatalogStore<H = Argon2Hasher> {
    pub(crate) conn: SqliteConnection,
    hasher: H,
    target: String,
}

impl CatalogStore<Argon2Hasher> {
    /// Open a store on the configured target with the default Argon2 hasher.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_hasher(config, Argon2Hasher::new())
    }

    /// Open a store, run `f` against it, and close it whatever `f` returns.
    pub fn scoped<T, F>(config: &StoreConfig, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut CatalogStore) -> Result<T, StoreError>,
    {
        Self::scoped_with_hasher(config, Argon2Hasher::new(), f)
    }
}

impl<H: PasswordHasher> CatalogStore<H> {
    /// Open a store on the configured target using `hasher` for passwords.
    pub fn open_with_hasher(config: &StoreConfig, hasher: H) -> Result<Self, StoreError> {
        let conn = config.establish()?;
        tracing::info!("Opened catalog store at {}", config.database_url);

        Ok(Self {
            conn,
            hasher,
            target: config.database_url.clone(),
        })
    }

    /// [`CatalogStore::scoped`] with a caller-supplied password hasher.
    pub fn scoped_with_hasher<T, F>(
        config: &StoreConfig,
        hasher: H,
        f: F,
    ) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Self) -> Result<T, StoreError>,
    {
        let mut store = Self::open_with_hasher(config, hasher)?;
        let result = f(&mut store);
        store.close();
        result
    }

    /// Close the store, releasing its connection.
    pub fn close(self) {
        drop(self);
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Look up a user's ID by exact (case-sensitive) username.
    pub fn get_user_id(&mut self, username: &str) -> Result<UserId, StoreError> {
        users::table
            .filter(users::username.eq(username))
            .select(users::user_id)
            .first::<i32>(&mut self.conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("user_id for {}", username)))
    }

    /// Fetch a user by ID.
    pub fn get_user(&mut self, user_id: UserId) -> Result<User, StoreError> {
        users::table
            .filter(users::user_id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))
    }

    /// Register a new user and return the generated ID.
    ///
    /// Username collisions are not checked up front; they surface as
    /// [`StoreError::ConstraintViolation`].
    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserId, StoreError> {
        let password_hash = self.hasher.hash(password)?;

        diesel::insert_into(users::table)
            .values(&NewUserRow {
                username,
                password_hash: &password_hash,
                email,
            })
            .execute(&mut self.conn)?;

        let id = diesel::sql_query("SELECT last_insert_rowid() AS id")
            .get_result::<LastInsertId>(&mut self.conn)?
            .id;

        tracing::info!("Registered user '{}' (id: {})", username, id);
        Ok(id)
    }

    /// Check a username/password pair and return the user's ID.
    pub fn login(&mut self, username: &str, password: &str) -> Result<UserId, StoreError> {
        let (user_id, password_hash) = users::table
            .filter(users::username.eq(username))
            .select((users::user_id, users::password_hash))
            .first::<(i32, String)>(&mut self.conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("username {}", username)))?;

        if self.hasher.verify(&password_hash, password) {
            tracing::debug!("User '{}' logged in", username);
            Ok(user_id)
        } else {
            tracing::debug!("Rejected login for '{}'", username);
            Err(StoreError::InvalidCredentials(username.to_string()))
        }
    }

    /// Replace a user's password after checking the old one.
    ///
    /// Returns `Ok(false)` without writing when the old password does not match or the
    /// user does not exist, and `Ok(true)` only if exactly one row was updated.
    pub fn change_password(
        &mut self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool, StoreError> {
        let current = users::table
            .filter(users::user_id.eq(user_id))
            .select(users::password_hash)
            .first::<String>(&mut self.conn)
            .optional()?;

        let Some(current) = current else {
            tracing::debug!("Password change for unknown user {}", user_id);
            return Ok(false);
        };

        if !self.hasher.verify(&current, old_password) {
            tracing::debug!("Password change for user {} rejected", user_id);
            return Ok(false);
        }

        let new_hash = self.hasher.hash(new_password)?;
        let updated = diesel::update(users::table.filter(users::user_id.eq(user_id)))
            .set(users::password_hash.eq(&new_hash))
            .execute(&mut self.conn)?;

        Ok(updated == 1)
    }

    /// Set a user's email.
    ///
    /// Returns `true` only if exactly one row changed. Store failures are logged and
    /// reported as `false` rather than returned.
    pub fn change_email(&mut self, user_id: UserId, new_email: &str) -> bool {
        let result = diesel::update(users::table.filter(users::user_id.eq(user_id)))
            .set(users::email.eq(new_email))
            .execute(&mut self.conn);

        match result {
            Ok(updated) => updated == 1,
            Err(e) => {
                tracing::warn!("Failed to change email for user {}: {}", user_id, e);
                false
            }
        }
    }

    /// Get a user's email.
    pub fn get_email(&mut self, user_id: UserId) -> Result<String, StoreError> {
        users::table
            .filter(users::user_id.eq(user_id))
            .select(users::email)
            .first::<String>(&mut self.conn)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("email for user {}", user_id)))
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Insert an album. Duplicate URIs are not detected.
    pub fn insert_album(&mut self, album: &NewAlbum) -> Result<(), StoreError> {
        let row: NewAlbumRow = album.into();
        diesel::insert_into(albums::table)
            .values(&row)
            .execute(&mut self.conn)?;

        tracing::debug!("Inserted album '{}' ({})", album.name, album.uri);
        Ok(())
    }

    /// Get the first album with the given URI.
    pub fn get_album(&mut self, album_uri: &str) -> Result<Album, StoreError> {
        albums::table
            .filter(albums::uri.eq(album_uri))
            .select(AlbumRow::as_select())
            .first(&mut self.conn)
            .optional()?
            .map(Album::from)
            .ok_or_else(|| StoreError::NotFound(format!("album {}", album_uri)))
    }
}

impl<H> Drop for CatalogStore<H> {
    fn drop(&mut self) {
        tracing::info!("Closing catalog store at {}", self.target);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use argon2::Params;

    use super::*;
    use crate::crypto::PasswordError;

    /// In-memory store with a cheap hasher.
    pub(crate) fn test_store() -> CatalogStore {
        let hasher = Argon2Hasher::with_params(Params::new(8, 1, 1, None).unwrap());
        CatalogStore::open_with_hasher(&StoreConfig::new(":memory:"), hasher).unwrap()
    }

    #[test]
    fn test_register_then_login_returns_same_id() {
        let mut store = test_store();
        let alice = store.register("alice", "pw1", "a@x.com").unwrap();
        let bob = store.register("bob", "pw2", "b@x.com").unwrap();

        assert_eq!(alice, 1);
        assert_ne!(alice, bob);
        assert_eq!(store.login("alice", "pw1").unwrap(), alice);
        assert_eq!(store.login("bob", "pw2").unwrap(), bob);
    }

    #[test]
    fn test_password_is_not_stored_in_plaintext() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();

        let stored = users::table
            .filter(users::user_id.eq(id))
            .select(users::password_hash)
            .first::<String>(&mut store.conn)
            .unwrap();
        assert_ne!(stored, "pw1");
        assert!(stored.starts_with("$argon2id$"));
    }

    #[test]
    fn test_login_wrong_password() {
        let mut store = test_store();
        store.register("alice", "pw1", "a@x.com").unwrap();

        let result = store.login("alice", "nope");
        assert!(matches!(result, Err(StoreError::InvalidCredentials(_))));
    }

    #[test]
    fn test_login_unknown_user() {
        let mut store = test_store();
        let result = store.login("ghost", "pw");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_username_is_case_sensitive() {
        let mut store = test_store();
        store.register("alice", "pw1", "a@x.com").unwrap();

        assert!(matches!(store.get_user_id("Alice"), Err(StoreError::NotFound(_))));
        assert!(store.get_user_id("alice").is_ok());
    }

    #[test]
    fn test_duplicate_username_is_constraint_violation() {
        let mut store = test_store();
        store.register("alice", "pw1", "a@x.com").unwrap();

        let result = store.register("alice", "other", "other@x.com");
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[test]
    fn test_get_user_id() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();

        assert_eq!(store.get_user_id("alice").unwrap(), id);
        assert!(matches!(store.get_user_id("bob"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_get_user() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();

        let user = store.get_user(id).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
        assert!(matches!(store.get_user(id + 1), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_change_password_with_wrong_old_password() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();
        let before = users::table
            .select(users::password_hash)
            .first::<String>(&mut store.conn)
            .unwrap();

        assert!(!store.change_password(id, "wrong", "pw2").unwrap());

        let after = users::table
            .select(users::password_hash)
            .first::<String>(&mut store.conn)
            .unwrap();
        assert_eq!(before, after);
        assert_eq!(store.login("alice", "pw1").unwrap(), id);
    }

    #[test]
    fn test_change_password() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();

        assert!(store.change_password(id, "pw1", "pw2").unwrap());
        assert_eq!(store.login("alice", "pw2").unwrap(), id);
        assert!(matches!(
            store.login("alice", "pw1"),
            Err(StoreError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_change_password_unknown_user() {
        let mut store = test_store();
        assert!(!store.change_password(42, "pw1", "pw2").unwrap());
    }

    #[test]
    fn test_change_and_get_email() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();

        assert_eq!(store.get_email(id).unwrap(), "a@x.com");
        assert!(store.change_email(id, "alice@example.org"));
        assert_eq!(store.get_email(id).unwrap(), "alice@example.org");
    }

    #[test]
    fn test_change_email_unknown_user() {
        let mut store = test_store();
        assert!(!store.change_email(42, "ghost@x.com"));
        assert!(matches!(store.get_email(42), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_change_email_swallows_store_errors() {
        let mut store = test_store();
        let id = store.register("alice", "pw1", "a@x.com").unwrap();
        diesel::sql_query("DROP TABLE liked_albums")
            .execute(&mut store.conn)
            .unwrap();
        diesel::sql_query("DROP TABLE passed_albums")
            .execute(&mut store.conn)
            .unwrap();
        diesel::sql_query("DROP TABLE recommended_albums")
            .execute(&mut store.conn)
            .unwrap();
        diesel::sql_query("DROP TABLE users")
            .execute(&mut store.conn)
            .unwrap();

        assert!(!store.change_email(id, "new@x.com"));
    }

    #[test]
    fn test_album_round_trip() {
        let mut store = test_store();
        let album = NewAlbum::new("X", "Y", "u1", "img");
        store.insert_album(&album).unwrap();

        let fetched = store.get_album("u1").unwrap();
        assert_eq!(fetched.name, album.name);
        assert_eq!(fetched.artist, album.artist);
        assert_eq!(fetched.uri, album.uri);
        assert_eq!(fetched.image_link, album.image_link);
    }

    #[test]
    fn test_get_album_not_found() {
        let mut store = test_store();
        assert!(matches!(store.get_album("missing"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_duplicate_album_uri_is_accepted() {
        let mut store = test_store();
        store.insert_album(&NewAlbum::new("A", "Y", "dup", "img")).unwrap();
        store.insert_album(&NewAlbum::new("B", "Y", "dup", "img")).unwrap();

        let fetched = store.get_album("dup").unwrap();
        assert!(fetched.name == "A" || fetched.name == "B");
    }

    #[test]
    fn test_scoped_returns_closure_result() {
        let config = StoreConfig::new(":memory:");
        let found = CatalogStore::scoped(&config, |store| {
            store.insert_album(&NewAlbum::new("X", "Y", "u1", "img"))?;
            store.get_album("u1")
        })
        .unwrap();
        assert_eq!(found.uri, "u1");
    }

    /// Hasher whose `hash` always fails.
    struct BrokenHasher;

    impl PasswordHasher for BrokenHasher {
        fn hash(&self, _plaintext: &str) -> Result<String, PasswordError> {
            Err(PasswordError::HashError("out of memory".into()))
        }

        fn verify(&self, digest: &str, plaintext: &str) -> bool {
            digest == plaintext
        }
    }

    #[test]
    fn test_register_propagates_hash_failure() {
        let config = StoreConfig::new(":memory:");
        let mut store = CatalogStore::open_with_hasher(&config, BrokenHasher).unwrap();

        let result = store.register("alice", "pw1", "a@x.com");
        assert!(matches!(result, Err(StoreError::Password(PasswordError::HashError(_)))));
        assert!(matches!(store.get_user_id("alice"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_change_password_propagates_hash_failure() {
        let config = StoreConfig::new(":memory:");
        let mut store = CatalogStore::open_with_hasher(&config, BrokenHasher).unwrap();
        // BrokenHasher "verifies" by equality, so store the old password as-is
        diesel::insert_into(users::table)
            .values(&NewUserRow {
                username: "alice",
                password_hash: "pw1",
                email: "a@x.com",
            })
            .execute(&mut store.conn)
            .unwrap();
        let id = store.get_user_id("alice").unwrap();

        let result = store.change_password(id, "pw1", "pw2");
        assert!(matches!(result, Err(StoreError::Password(_))));
        assert_eq!(store.login("alice", "pw1").unwrap(), id);
    }

    #[test]
    fn test_scoped_with_custom_hasher() {
        let config = StoreConfig::new(":memory:");
        let hasher = Argon2Hasher::with_params(Params::new(8, 1, 1, None).unwrap());
        let id = CatalogStore::scoped_with_hasher(&config, hasher, |store| {
            let id = store.register("alice", "pw1", "a@x.com")?;
            assert_eq!(store.login("alice", "pw1")?, id);
            Ok(id)
        })
        .unwrap();
        assert_eq!(id, 1);

        let result = CatalogStore::scoped_with_hasher(&config, BrokenHasher, |store| {
            store.register("bob", "pw2", "b@x.com")
        });
        assert!(matches!(result, Err(StoreError::Password(_))));
    }

    #[test]
    fn test_scoped_propagates_errors() {
        let config = StoreConfig::new(":memory:");
        let result = CatalogStore::scoped(&config, |store| store.get_album("missing"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_closed_file_store_can_be_reopened() {
        let path = std::env::temp_dir().join(format!("apollo-close-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let config = StoreConfig::new(path.to_string_lossy());

        let mut store = CatalogStore::open(&config).unwrap();
        store.insert_album(&NewAlbum::new("X", "Y", "u1", "img")).unwrap();
        store.close();

        let mut reopened = CatalogStore::open(&config).unwrap();
        assert_eq!(reopened.get_album("u1").unwrap().name, "X");
        reopened.close();

        std::fs::remove_file(&path).unwrap();
    }
}
