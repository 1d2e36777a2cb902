//! User/album relation operations.
//!
//! Each [`RelationTag`] has its own table, so these queries are assembled from the tag's
//! fixed table name and use bound parameters for every caller-supplied value.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Text};

use crate::crypto::PasswordHasher;
use crate::db::repository::AlbumRow;
use crate::db::{CatalogStore, StoreError};
use crate::models::{Album, AlbumKey, RelationTag, UserId};

const ALBUM_COLUMNS: &str = "a.album_id AS album_id, a.name AS name, a.artist AS artist, \
                             a.uri AS uri, a.image_link AS image_link";

fn select_related(tag: RelationTag) -> String {
    format!(
        "SELECT {ALBUM_COLUMNS} FROM albums a \
         JOIN {table} r ON r.album_id = a.album_id \
         WHERE r.user_id = ?",
        table = tag.table_name()
    )
}

/// Albums reachable through any of the three relation tables.
///
/// Each relation is LEFT joined, so a match in a single table is enough; an INNER join
/// here would drop every user missing from even one relation.
fn select_interacted() -> String {
    let [liked, passed, recommended] = RelationTag::ALL.map(RelationTag::table_name);
    format!(
        "SELECT DISTINCT {ALBUM_COLUMNS} FROM albums a \
         LEFT JOIN {liked} l ON l.album_id = a.album_id \
         LEFT JOIN {passed} p ON p.album_id = a.album_id \
         LEFT JOIN {recommended} r ON r.album_id = a.album_id \
         WHERE l.user_id = ? OR p.user_id = ? OR r.user_id = ?"
    )
}

#[derive(QueryableByName)]
struct Exists {
    #[diesel(sql_type = Integer)]
    found: i32,
}

impl<H: PasswordHasher> CatalogStore<H> {
    /// Record a relation between a user and an album.
    ///
    /// Nothing is checked beforehand: an unknown user or album ID fails the foreign key,
    /// an unknown URI resolves to NULL and fails the NOT NULL constraint, and a pair that
    /// is already related under `tag` fails the primary key. All three surface as
    /// [`StoreError::ConstraintViolation`].
    pub fn add_relationship(
        &mut self,
        user_id: UserId,
        album: AlbumKey<'_>,
        tag: RelationTag,
    ) -> Result<(), StoreError> {
        let table = tag.table_name();

        match album {
            AlbumKey::Id(album_id) => {
                diesel::sql_query(format!(
                    "INSERT INTO {table} (user_id, album_id) VALUES (?, ?)"
                ))
                .bind::<Integer, _>(user_id)
                .bind::<Integer, _>(album_id)
                .execute(&mut self.conn)?;
            }
            AlbumKey::Uri(uri) => {
                diesel::sql_query(format!(
                    "INSERT INTO {table} (user_id, album_id) \
                     VALUES (?, (SELECT album_id FROM albums WHERE uri = ?))"
                ))
                .bind::<Integer, _>(user_id)
                .bind::<Text, _>(uri)
                .execute(&mut self.conn)?;
            }
        }

        tracing::debug!("User {} {} album {:?}", user_id, tag, album);
        Ok(())
    }

    /// All albums related to `user_id` under `tag`.
    ///
    /// No ordering is applied; callers get whatever order SQLite produces.
    pub fn list_relationships(
        &mut self,
        user_id: UserId,
        tag: RelationTag,
    ) -> Result<Vec<Album>, StoreError> {
        let rows = diesel::sql_query(select_related(tag))
            .bind::<Integer, _>(user_id)
            .load::<AlbumRow>(&mut self.conn)?;

        Ok(rows.into_iter().map(Album::from).collect())
    }

    /// One page of [`CatalogStore::list_relationships`].
    ///
    /// Pages are only stable while the relation is not being modified.
    pub fn list_relationships_page(
        &mut self,
        user_id: UserId,
        tag: RelationTag,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Album>, StoreError> {
        let rows = diesel::sql_query(format!("{} LIMIT ? OFFSET ?", select_related(tag)))
            .bind::<Integer, _>(user_id)
            .bind::<BigInt, _>(i64::from(limit))
            .bind::<BigInt, _>(i64::from(offset))
            .load::<AlbumRow>(&mut self.conn)?;

        Ok(rows.into_iter().map(Album::from).collect())
    }

    /// Whether `user_id` is related to the album with `album_uri` under `tag`.
    pub fn has_relationship(
        &mut self,
        user_id: UserId,
        album_uri: &str,
        tag: RelationTag,
    ) -> Result<bool, StoreError> {
        let exists = diesel::sql_query(format!(
            "SELECT EXISTS (SELECT 1 FROM {table} r JOIN albums a ON a.album_id = r.album_id \
             WHERE r.user_id = ? AND a.uri = ?) AS found",
            table = tag.table_name()
        ))
        .bind::<Integer, _>(user_id)
        .bind::<Text, _>(album_uri)
        .get_result::<Exists>(&mut self.conn)?;

        Ok(exists.found != 0)
    }

    /// Remove the relation between a user and the album with `album_uri`.
    ///
    /// Returns `true` only if exactly one row was deleted.
    pub fn remove_relationship(
        &mut self,
        user_id: UserId,
        album_uri: &str,
        tag: RelationTag,
    ) -> Result<bool, StoreError> {
        let deleted = diesel::sql_query(format!(
            "DELETE FROM {table} WHERE user_id = ? \
             AND album_id = (SELECT album_id FROM albums WHERE uri = ?)",
            table = tag.table_name()
        ))
        .bind::<Integer, _>(user_id)
        .bind::<Text, _>(album_uri)
        .execute(&mut self.conn)?;

        tracing::debug!(
            "Removed {} {} row(s) for user {} and {}",
            deleted,
            tag,
            user_id,
            album_uri
        );
        Ok(deleted == 1)
    }

    /// Every album the user has a relation with, under any tag, each listed once.
    pub fn get_all_interacted_albums(&mut self, user_id: UserId) -> Result<Vec<Album>, StoreError> {
        let rows = diesel::sql_query(select_interacted())
            .bind::<Integer, _>(user_id)
            .bind::<Integer, _>(user_id)
            .bind::<Integer, _>(user_id)
            .load::<AlbumRow>(&mut self.conn)?;

        Ok(rows.into_iter().map(Album::from).collect())
    }
}
