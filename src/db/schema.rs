//! Database schema definitions for Diesel.
//!
//! The three relation tables are addressed through [`RelationTag::table_name`] and raw
//! SQL, so only the entity tables are declared here.
//!
//! [`RelationTag::table_name`]: crate::models::RelationTag::table_name

diesel::table! {
    users (user_id) {
        user_id -> Integer,
        username -> Text,
        password_hash -> Text,
        email -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    albums (album_id) {
        album_id -> Integer,
        name -> Text,
        artist -> Text,
        uri -> Text,
        image_link -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, albums);
