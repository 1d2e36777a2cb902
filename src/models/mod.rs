//! Domain models for the catalog.

pub mod music;
pub mod user;

pub use music::{Album, AlbumId, AlbumKey, NewAlbum, ParseTagError, RelationTag};
pub use user::{User, UserId};
