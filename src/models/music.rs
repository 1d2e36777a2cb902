//! Album catalog models and user/album relation tags.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Server-generated album identifier.
pub type AlbumId = i32;

/// An album in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub artist: String,
    /// Natural key used for external lookups.
    pub uri: String,
    pub image_link: String,
}

/// Data for inserting a new album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlbum {
    pub name: String,
    pub artist: String,
    pub uri: String,
    pub image_link: String,
}

impl NewAlbum {
    /// Create a new album description.
    pub fn new(
        name: impl Into<String>,
        artist: impl Into<String>,
        uri: impl Into<String>,
        image_link: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            uri: uri.into(),
            image_link: image_link.into(),
        }
    }
}

/// How a relation insert refers to its album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumKey<'a> {
    /// The album's row identifier.
    Id(AlbumId),
    /// The album's URI, translated to an identifier inside the insert.
    Uri(&'a str),
}

impl From<AlbumId> for AlbumKey<'_> {
    fn from(id: AlbumId) -> Self {
        AlbumKey::Id(id)
    }
}

impl<'a> From<&'a str> for AlbumKey<'a> {
    fn from(uri: &'a str) -> Self {
        AlbumKey::Uri(uri)
    }
}

/// Classification of a user/album relationship.
///
/// Each tag is backed by its own relation table; a user/album pair may appear under
/// several tags at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationTag {
    Liked,
    Passed,
    Recommended,
}

impl RelationTag {
    pub const ALL: [RelationTag; 3] = [
        RelationTag::Liked,
        RelationTag::Passed,
        RelationTag::Recommended,
    ];

    /// Name of the relation table backing this tag.
    ///
    /// The only text spliced into SQL. Always one of these three literals.
    pub const fn table_name(self) -> &'static str {
        match self {
            RelationTag::Liked => "liked_albums",
            RelationTag::Passed => "passed_albums",
            RelationTag::Recommended => "recommended_albums",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RelationTag::Liked => "liked",
            RelationTag::Passed => "passed",
            RelationTag::Recommended => "recommended",
        }
    }
}

impl fmt::Display for RelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`RelationTag`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown relation tag: {0} (expected liked, passed or recommended)")]
pub struct ParseTagError(String);

impl FromStr for RelationTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "liked" | "like" => Ok(RelationTag::Liked),
            "passed" | "pass" => Ok(RelationTag::Passed),
            "recommended" | "recommend" => Ok(RelationTag::Recommended),
            _ => Err(ParseTagError(s.to_string())),
        }
    }
}
