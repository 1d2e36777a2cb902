//! Data-access layer for the Apollo music catalog.
//!
//! Accounts, albums and the per-user liked/passed/recommended relations all live
//! behind [`db::CatalogStore`], which owns a single SQLite connection.

pub mod crypto;
pub mod db;
pub mod models;
