//! # guardian_core
//!
//! Core domain logic for CityGuardian: identity, sessions, media intake and
//! the complaint workflow, over pluggable storage backends.

pub mod auth;
pub mod complaints;
pub mod db;
pub mod media;
pub mod migrate;
pub mod models;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
