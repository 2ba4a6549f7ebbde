//! Domain models shared by the store backends, the workflow and the HTTP layer.

pub mod auth;
pub mod complaint;
pub mod media;
pub mod user;
