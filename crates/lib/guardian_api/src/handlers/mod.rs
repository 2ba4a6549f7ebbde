//! Request handlers.

pub mod auth;
pub mod complaints;
pub mod health;
pub mod upload;
pub mod users;
