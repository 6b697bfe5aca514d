//! Data models shared across the crate.
//!
//! - `Credentials`: the login payload (Debug output redacts the password)
//! - `UserProfile`: the server's user payload, with unknown fields carried
//!   opaquely so they survive persistence

pub mod user;

pub use user::{Credentials, UserProfile};
