//! Session state and the manager that owns it.

pub mod data;
pub mod manager;

pub use data::{Session, SessionPhase, SessionSnapshot, TokenSet};
pub use manager::{SessionManager, SessionSettings};
