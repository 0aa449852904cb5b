//! API v1 handlers.

mod chat;

pub use chat::{chat, list_providers};
