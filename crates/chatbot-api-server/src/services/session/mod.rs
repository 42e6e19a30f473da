//! In-memory conversation sessions
//!
//! - Thread-safe storage (DashMap), one entry per session id
//! - Per-session message cap that preserves the first message
//! - TTL eviction through a periodic sweep

mod store;
mod types;

pub use store::{SessionStats, SessionStore};
pub use types::Session;
