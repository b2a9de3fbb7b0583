//! Conversation session management for DMFY.
//!
//! One session per (tenant, sender, channel): stable key computation,
//! an in-memory store with idle expiry, and the per-session lock that
//! serializes concurrent turns for the same sender.

pub mod lifecycle;
pub mod lock;
pub mod session_key;
pub mod store;

pub use lifecycle::{ExpiryReason, LifecycleManager};
pub use lock::SessionLockMap;
pub use session_key::{compute_session_key, effective_tenant};
pub use store::{Session, SessionStore, TurnRecord};
