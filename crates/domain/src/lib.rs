//! Shared types for the DMFY gateway: configuration, the common error type,
//! channel identifiers and structured trace events.

pub mod channel;
pub mod config;
pub mod error;
pub mod trace;

pub use channel::Channel;
pub use error::{Error, Result};
