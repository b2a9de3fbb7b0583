//! `dm-gateway`: HTTP surface and CLI for DMFY.
//!
//! Receives Messenger / Instagram webhooks, runs each message through the
//! tenant's flow and sends the replies back through the Graph API.  Flow
//! publishing and session inspection live under `/api`.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
