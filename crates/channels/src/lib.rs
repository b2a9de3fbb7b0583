//! `dm-channels`: the edges of the conversation pipeline.
//!
//! Inbound, Meta webhook bodies are normalized into [`InboundEvent`]s by
//! one [`InboundAdapter`] per webhook `object` (`"page"` for Messenger,
//! `"instagram"` for Instagram).  Outbound, replies go through a
//! [`MessageDispatcher`]: the Graph Send API client in production, a
//! logging dry-run sink when no page token is configured.
//!
//! ```rust,no_run
//! use dm_channels::{parse_webhook, DryRunDispatcher, deliver_all};
//! use std::time::Duration;
//!
//! # async fn example(body: &[u8]) -> dm_domain::Result<()> {
//! let parsed = parse_webhook(body)?;
//! let dispatcher = DryRunDispatcher;
//! for event in parsed.events {
//!     let report = deliver_all(
//!         &dispatcher,
//!         event.channel,
//!         &event.sender_id,
//!         ["echo"],
//!         Duration::from_secs(5),
//!     )
//!     .await;
//!     report.into_result()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod delivery;
pub mod dispatch;
pub mod graph;
pub mod inbound;
pub mod instagram;
pub mod messenger;

pub use delivery::{deliver_all, DeliveryFailure, DeliveryReport};
pub use dispatch::{DryRunDispatcher, MessageDispatcher, RecordingDispatcher, SentMessage};
pub use graph::GraphApiDispatcher;
pub use inbound::{parse_webhook, InboundAdapter, InboundEvent, ParsedWebhook, WebhookObject};
pub use instagram::InstagramAdapter;
pub use messenger::MessengerAdapter;
