//! Instagram messaging (`object: "instagram"`).
//!
//! Messages show up in two places depending on the subscription:
//! `entry[].changes[].value.messages[0]` and the Messenger-style
//! `entry[].messaging[]`.  Both are read, changes first.

use dm_domain::Channel;

use crate::inbound::{
    messaging_events, non_empty, InboundAdapter, InboundEvent, WebhookBody, WebhookEntry,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct InstagramAdapter;

impl InboundAdapter for InstagramAdapter {
    fn object(&self) -> &'static str {
        "instagram"
    }

    fn channel(&self) -> Channel {
        Channel::Instagram
    }

    fn extract(&self, body: &WebhookBody) -> Vec<InboundEvent> {
        let mut events = Vec::new();
        for entry in &body.entry {
            events.extend(change_events(entry));
            events.extend(messaging_events(entry, Channel::Instagram));
        }
        events
    }
}

/// Only the first message of each change is read.
fn change_events(entry: &WebhookEntry) -> impl Iterator<Item = InboundEvent> + '_ {
    entry.changes.iter().filter_map(move |change| {
        let msg = change.value.as_ref()?.messages.first()?;
        let sender_id = non_empty(msg.from.as_ref()?.id())?;
        Some(InboundEvent {
            channel: Channel::Instagram,
            page_id: entry.id.clone(),
            sender_id,
            text: msg.text.clone().unwrap_or_default(),
        })
    })
}
