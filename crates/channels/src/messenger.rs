//! Facebook Messenger (`object: "page"`).

use dm_domain::Channel;

use crate::inbound::{messaging_events, InboundAdapter, InboundEvent, WebhookBody};

#[derive(Debug, Default, Clone, Copy)]
pub struct MessengerAdapter;

impl InboundAdapter for MessengerAdapter {
    fn object(&self) -> &'static str {
        "page"
    }

    fn channel(&self) -> Channel {
        Channel::Messenger
    }

    fn extract(&self, body: &WebhookBody) -> Vec<InboundEvent> {
        body.entry
            .iter()
            .flat_map(|entry| messaging_events(entry, Channel::Messenger))
            .collect()
    }
}
