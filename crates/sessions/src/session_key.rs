//! Session key computation.
//!
//! Key template: `tenant:<tenantKey>:<channel>:dm:<senderId>`.
//!
//! The same sender id on two channels, or under two tenants, yields two
//! independent sessions.  `%` and `:` inside the tenant key or sender id
//! are percent-escaped, so distinct triples never share a key.

use std::borrow::Cow;

use dm_domain::Channel;

/// Tenant key with the empty key mapped to the default tenant.
pub fn effective_tenant(tenant_key: &str) -> &str {
    if tenant_key.is_empty() {
        dm_domain::config::DEFAULT_TENANT
    } else {
        tenant_key
    }
}

/// Compute the stable session key for a sender on a channel under a tenant.
pub fn compute_session_key(tenant_key: &str, channel: Channel, sender_id: &str) -> String {
    let tenant = escape(effective_tenant(tenant_key));
    let sender = escape(if sender_id.is_empty() { "unknown" } else { sender_id });
    format!("tenant:{tenant}:{channel}:dm:{sender}")
}

fn escape(part: &str) -> Cow<'_, str> {
    if part.contains(['%', ':']) {
        Cow::Owned(part.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messenger_key() {
        let key = compute_session_key("default", Channel::Messenger, "psid-1");
        assert_eq!(key, "tenant:default:messenger:dm:psid-1");
    }

    #[test]
    fn channels_are_isolated() {
        let a = compute_session_key("page42", Channel::Messenger, "u1");
        let b = compute_session_key("page42", Channel::Instagram, "u1");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_parts_fall_back() {
        let key = compute_session_key("", Channel::Instagram, "");
        assert_eq!(key, "tenant:default:instagram:dm:unknown");
    }

    #[test]
    fn separators_in_parts_cannot_collide() {
        let a = compute_session_key("t", Channel::Messenger, "x:messenger:dm:y");
        let b = compute_session_key("t:messenger:dm:x", Channel::Messenger, "y");
        assert_ne!(a, b);
        assert_eq!(a, "tenant:t:messenger:dm:x%3Amessenger%3Adm%3Ay");
    }

    #[test]
    fn escape_is_unambiguous() {
        let a = compute_session_key("a%3Ab", Channel::Messenger, "u");
        let b = compute_session_key("a:b", Channel::Messenger, "u");
        assert_ne!(a, b);
        assert_eq!(a, "tenant:a%253Ab:messenger:dm:u");
    }
}
