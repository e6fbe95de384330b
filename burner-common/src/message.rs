/*
 * burner.kiwi disposable mail service
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::Inbox;

/// One email delivered to an inbox.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// unique identifier (uuid v4)
    pub id: uuid::Uuid,
    /// the inbox owning this message
    pub inbox_id: uuid::Uuid,
    /// unix timestamp of the reception
    pub received_at: i64,
    /// identifier given by the mail provider, if any
    pub provider_message_id: String,
    /// envelope sender
    pub sender: String,
    /// display name of the `From` header
    pub from_name: String,
    /// address of the `From` header
    pub from_address: String,
    /// `Subject` header
    pub subject: String,
    /// text/plain body
    pub body_plain: String,
    /// text/html body, links already rewritten
    pub body_html: String,
    /// copied from the owning inbox
    pub ttl: i64,
}

impl Message {
    /// Create an empty message for `inbox`, sharing its ttl.
    #[must_use]
    pub fn new(inbox: &Inbox, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            inbox_id: inbox.id,
            received_at: now,
            provider_message_id: String::new(),
            sender: String::new(),
            from_name: String::new(),
            from_address: String::new(),
            subject: String::new(),
            body_plain: String::new(),
            body_html: String::new(),
            ttl: inbox.ttl,
        }
    }

    /// Set the html body, rewriting every link to open in a new context.
    ///
    /// The raw body is kept if it cannot be rewritten.
    pub fn set_body_html(&mut self, html: &str) {
        self.body_html = match crate::html::rewrite_links(html) {
            Ok(rewritten) => rewritten,
            Err(error) => {
                log::warn!("could not rewrite html body of '{}': {error}", self.id);
                html.to_string()
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_inbox_ttl() {
        let inbox = Inbox::new("abc@example.com".to_string(), String::new(), 42);
        let message = Message::new(&inbox, 50);

        assert_eq!(message.inbox_id, inbox.id);
        assert_eq!(message.ttl, inbox.ttl);
        assert_eq!(message.received_at, 50);
    }

    #[test]
    fn empty_html_stays_empty() {
        let inbox = Inbox::new("abc@example.com".to_string(), String::new(), 0);
        let mut message = Message::new(&inbox, 0);
        message.set_body_html("");

        assert_eq!(message.body_html, "");
    }

    #[test]
    fn deep_html_kept_raw() {
        let inbox = Inbox::new("abc@example.com".to_string(), String::new(), 0);
        let mut message = Message::new(&inbox, 0);
        let deep = "<div>".repeat(10_000);
        message.set_body_html(&deep);

        assert_eq!(message.body_html, deep);
    }
}
