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
/// lifetime of an inbox, in seconds.
pub const INBOX_LIFETIME: i64 = 86_400;

/// route identifier of an inbox not yet registered with a mail provider.
pub const ROUTE_UNREGISTERED: &str = "-";

/// A disposable mailbox.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Inbox {
    /// unique identifier (uuid v4)
    pub id: uuid::Uuid,
    /// full email address, unique across live inboxes
    pub address: String,
    /// unix timestamp of the creation
    pub created_at: i64,
    /// ip address of the client who asked for the inbox
    pub created_by: String,
    /// unix timestamp after which the inbox is swept
    pub ttl: i64,
    /// identifier returned by the mail provider, "-" until registered
    pub provider_route_id: String,
    /// the route registration failed, the inbox will never receive mail
    pub failed_to_create: bool,
}

/// Registration progress of an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxState {
    /// the route registration has not completed yet
    Pending,
    /// the inbox can receive mail
    Ready,
    /// the route registration failed
    Failed,
}

impl Inbox {
    /// Create a pending inbox living for [`INBOX_LIFETIME`] seconds after `now`.
    #[must_use]
    pub fn new(address: String, created_by: String, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            address,
            created_at: now,
            created_by,
            ttl: now + INBOX_LIFETIME,
            provider_route_id: ROUTE_UNREGISTERED.to_string(),
            failed_to_create: false,
        }
    }

    /// Where the inbox stands in its registration.
    #[must_use]
    pub fn state(&self) -> InboxState {
        if self.failed_to_create {
            InboxState::Failed
        } else if self.provider_route_id == ROUTE_UNREGISTERED {
            InboxState::Pending
        } else {
            InboxState::Ready
        }
    }

    /// The inbox outlived its ttl.
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        self.ttl < now
    }
}
