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
use crate::{Inbox, Message};

/// Failure of a storage operation, normalized across backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// the requested inbox does not exist
    #[error("not found")]
    NotFound,
    /// the requested message does not exist in this inbox
    #[error("message does not exist")]
    MessageDoesntExist,
    /// the primary key (or the address of an inbox) is already taken
    #[error("duplicate key '{0}'")]
    Duplicate(String),
    /// any failure of the backend itself
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Result of a storage operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Persistence of inboxes and messages.
///
/// Every backend is safe under concurrent callers and owns a periodic
/// sweeper, spawned by [`Database::start`], deleting rows past their ttl.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Create the schema if needed and spawn the sweeper. Subsequent calls
    /// do not spawn a second sweeper.
    ///
    /// # Errors
    ///
    /// * the schema could not be created
    async fn start(&self) -> anyhow::Result<()>;

    /// Insert a new inbox.
    ///
    /// # Errors
    ///
    /// * [`Error::Duplicate`] if the id or the address is taken
    async fn save_new_inbox(&self, inbox: &Inbox) -> Result<()>;

    /// # Errors
    ///
    /// * [`Error::NotFound`] if absent
    async fn get_inbox_by_id(&self, id: &uuid::Uuid) -> Result<Inbox>;

    /// # Errors
    ///
    /// * [`Error::NotFound`] if absent
    async fn get_inbox_by_address(&self, address: &str) -> Result<Inbox>;

    /// # Errors
    ///
    /// * backend failure
    async fn email_address_exists(&self, address: &str) -> Result<bool>;

    /// Mark the inbox as registered with `inbox.provider_route_id`.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the inbox is gone
    async fn set_inbox_created(&self, inbox: &Inbox) -> Result<()>;

    /// Mark the route registration of the inbox as failed.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the inbox is gone
    async fn set_inbox_failed(&self, inbox: &Inbox) -> Result<()>;

    /// Insert a new message.
    ///
    /// # Errors
    ///
    /// * [`Error::NotFound`] if the parent inbox does not exist
    /// * [`Error::Duplicate`] if the id is taken
    async fn save_new_message(&self, message: &Message) -> Result<()>;

    /// Every message of an inbox, in no particular order. An inbox without
    /// message gives an empty vector.
    ///
    /// # Errors
    ///
    /// * backend failure
    async fn get_messages_by_inbox_id(&self, inbox_id: &uuid::Uuid) -> Result<Vec<Message>>;

    /// # Errors
    ///
    /// * [`Error::MessageDoesntExist`] if absent or owned by another inbox
    async fn get_message_by_id(
        &self,
        inbox_id: &uuid::Uuid,
        message_id: &uuid::Uuid,
    ) -> Result<Message>;

    /// One sweep: delete every inbox and message whose ttl is before `now`.
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// * backend failure, the next sweep retries
    async fn remove_expired(&self, now: i64) -> anyhow::Result<u64>;
}
