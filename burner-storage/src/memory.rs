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
use crate::log_channels;
use burner_common::{
    re::{anyhow, async_trait, log, uuid::Uuid},
    storage::{Database, Error, Result},
    Inbox, Message,
};

const SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Default)]
struct Tables {
    inboxes: std::collections::HashMap<Uuid, Inbox>,
    addresses: std::collections::HashMap<String, Uuid>,
    messages: std::collections::HashMap<Uuid, Message>,
    /// messages of each inbox, by inbox id
    by_inbox: std::collections::HashMap<Uuid, Vec<Uuid>>,
}

/// Backend keeping every row in the process memory.
///
/// A single mutex guards every table, it is never held across an await point.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    tables: std::sync::Arc<std::sync::Mutex<Tables>>,
    started: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl InMemory {
    ///
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Backend(anyhow::anyhow!("memory tables poisoned")))
    }

    fn update_inbox(&self, id: &Uuid, f: impl FnOnce(&mut Inbox)) -> Result<()> {
        let mut tables = self.lock()?;
        tables.inboxes.get_mut(id).map(f).ok_or(Error::NotFound)
    }
}

#[async_trait::async_trait]
impl Database for InMemory {
    async fn start(&self) -> anyhow::Result<()> {
        if !self
            .started
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            crate::sweeper::spawn(
                log_channels::MEMORY,
                SWEEP_PERIOD,
                std::sync::Arc::new(self.clone()),
            );
        }
        Ok(())
    }

    async fn save_new_inbox(&self, inbox: &Inbox) -> Result<()> {
        let mut tables = self.lock()?;

        if tables.inboxes.contains_key(&inbox.id) {
            return Err(Error::Duplicate(inbox.id.to_string()));
        }
        if tables.addresses.contains_key(&inbox.address) {
            return Err(Error::Duplicate(inbox.address.clone()));
        }

        tables.addresses.insert(inbox.address.clone(), inbox.id);
        tables.inboxes.insert(inbox.id, inbox.clone());
        Ok(())
    }

    async fn get_inbox_by_id(&self, id: &Uuid) -> Result<Inbox> {
        self.lock()?.inboxes.get(id).cloned().ok_or(Error::NotFound)
    }

    async fn get_inbox_by_address(&self, address: &str) -> Result<Inbox> {
        let tables = self.lock()?;
        tables
            .addresses
            .get(address)
            .and_then(|id| tables.inboxes.get(id))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn email_address_exists(&self, address: &str) -> Result<bool> {
        Ok(self.lock()?.addresses.contains_key(address))
    }

    async fn set_inbox_created(&self, inbox: &Inbox) -> Result<()> {
        self.update_inbox(&inbox.id, |stored| {
            stored.failed_to_create = false;
            stored.provider_route_id.clone_from(&inbox.provider_route_id);
        })
    }

    async fn set_inbox_failed(&self, inbox: &Inbox) -> Result<()> {
        self.update_inbox(&inbox.id, |stored| stored.failed_to_create = true)
    }

    async fn save_new_message(&self, message: &Message) -> Result<()> {
        let mut tables = self.lock()?;

        if !tables.inboxes.contains_key(&message.inbox_id) {
            return Err(Error::NotFound);
        }
        if tables.messages.contains_key(&message.id) {
            return Err(Error::Duplicate(message.id.to_string()));
        }

        tables
            .by_inbox
            .entry(message.inbox_id)
            .or_default()
            .push(message.id);
        tables.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn get_messages_by_inbox_id(&self, inbox_id: &Uuid) -> Result<Vec<Message>> {
        let tables = self.lock()?;
        Ok(tables
            .by_inbox
            .get(inbox_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| tables.messages.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_message_by_id(&self, inbox_id: &Uuid, message_id: &Uuid) -> Result<Message> {
        self.lock()?
            .messages
            .get(message_id)
            .filter(|message| message.inbox_id == *inbox_id)
            .cloned()
            .ok_or(Error::MessageDoesntExist)
    }

    async fn remove_expired(&self, now: i64) -> anyhow::Result<u64> {
        let mut tables = self.lock()?;
        let Tables {
            inboxes,
            addresses,
            messages,
            by_inbox,
        } = &mut *tables;

        let before = inboxes.len() + messages.len();

        inboxes.retain(|_, inbox| !inbox.is_expired(now));
        addresses.retain(|_, id| inboxes.contains_key(id));
        messages.retain(|_, message| message.ttl >= now && inboxes.contains_key(&message.inbox_id));
        by_inbox.retain(|inbox_id, ids| {
            ids.retain(|id| messages.contains_key(id));
            inboxes.contains_key(inbox_id) && !ids.is_empty()
        });

        let removed = before - (inboxes.len() + messages.len());
        log::trace!(
            target: log_channels::MEMORY,
            "{} inboxes and {} messages left after sweep",
            inboxes.len(),
            messages.len()
        );

        Ok(u64::try_from(removed)?)
    }
}
