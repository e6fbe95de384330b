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
use super::{code::ReplyCode, transaction::Envelope, OnMail};
use crate::{log_channels, parse_message};
use burner_common::{
    re::{async_trait, log},
    storage::{Database, Error},
    Blacklist, Message,
};

/// Route identifier reported to the storage for the messages received over SMTP.
pub const SMTP_PROVIDER_ID: &str = "smtp";

/// Accept recipients known to the storage, and store one message per recipient.
pub struct StorageMailHandler {
    storage: std::sync::Arc<dyn Database>,
    blacklist: std::sync::Arc<Blacklist>,
}

impl StorageMailHandler {
    ///
    #[must_use]
    pub fn new(
        storage: std::sync::Arc<dyn Database>,
        blacklist: std::sync::Arc<Blacklist>,
    ) -> Self {
        Self { storage, blacklist }
    }
}

#[async_trait::async_trait]
impl OnMail for StorageMailHandler {
    async fn on_rcpt(&self, sender: &str, rcpt: &str) -> ReplyCode {
        if self.blacklist.is_blacklisted(sender) {
            log::warn!(
                target: log_channels::TRANSACTION,
                "rejected blacklisted sender '{sender}'"
            );
            return ReplyCode::Code550Blacklisted;
        }

        match self.storage.email_address_exists(rcpt).await {
            Ok(true) => ReplyCode::Code250,
            Ok(false) => ReplyCode::Code550BadMailbox,
            Err(error) => {
                log::error!(
                    target: log_channels::TRANSACTION,
                    "could not look up recipient '{rcpt}': {error}"
                );
                ReplyCode::Code451
            }
        }
    }

    async fn on_mail(&self, mail: Box<Envelope>) -> ReplyCode {
        let parsed = match parse_message(mail.body.as_bytes()) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!(
                    target: log_channels::TRANSACTION,
                    "could not parse message from '{}': {error}",
                    mail.mail_from
                );
                return ReplyCode::Code554;
            }
        };

        let now = burner_common::now();
        let mut reply = ReplyCode::Code250;

        for rcpt in &mail.rcpt {
            let inbox = match self.storage.get_inbox_by_address(rcpt).await {
                Ok(inbox) => inbox,
                Err(Error::NotFound) => {
                    log::warn!(
                        target: log_channels::TRANSACTION,
                        "inbox of '{rcpt}' expired during the transaction"
                    );
                    continue;
                }
                Err(error) => {
                    log::error!(
                        target: log_channels::TRANSACTION,
                        "could not load inbox of '{rcpt}': {error}"
                    );
                    reply = ReplyCode::Code451;
                    continue;
                }
            };

            let mut message = Message::new(&inbox, now);
            message.provider_message_id = SMTP_PROVIDER_ID.to_string();
            message.sender.clone_from(&mail.mail_from);
            message.from_name.clone_from(&parsed.from_name);
            message.from_address.clone_from(&parsed.from_address);
            message.subject.clone_from(&parsed.subject);
            message.body_plain.clone_from(&parsed.body_plain);
            if !parsed.body_html.is_empty() {
                message.set_body_html(&parsed.body_html);
            }

            match self.storage.save_new_message(&message).await {
                Ok(()) => log::info!(
                    target: log_channels::TRANSACTION,
                    "message '{}' stored for inbox '{}'",
                    message.id,
                    inbox.id
                ),
                Err(error) => {
                    log::error!(
                        target: log_channels::TRANSACTION,
                        "could not store message for '{rcpt}': {error}"
                    );
                    reply = ReplyCode::Code451;
                }
            }
        }

        reply
    }
}
