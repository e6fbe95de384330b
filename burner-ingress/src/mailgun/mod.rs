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
use crate::{log_channels, MailProvider};
use burner_common::{
    re::{anyhow, async_trait, log},
    storage::Database,
    Blacklist, Inbox,
};

mod api;
mod cleanup;
mod signature;
mod webhook;

pub use api::{HttpRouteApi, NewRoute, Route, RouteApi, RoutePage};
pub use cleanup::remove_expired_routes;
pub use signature::verify;
pub use webhook::{router, IncomingForm, WebhookState};

/// Mail reaches the inboxes through Mailgun: one route per inbox forwards to the webhook.
pub struct MailgunProvider {
    api: std::sync::Arc<dyn RouteApi>,
    key: String,
    domain: String,
    website_url: String,
    cleanup: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MailgunProvider {
    /// `key` signs the webhook calls, `domain` receives the mail and `website_url`
    /// is the public url the routes forward to.
    #[must_use]
    pub fn new(
        api: std::sync::Arc<dyn RouteApi>,
        key: String,
        domain: String,
        website_url: String,
    ) -> Self {
        Self {
            api,
            key,
            domain,
            website_url,
            cleanup: std::sync::Mutex::new(None),
        }
    }

    fn cleanup(
        &self,
    ) -> anyhow::Result<std::sync::MutexGuard<'_, Option<tokio::task::JoinHandle<()>>>> {
        self.cleanup
            .lock()
            .map_err(|_| anyhow::anyhow!("mailgun provider state is poisoned"))
    }
}

#[async_trait::async_trait]
impl MailProvider for MailgunProvider {
    async fn start(
        &self,
        storage: std::sync::Arc<dyn Database>,
        blacklist: std::sync::Arc<Blacklist>,
    ) -> anyhow::Result<axum::Router> {
        self.api.check_domain(&self.domain).await?;

        let mut cleanup = self.cleanup()?;
        if cleanup.is_none() {
            *cleanup = Some(cleanup::spawn(self.api.clone()));
        }

        log::info!(
            target: log_channels::MAILGUN,
            "webhook ready for '{}', route cleanup scheduled",
            self.domain
        );
        Ok(router(WebhookState::new(storage, blacklist, &self.key)))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(cleanup) = self.cleanup()?.take() {
            cleanup.abort();
        }
        Ok(())
    }

    async fn register_route(&self, inbox: &Inbox) -> anyhow::Result<String> {
        let id = self
            .api
            .create_route(&NewRoute::for_inbox(inbox, &self.website_url))
            .await?;

        log::debug!(
            target: log_channels::MAILGUN,
            "route '{id}' created for '{}'",
            inbox.address
        );
        Ok(id)
    }
}
