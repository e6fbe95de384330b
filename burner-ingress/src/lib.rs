//! burner mail ingress: the SMTP receiver and the Mailgun webhook

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

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

mod log_channels {
    pub const SERVER: &str = "ingress::smtp::server";
    pub const CONNECTION: &str = "ingress::smtp::connection";
    pub const TRANSACTION: &str = "ingress::smtp::transaction";
    pub const MAILGUN: &str = "ingress::mailgun";
}

mod parse;

/// Mailgun routes and inbound webhook
pub mod mailgun;
/// self hosted SMTP receiver
pub mod smtp;

pub use parse::{parse_message, split_from, ParsedMessage};

use burner_common::{
    re::{anyhow, async_trait},
    storage::Database,
    Blacklist, Inbox,
};
use burner_config::{Config, IngressKind};

/// A way for mail to reach the inboxes.
///
/// Both providers share one lifecycle: started once with the storage, stopped on shutdown,
/// and asked to register a route for every new inbox.
#[async_trait::async_trait]
pub trait MailProvider: Send + Sync {
    /// Start the background work of the provider.
    ///
    /// The returned router holds the http endpoints the provider needs, it is merged
    /// into the http server of the service.
    ///
    /// # Errors
    ///
    /// * the provider cannot start (listener bind failure, ...)
    async fn start(
        &self,
        storage: std::sync::Arc<dyn Database>,
        blacklist: std::sync::Arc<Blacklist>,
    ) -> anyhow::Result<axum::Router>;

    /// Stop the background work of the provider.
    ///
    /// # Errors
    ///
    /// * the provider state is corrupted
    async fn stop(&self) -> anyhow::Result<()>;

    /// Make the provider deliver the mail of `inbox`, returns the route identifier.
    ///
    /// # Errors
    ///
    /// * the provider refused the route
    async fn register_route(&self, inbox: &Inbox) -> anyhow::Result<String>;
}

/// Instantiate the provider selected by the configuration.
///
/// # Errors
///
/// * the mailgun credentials are missing
/// * the http client cannot be built
pub fn build(config: &Config) -> anyhow::Result<std::sync::Arc<dyn MailProvider>> {
    Ok(match config.ingress.kind {
        IngressKind::Smtp => std::sync::Arc::new(smtp::SmtpProvider::new(
            config.ingress.smtp.clone(),
        )),
        IngressKind::Mailgun => {
            let mailgun = config
                .ingress
                .mailgun
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("the mailgun ingress requires a key and a domain"))?;

            std::sync::Arc::new(mailgun::MailgunProvider::new(
                std::sync::Arc::new(mailgun::HttpRouteApi::new(&mailgun.key)?),
                mailgun.key.clone(),
                mailgun.domain.clone(),
                config.server.website_url.clone(),
            ))
        }
    })
}

/// re-exported module
pub mod re {
    pub use axum;
}
