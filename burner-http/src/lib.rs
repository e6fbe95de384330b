//! burner http front door: html pages, json api and the inbox lifecycle

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
    pub const LIFECYCLE: &str = "http::lifecycle";
    pub const HANDLERS: &str = "http::handlers";
}

mod auth;
mod handlers;
mod headers;
mod pages;
mod real_ip;

/// json envelope and error responses
pub mod error;
/// creation of the inboxes and registration of their routes
pub mod lifecycle;
/// signed tokens of the api clients
pub mod notary;
/// session cookie of the browsers
pub mod session;

pub use lifecycle::{CreateError, Lifecycle};
pub use notary::{Notary, NotaryError};

use axum::{extract::FromRef, middleware, routing::get};
use axum_extra::extract::cookie::Key;
use burner_common::{re::anyhow, storage::Database, AddressGenerator};
use burner_config::Config;
use burner_ingress::MailProvider;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    config: std::sync::Arc<Config>,
    storage: std::sync::Arc<dyn Database>,
    lifecycle: std::sync::Arc<Lifecycle>,
    notary: std::sync::Arc<Notary>,
    key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

impl AppState {
    /// Build the state of the http server.
    ///
    /// # Errors
    ///
    /// * no domain is configured
    pub fn new(
        config: std::sync::Arc<Config>,
        storage: std::sync::Arc<dyn Database>,
        provider: std::sync::Arc<dyn MailProvider>,
    ) -> anyhow::Result<Self> {
        let lifecycle = Lifecycle::new(
            storage.clone(),
            provider,
            AddressGenerator::new(config.server.domains.iter().cloned())?,
            config.server.lambda,
        );

        Ok(Self {
            notary: std::sync::Arc::new(Notary::new(&config.server.key)),
            key: session::key(&config.server.key),
            lifecycle: std::sync::Arc::new(lifecycle),
            storage,
            config,
        })
    }

    /// Replace the notary, to pin its clock.
    #[must_use]
    pub fn with_notary(mut self, notary: Notary) -> Self {
        self.notary = std::sync::Arc::new(notary);
        self
    }

    ///
    #[must_use]
    pub fn notary(&self) -> &Notary {
        &self.notary
    }
}

/// Every route of the service, except the ones of the mail provider.
pub fn router(state: AppState) -> axum::Router {
    let developing = state.config.server.developing;

    let api = axum::Router::new()
        .route("/api/v2/inbox/:inbox_id", get(handlers::api::inbox))
        .route("/api/v2/inbox/:inbox_id/", get(handlers::api::inbox))
        .route("/api/v2/inbox/:inbox_id/messages", get(handlers::api::messages))
        .route("/api/v2/inbox/:inbox_id/messages/", get(handlers::api::messages))
        .route(
            "/api/v2/inbox/:inbox_id/messages/:message_id",
            get(handlers::api::message),
        )
        .route(
            "/api/v2/inbox/:inbox_id/messages/:message_id/",
            get(handlers::api::message),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_token,
        ));

    axum::Router::new()
        .route("/", get(handlers::html::index))
        .route("/messages/:message_id", get(handlers::html::message))
        .route("/messages/:message_id/", get(handlers::html::message))
        .route(
            "/edit",
            get(handlers::html::edit_form).post(handlers::html::edit),
        )
        .route(
            "/delete",
            get(handlers::html::delete_form).post(handlers::html::delete),
        )
        .route("/ping", get(handlers::html::ping))
        .route("/api/v2/inbox", get(handlers::api::create))
        .route("/api/v2/inbox/", get(handlers::api::create))
        .merge(api)
        .merge(headers::static_files(
            &state.config.server.static_dir,
            developing,
        ))
        .layer(middleware::from_fn_with_state(developing, headers::security))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lifecycle::tests::Gated;
    use burner_storage::InMemory;

    pub fn config(lambda: bool) -> Config {
        Config::builder()
            .with_debug_server()
            .with_domains(&["example.com"])
            .with_memory_database()
            .with_default_smtp_ingress()
            .with_default_logs()
            .with_lambda(lambda)
            .validate()
            .unwrap()
    }

    pub fn state(config: Config, provider: Gated) -> (AppState, std::sync::Arc<InMemory>) {
        let storage = std::sync::Arc::new(InMemory::new());
        let state = AppState::new(
            std::sync::Arc::new(config),
            storage.clone(),
            std::sync::Arc::new(provider),
        )
        .unwrap();
        (state, storage)
    }

    pub async fn body(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
