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
use super::signature;
use crate::{log_channels, split_from};
use burner_common::{re::log, re::uuid::Uuid, storage::Database, Blacklist, Message};

/// What the webhook needs to store a message.
#[derive(Clone)]
pub struct WebhookState {
    storage: std::sync::Arc<dyn Database>,
    blacklist: std::sync::Arc<Blacklist>,
    key: std::sync::Arc<str>,
}

impl WebhookState {
    /// `key` is the secret signing the webhook calls.
    #[must_use]
    pub fn new(
        storage: std::sync::Arc<dyn Database>,
        blacklist: std::sync::Arc<Blacklist>,
        key: &str,
    ) -> Self {
        Self {
            storage,
            blacklist,
            key: key.into(),
        }
    }
}

/// Form fields posted by a route forwarding a message.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct IncomingForm {
    timestamp: String,
    token: String,
    signature: String,
    #[serde(rename = "message-id")]
    message_id: String,
    sender: String,
    from: String,
    subject: String,
    #[serde(rename = "body-plain")]
    body_plain: String,
    #[serde(rename = "body-html")]
    body_html: String,
}

/// The inbound endpoint, `POST /mg/incoming/{inbox_id}/`.
pub fn router(state: WebhookState) -> axum::Router {
    axum::Router::new()
        .route("/mg/incoming/:inbox_id/", axum::routing::post(incoming))
        .route("/mg/incoming/:inbox_id", axum::routing::post(incoming))
        .with_state(state)
}

async fn incoming(
    axum::extract::State(state): axum::extract::State<WebhookState>,
    axum::extract::Path(inbox_id): axum::extract::Path<Uuid>,
    axum::Form(form): axum::Form<IncomingForm>,
) -> axum::http::StatusCode {
    if !signature::verify(&state.key, &form.timestamp, &form.token, &form.signature) {
        log::warn!(
            target: log_channels::MAILGUN,
            "rejected unsigned delivery for inbox '{inbox_id}'"
        );
        return axum::http::StatusCode::UNAUTHORIZED;
    }

    if state.blacklist.is_blacklisted(&form.sender) {
        log::warn!(
            target: log_channels::MAILGUN,
            "rejected blacklisted sender '{}'",
            form.sender
        );
        return axum::http::StatusCode::NOT_ACCEPTABLE;
    }

    let inbox = match state.storage.get_inbox_by_id(&inbox_id).await {
        Ok(inbox) => inbox,
        Err(error) => {
            log::error!(
                target: log_channels::MAILGUN,
                "could not load inbox '{inbox_id}': {error}"
            );
            return axum::http::StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let (from_name, from_address) = split_from(&form.from);

    let mut message = Message::new(&inbox, burner_common::now());
    message.provider_message_id = form.message_id;
    message.sender = form.sender;
    message.from_name = from_name;
    message.from_address = from_address;
    message.subject = form.subject;
    message.body_plain = form.body_plain;
    if !form.body_html.is_empty() {
        message.set_body_html(&form.body_html);
    }

    // a failure is not reported to the provider, a retry would not be deduplicated
    match state.storage.save_new_message(&message).await {
        Ok(()) => log::info!(
            target: log_channels::MAILGUN,
            "message '{}' stored for inbox '{inbox_id}'",
            message.id
        ),
        Err(error) => log::error!(
            target: log_channels::MAILGUN,
            "could not store message for inbox '{inbox_id}': {error}"
        ),
    }

    axum::http::StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use burner_common::Inbox;
    use burner_storage::InMemory;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    const KEY: &str = "mailgun-key";

    fn delivery(inbox_id: &Uuid, signature: &str) -> axum::http::Request<axum::body::Body> {
        let body = serde_urlencoded::to_string([
            ("timestamp", "1529006854"),
            ("token", "a8ce0edb2dd8301dee6c2405235584e45aa91d1e9f979f3de0"),
            ("signature", signature),
            ("message-id", "1234"),
            ("sender", "hayden@example.com"),
            ("from", "hayden@example.com"),
            ("subject", "Subject line"),
            ("body-plain", "Hello there"),
            (
                "body-html",
                r#"<html><body><a href="https://example.com">Hello there</a></body></html>"#,
            ),
        ])
        .unwrap();

        axum::http::Request::builder()
            .method(axum::http::Method::POST)
            .uri(format!("/mg/incoming/{inbox_id}/"))
            .header(
                axum::http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(axum::body::Body::from(body))
            .unwrap()
    }

    fn valid_signature() -> String {
        signature::sign(
            KEY,
            "1529006854",
            "a8ce0edb2dd8301dee6c2405235584e45aa91d1e9f979f3de0",
        )
    }

    async fn seeded() -> (std::sync::Arc<InMemory>, Inbox) {
        let storage = std::sync::Arc::new(InMemory::new());
        let mut inbox = Inbox::new(
            "bobby@example.com".to_string(),
            "127.0.0.1".to_string(),
            burner_common::now(),
        );
        inbox.id = Uuid::parse_str("17b79467-f3a0-4bd0-b4e1-4c8bbf1ff7c3").unwrap();
        storage.save_new_inbox(&inbox).await.unwrap();
        (storage, inbox)
    }

    fn app(storage: std::sync::Arc<InMemory>, blacklist: &[&str]) -> axum::Router {
        router(WebhookState::new(
            storage,
            std::sync::Arc::new(Blacklist::new(blacklist)),
            KEY,
        ))
    }

    #[tokio::test]
    async fn stored_with_rewritten_links() {
        let (storage, inbox) = seeded().await;

        let response = app(storage.clone(), &[])
            .oneshot(delivery(&inbox.id, &valid_signature()))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let messages = storage.get_messages_by_inbox_id(&inbox.id).await.unwrap();
        assert_eq!(messages.len(), 1);

        let message = &messages[0];
        assert_eq!(
            message.body_html,
            r#"<html><head></head><body><a href="https://example.com" target="_blank">Hello there</a></body></html>"#
        );
        assert_eq!(message.body_plain, "Hello there");
        assert_eq!(message.provider_message_id, "1234");
        assert_eq!(message.sender, "hayden@example.com");
        assert_eq!(message.from_address, "hayden@example.com");
        assert_eq!(message.subject, "Subject line");
        assert_eq!(message.ttl, inbox.ttl);
    }

    #[tokio::test]
    async fn blacklisted_sender() {
        let (storage, inbox) = seeded().await;

        let response = app(storage.clone(), &["example.com"])
            .oneshot(delivery(&inbox.id, &valid_signature()))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_ACCEPTABLE);

        assert!(storage
            .get_messages_by_inbox_id(&inbox.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn forged_signature() {
        let (storage, inbox) = seeded().await;

        let response = app(storage.clone(), &[])
            .oneshot(delivery(&inbox.id, &"0".repeat(64)))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);

        assert!(storage
            .get_messages_by_inbox_id(&inbox.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_inbox() {
        let (storage, _) = seeded().await;

        let response = app(storage, &[])
            .oneshot(delivery(&Uuid::new_v4(), &valid_signature()))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
