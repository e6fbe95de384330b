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
use super::newest_first;
use crate::{
    auth::Session, error::PageError, lifecycle::CreateError, log_channels, pages,
    real_ip::ClientIp, session, AppState,
};
use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use burner_common::{re::log, re::uuid::Uuid, storage, Inbox, InboxState};

const REFRESH: HeaderName = HeaderName::from_static("refresh");

/// `GET /`: the inbox of the session, a new one if there is none.
pub async fn index(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    jar: PrivateCookieJar,
) -> Result<Response, PageError> {
    let now = burner_common::now();

    let current = match session::inbox_id(&jar) {
        None => None,
        Some(id) => match state.storage.get_inbox_by_id(&id).await {
            Ok(inbox) if inbox.is_expired(now) => None,
            Ok(inbox) => Some(inbox),
            Err(storage::Error::NotFound) => None,
            Err(error) => return Err(PageError::internal(error)),
        },
    };

    let (jar, inbox) = match current {
        Some(inbox) if inbox.state() == InboxState::Failed => {
            log::warn!(
                target: log_channels::HANDLERS,
                "inbox '{}' has no route, the session is cleared",
                inbox.id
            );
            return Ok((
                session::clear(jar),
                PageError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "We could not set up your inbox, refresh the page to get a new one.",
                ),
            )
                .into_response());
        }
        Some(inbox) => (jar, inbox),
        None => {
            let inbox = state
                .lifecycle
                .create_random(&client_ip)
                .await
                .map_err(PageError::internal)?;
            let secure = !state.config.server.developing;
            (session::bind(jar, inbox.id, secure), inbox)
        }
    };

    let mut messages = state
        .storage
        .get_messages_by_inbox_id(&inbox.id)
        .await
        .map_err(PageError::internal)?;
    newest_first(&mut messages);

    let mut response = (
        jar,
        Html(pages::inbox(
            &state.config.server.static_url,
            &inbox,
            &messages,
            now,
        )),
    )
        .into_response();

    if let Some(interval) = state.config.server.refresh_interval {
        response
            .headers_mut()
            .insert(REFRESH, HeaderValue::from(interval));
    }
    Ok(response)
}

async fn session_inbox(state: &AppState, inbox_id: &Uuid) -> Result<Inbox, PageError> {
    match state.storage.get_inbox_by_id(inbox_id).await {
        Ok(inbox) => Ok(inbox),
        Err(storage::Error::NotFound) => Err(PageError::new(
            StatusCode::NOT_FOUND,
            "This inbox does not exist anymore.",
        )),
        Err(error) => Err(PageError::internal(error)),
    }
}

/// `GET /messages/{message_id}/`
pub async fn message(
    State(state): State<AppState>,
    Session(inbox_id): Session,
    Path(message_id): Path<Uuid>,
) -> Result<Html<String>, PageError> {
    let inbox = session_inbox(&state, &inbox_id).await?;

    match state.storage.get_message_by_id(&inbox_id, &message_id).await {
        Ok(message) => Ok(Html(pages::message(
            &state.config.server.static_url,
            &inbox,
            &message,
        ))),
        Err(storage::Error::MessageDoesntExist | storage::Error::NotFound) => Err(
            PageError::new(StatusCode::NOT_FOUND, "This message does not exist."),
        ),
        Err(error) => Err(PageError::internal(error)),
    }
}

/// `GET /edit`
pub async fn edit_form(State(state): State<AppState>) -> Html<String> {
    Html(pages::edit(
        &state.config.server.static_url,
        state.lifecycle.generator().hosts(),
        None,
    ))
}

///
#[derive(Debug, serde::Deserialize)]
pub struct EditForm {
    user: String,
    host: String,
}

/// `POST /edit`: create an inbox for the chosen address and bind the session to it.
pub async fn edit(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    jar: PrivateCookieJar,
    Form(form): Form<EditForm>,
) -> Result<Response, PageError> {
    match state
        .lifecycle
        .create_with(form.user.trim(), form.host.trim(), &client_ip)
        .await
    {
        Ok(inbox) => {
            let secure = !state.config.server.developing;
            Ok((session::bind(jar, inbox.id, secure), Redirect::to("/")).into_response())
        }
        Err(error @ (CreateError::AddressInUse(_) | CreateError::Address(_))) => {
            Ok(Html(pages::edit(
                &state.config.server.static_url,
                state.lifecycle.generator().hosts(),
                Some(&error.to_string()),
            ))
            .into_response())
        }
        Err(CreateError::Storage(error)) => Err(PageError::internal(error)),
    }
}

/// `GET /delete`
pub async fn delete_form(
    State(state): State<AppState>,
    Session(inbox_id): Session,
) -> Result<Html<String>, PageError> {
    let inbox = session_inbox(&state, &inbox_id).await?;
    Ok(Html(pages::delete(&state.config.server.static_url, &inbox)))
}

///
#[derive(Debug, serde::Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "really-delete")]
    really_delete: String,
}

/// Booleans as written by html forms and scripts.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => Some(false),
        _ => None,
    }
}

/// `POST /delete`: forget the inbox of the session.
///
/// Only the session is cleared, the inbox and its messages stay until swept.
pub async fn delete(
    Session(inbox_id): Session,
    jar: PrivateCookieJar,
    Form(form): Form<DeleteForm>,
) -> Result<Response, PageError> {
    match parse_bool(&form.really_delete) {
        Some(true) => {
            log::info!(
                target: log_channels::HANDLERS,
                "session of inbox '{inbox_id}' cleared"
            );
            Ok((session::clear(jar), Redirect::to("/")).into_response())
        }
        Some(false) => Ok(Redirect::to("/").into_response()),
        None => Err(PageError::new(
            StatusCode::BAD_REQUEST,
            "really-delete must be true or false.",
        )),
    }
}

/// `GET /ping`
pub async fn ping() -> &'static str {
    "PONG"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lifecycle::tests::Gated, router, tests};
    use burner_common::{storage::Database, Message};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn request(
        method: axum::http::Method,
        uri: &str,
        cookie: Option<&str>,
        form: Option<&str>,
    ) -> axum::http::Request<axum::body::Body> {
        let mut request = axum::http::Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(axum::http::header::COOKIE, cookie);
        }
        match form {
            Some(form) => request
                .header(
                    axum::http::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(axum::body::Body::from(form.to_string()))
                .unwrap(),
            None => request.body(axum::body::Body::empty()).unwrap(),
        }
    }

    /// `name=value` of the session cookie set by `response`.
    fn session_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(session::COOKIE_NAME))
            .and_then(|value| value.split(';').next())
            .map(ToString::to_string)
    }

    fn address_of(page: &str) -> String {
        page.split("<h1>")
            .nth(1)
            .and_then(|rest| rest.split("</h1>").next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn index_creates_an_inbox() {
        let (state, storage) = tests::state(tests::config(true), Gated::open());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(axum::http::Method::GET, "/", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-frame-options").unwrap(),
            "DENY"
        );
        assert!(response.headers().get("strict-transport-security").is_some());

        let cookie = session_cookie(&response).unwrap();
        let address = address_of(&tests::body(response).await);
        assert!(storage.email_address_exists(&address).await.unwrap());

        let response = app
            .oneshot(request(axum::http::Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(session_cookie(&response), None);
        assert_eq!(address_of(&tests::body(response).await), address);
    }

    #[tokio::test]
    async fn failed_inbox_clears_the_session() {
        let (state, _) = tests::state(tests::config(true), Gated::failing());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(axum::http::Method::GET, "/", None, None))
            .await
            .unwrap();
        let cookie = session_cookie(&response).unwrap();

        let response = app
            .oneshot(request(axum::http::Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response
            .headers()
            .get_all(axum::http::header::SET_COOKIE)
            .iter()
            .any(|value| value.to_str().unwrap().contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn messages_need_a_session() {
        let (state, _) = tests::state(tests::config(false), Gated::open());

        let response = router(state)
            .oneshot(request(
                axum::http::Method::GET,
                &format!("/messages/{}/", Uuid::new_v4()),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn message_of_the_inbox() {
        let (state, storage) = tests::state(tests::config(true), Gated::open());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(axum::http::Method::GET, "/", None, None))
            .await
            .unwrap();
        let cookie = session_cookie(&response).unwrap();

        let address = address_of(&tests::body(response).await);
        let inbox = storage.get_inbox_by_address(&address).await.unwrap();

        let mut mail = Message::new(&inbox, burner_common::now());
        mail.subject = "Subject line".to_string();
        mail.body_plain = "Hello there".to_string();
        storage.save_new_message(&mail).await.unwrap();

        let response = app
            .clone()
            .oneshot(request(
                axum::http::Method::GET,
                &format!("/messages/{}/", mail.id),
                Some(&cookie),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(tests::body(response).await.contains("Hello there"));

        let response = app
            .oneshot(request(
                axum::http::Method::GET,
                &format!("/messages/{}/", Uuid::new_v4()),
                Some(&cookie),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chosen_address() {
        let (state, storage) = tests::state(tests::config(true), Gated::open());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(
                axum::http::Method::POST,
                "/edit",
                None,
                Some("user=bobby&host=example.com"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(session_cookie(&response).is_some());
        assert!(storage
            .email_address_exists("bobby@example.com")
            .await
            .unwrap());

        let response = app
            .oneshot(request(
                axum::http::Method::POST,
                "/edit",
                None,
                Some("user=bobby&host=example.com"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(tests::body(response).await.contains("already in use"));
    }

    #[tokio::test]
    async fn delete_clears_only_when_confirmed() {
        let (state, _) = tests::state(tests::config(true), Gated::open());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(axum::http::Method::GET, "/", None, None))
            .await
            .unwrap();
        let cookie = session_cookie(&response).unwrap();

        let response = app
            .clone()
            .oneshot(request(
                axum::http::Method::POST,
                "/delete",
                Some(&cookie),
                Some("really-delete=false"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(session_cookie(&response), None);

        let response = app
            .clone()
            .oneshot(request(
                axum::http::Method::POST,
                "/delete",
                Some(&cookie),
                Some("really-delete=maybe"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(request(
                axum::http::Method::POST,
                "/delete",
                Some(&cookie),
                Some("really-delete=true"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(session_cookie(&response)
            .is_some_and(|cookie| cookie == format!("{}=", session::COOKIE_NAME)));
    }

    #[tokio::test]
    async fn ping_and_refresh() {
        let mut config = tests::config(true);
        config.server.developing = true;
        config.server.refresh_interval = Some(30);
        let (state, _) = tests::state(config, Gated::open());
        let app = router(state);

        let response = app
            .clone()
            .oneshot(request(axum::http::Method::GET, "/ping", None, None))
            .await
            .unwrap();
        assert!(response.headers().get("strict-transport-security").is_none());
        assert!(response.headers().get("x-burner-version").is_some());
        assert_eq!(tests::body(response).await, "PONG");

        let response = app
            .oneshot(request(axum::http::Method::GET, "/", None, None))
            .await
            .unwrap();
        assert_eq!(response.headers().get("refresh").unwrap(), "30");
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("False"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}
