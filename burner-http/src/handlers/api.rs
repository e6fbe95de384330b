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
    error::{ApiError, Envelope},
    notary::{InboxToken, PURPOSE_API},
    real_ip::ClientIp,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use burner_common::{re::uuid::Uuid, storage, Inbox, Message};

/// Result of the inbox creation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Created {
    ///
    pub email: Inbox,
    /// to send in the `X-Burner-Key` header
    pub token: String,
}

/// `GET /api/v2/inbox`
pub async fn create(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
) -> Result<Json<Envelope<Created>>, ApiError> {
    let inbox = state
        .lifecycle
        .create_random(&client_ip)
        .await
        .map_err(ApiError::internal)?;

    let token = state
        .notary
        .sign(
            PURPOSE_API,
            InboxToken { inbox_id: inbox.id },
            inbox.ttl,
        )
        .map_err(ApiError::internal)?;

    Ok(Json(Envelope::success(Created {
        email: inbox,
        token,
    })))
}

/// `GET /api/v2/inbox/{inbox_id}`
pub async fn inbox(
    State(state): State<AppState>,
    Path(inbox_id): Path<Uuid>,
) -> Result<Json<Envelope<Inbox>>, ApiError> {
    match state.storage.get_inbox_by_id(&inbox_id).await {
        Ok(inbox) => Ok(Json(Envelope::success(inbox))),
        Err(storage::Error::NotFound) => {
            Err(ApiError::new(StatusCode::NOT_FOUND, "inbox not found"))
        }
        Err(error) => Err(ApiError::internal(error)),
    }
}

/// `GET /api/v2/inbox/{inbox_id}/messages`, newest first.
pub async fn messages(
    State(state): State<AppState>,
    Path(inbox_id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<Message>>>, ApiError> {
    let mut messages = state
        .storage
        .get_messages_by_inbox_id(&inbox_id)
        .await
        .map_err(ApiError::internal)?;
    newest_first(&mut messages);

    Ok(Json(Envelope::success(messages)))
}

/// `GET /api/v2/inbox/{inbox_id}/messages/{message_id}`
pub async fn message(
    State(state): State<AppState>,
    Path((inbox_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    match state.storage.get_message_by_id(&inbox_id, &message_id).await {
        Ok(message) => Ok(Json(Envelope::success(message))),
        Err(storage::Error::MessageDoesntExist | storage::Error::NotFound) => {
            Err(ApiError::new(StatusCode::NOT_FOUND, "message not found"))
        }
        Err(error) => Err(ApiError::internal(error)),
    }
}
