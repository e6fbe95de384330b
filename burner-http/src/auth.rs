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
use crate::{
    error::{ApiError, PageError},
    notary::{InboxToken, NotaryError, PURPOSE_API},
    session, AppState,
};
use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use burner_common::re::uuid::Uuid;

/// header carrying the token of the api clients.
pub const TOKEN_HEADER: &str = "X-Burner-Key";

/// The inbox of the browser session, rejects the request with a 401 if there is none.
#[derive(Debug, Clone, Copy)]
pub struct Session(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, PageError> {
        let jar = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|never| match never {})?;

        session::inbox_id(&jar).map(Self).ok_or_else(|| {
            PageError::new(
                StatusCode::UNAUTHORIZED,
                "You don't have an inbox yet, visit the home page to get one.",
            )
        })
    }
}

/// Let the request through only with a valid token bound to the `inbox_id` of the url.
pub async fn require_token(
    State(state): State<AppState>,
    Path(params): Path<std::collections::HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let granted = match state.notary.verify::<InboxToken>(PURPOSE_API, token) {
        Ok(granted) => granted,
        Err(NotaryError::Invalid) => {
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "invalid token"))
        }
        Err(NotaryError::Expired) => {
            return Err(ApiError::new(StatusCode::FORBIDDEN, "token has expired"))
        }
        Err(error @ NotaryError::Malformed(_)) => return Err(ApiError::internal(error)),
    };

    let requested = params
        .get("inbox_id")
        .and_then(|id| Uuid::parse_str(id).ok());

    if requested != Some(granted.inbox_id) {
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "permission denied: this token does not grant access to this inbox",
        ));
    }

    Ok(next.run(request).await)
}
