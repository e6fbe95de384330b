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
use crate::{log_channels, pages};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use burner_common::re::log;

/// `errors` member of the json envelope.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    /// always 500, the http status carries the real outcome
    pub code: u16,
    ///
    pub msg: String,
}

/// Every json response: `{success, errors, result}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Envelope<T> {
    ///
    pub success: bool,
    ///
    pub errors: Option<ErrorBody>,
    ///
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    ///
    pub const fn success(result: T) -> Self {
        Self {
            success: true,
            errors: None,
            result: Some(result),
        }
    }
}

/// Failure of a json endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    msg: String,
}

impl ApiError {
    ///
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }

    /// A 500, the cause is logged and not shown.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        log::error!(target: log_channels::HANDLERS, "{cause}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            success: false,
            errors: Some(ErrorBody {
                code: 500,
                msg: self.msg,
            }),
            result: None,
        };
        (self.status, axum::Json(body)).into_response()
    }
}

/// Failure of an html page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    status: StatusCode,
    msg: String,
}

impl PageError {
    ///
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
        }
    }

    /// A 500, the cause is logged and not shown.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        log::error!(target: log_channels::HANDLERS, "{cause}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong, please try again.",
        )
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.status, Html(pages::error(&self.msg))).into_response()
    }
}
