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
use crate::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};

/// Address of the client, taken from the configured header when the instance sits
/// behind a trusted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let server = &state.config.server;

        if server.restore_real_ip {
            let forwarded = parts
                .headers
                .get(server.real_ip_header.as_str())
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());

            if let Some(forwarded) = forwarded {
                return Ok(Self(forwarded.to_string()));
            }
        }

        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<std::net::SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lifecycle::tests::Gated, tests};
    use pretty_assertions::assert_eq;

    async fn client_ip(restore_real_ip: bool) -> String {
        let mut config = tests::config(false);
        config.server.restore_real_ip = restore_real_ip;
        let (state, _) = tests::state(config, Gated::open());

        let (mut parts, ()) = axum::http::Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .extension(ConnectInfo(std::net::SocketAddr::from(([10, 0, 0, 1], 4242))))
            .body(())
            .unwrap()
            .into_parts();

        ClientIp::from_request_parts(&mut parts, &state)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn peer_address() {
        assert_eq!(client_ip(false).await, "10.0.0.1");
    }

    #[tokio::test]
    async fn restored_from_header() {
        assert_eq!(client_ip(true).await, "203.0.113.7");
    }
}
