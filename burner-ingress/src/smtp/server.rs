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
use super::{code::ReplyCode, connection::Connection, handle_connection, OnMail};
use crate::log_channels;
use burner_common::re::{anyhow, log};
use burner_config::ConfigSmtp;

/// TCP/IP server
pub struct Server<M: OnMail + 'static> {
    listener: tokio::net::TcpListener,
    config: std::sync::Arc<ConfigSmtp>,
    handler: std::sync::Arc<M>,
}

impl<M: OnMail + 'static> Server<M> {
    /// Create a server with the configuration provided, and the socket already bound
    pub fn new(
        config: std::sync::Arc<ConfigSmtp>,
        listener: tokio::net::TcpListener,
        handler: std::sync::Arc<M>,
    ) -> Self {
        Self {
            listener,
            config,
            handler,
        }
    }

    /// Get the local address of the tcp listener
    ///
    /// # Errors
    ///
    /// * the socket is not bound
    pub fn addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, each client is served on its own task.
    ///
    /// # Errors
    ///
    /// * the listener failed to accept a connection
    pub async fn listen_and_serve(self) -> anyhow::Result<()> {
        let client_counter = std::sync::Arc::new(std::sync::atomic::AtomicI64::new(0));

        loop {
            let (mut stream, client_addr) = self.listener.accept().await?;
            log::info!(target: log_channels::SERVER, "Connection from: {client_addr}");

            if self.config.client_count_max != -1
                && client_counter.load(std::sync::atomic::Ordering::SeqCst)
                    >= self.config.client_count_max
            {
                if let Err(e) = tokio::io::AsyncWriteExt::write_all(
                    &mut stream,
                    ReplyCode::ConnectionMaxReached
                        .reply(&self.config.domain)
                        .as_bytes(),
                )
                .await
                {
                    log::warn!(target: log_channels::SERVER, "{e}");
                }

                if let Err(e) = tokio::io::AsyncWriteExt::shutdown(&mut stream).await {
                    log::warn!(target: log_channels::SERVER, "{e}");
                }
                continue;
            }

            client_counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

            let session = Self::run_session(
                stream,
                client_addr,
                self.config.clone(),
                self.handler.clone(),
            );
            let client_counter_copy = client_counter.clone();
            tokio::spawn(async move {
                session.await;
                client_counter_copy.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            });
        }
    }

    async fn run_session(
        stream: tokio::net::TcpStream,
        client_addr: std::net::SocketAddr,
        config: std::sync::Arc<ConfigSmtp>,
        handler: std::sync::Arc<M>,
    ) {
        let begin = std::time::Instant::now();
        let mut conn = Connection::new(client_addr, config, stream);

        match handle_connection(&mut conn, handler.as_ref()).await {
            Ok(()) => log::info!(
                target: log_channels::SERVER,
                "{{ elapsed: {:?} }} Connection {} closed cleanly",
                begin.elapsed(),
                client_addr,
            ),
            Err(error) => log::warn!(
                target: log_channels::SERVER,
                "{{ elapsed: {:?} }} Connection {} closed with an error {}",
                begin.elapsed(),
                client_addr,
                error,
            ),
        }
    }
}
