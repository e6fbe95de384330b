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
use super::{code::ReplyCode, io::AbstractIO};
use crate::log_channels;
use burner_common::re::{anyhow, log};
use burner_config::ConfigSmtp;

/// Instance containing connection to the server's information
pub struct Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    /// connection timestamp
    pub timestamp: std::time::SystemTime,
    /// is still alive
    pub is_alive: bool,
    /// receiver's configuration
    pub config: std::sync::Arc<ConfigSmtp>,
    /// peer socket address
    pub client_addr: std::net::SocketAddr,
    /// number of error the client made so far
    pub error_count: i64,
    /// abstraction of the stream
    pub io_stream: AbstractIO<S>,
}

impl<S> Connection<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
{
    ///
    pub fn new(
        client_addr: std::net::SocketAddr,
        config: std::sync::Arc<ConfigSmtp>,
        stream: S,
    ) -> Self {
        Self {
            timestamp: std::time::SystemTime::now(),
            is_alive: true,
            config,
            client_addr,
            error_count: 0,
            io_stream: AbstractIO::new(stream),
        }
    }

    /// send a reply code to the client
    ///
    /// Errors are counted: past the soft limit each error reply is delayed, at the hard limit
    /// the connection is closed.
    ///
    /// # Errors
    ///
    /// * the hard error limit is reached
    /// * internal connection writer error
    pub async fn send_code(&mut self, reply_to_send: ReplyCode) -> anyhow::Result<()> {
        log::info!(
            target: log_channels::CONNECTION,
            "[{}] send=\"{:?}\"",
            self.client_addr,
            reply_to_send
        );

        if !reply_to_send.is_error() {
            return self.send(&reply_to_send.reply(&self.config.domain)).await;
        }

        self.error_count += 1;

        let hard_error = self.config.error.hard_count;
        let soft_error = self.config.error.soft_count;

        if hard_error != -1 && self.error_count >= hard_error {
            let mut response_begin = reply_to_send.reply(&self.config.domain);
            response_begin.replace_range(3..4, "-");
            response_begin.push_str(&ReplyCode::Code451TooManyError.reply(&self.config.domain));
            self.send(&response_begin).await?;

            anyhow::bail!("too many errors")
        }

        self.send(&reply_to_send.reply(&self.config.domain)).await?;

        if soft_error != -1 && self.error_count >= soft_error {
            tokio::time::sleep(self.config.error.delay).await;
        }
        Ok(())
    }

    /// Send a buffer
    ///
    /// # Errors
    ///
    /// * internal connection writer error, or write timeout
    pub async fn send(&mut self, reply: &str) -> anyhow::Result<()> {
        log::trace!(target: log_channels::CONNECTION, "send=\"{reply:?}\"");

        self.io_stream
            .write_all(reply.as_bytes(), self.config.write_timeout)
            .await?;
        Ok(())
    }

    /// read a line from the client
    ///
    /// # Errors
    ///
    /// * timed-out
    /// * line longer than the message size limit
    /// * stream's error
    pub async fn read(&mut self) -> std::io::Result<Option<String>> {
        self.io_stream
            .next_line(self.config.read_timeout, self.config.message_size_max)
            .await
    }
}
