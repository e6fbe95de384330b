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
use crate::{log_channels, MailProvider};
use burner_common::{
    re::{
        anyhow::{self, Context},
        async_trait, log,
    },
    storage::Database,
    Blacklist, Inbox,
};
use burner_config::ConfigSmtp;

mod code;
mod connection;
mod event;
mod handler;
mod io;
mod server;
mod transaction;

#[cfg(test)]
pub(crate) mod tests;

pub use code::ReplyCode;
pub use connection::Connection;
pub use event::Event;
pub use handler::{StorageMailHandler, SMTP_PROVIDER_ID};
pub use io::AbstractIO;
pub use server::Server;
pub use transaction::{Envelope, State};

use transaction::{Transaction, TransactionResult};

/// Decide on the recipients and the messages of a session.
#[async_trait::async_trait]
pub trait OnMail: Send + Sync {
    /// Reply to a RCPT TO command, [`ReplyCode::Code250`] accepts the recipient.
    ///
    /// `rcpt` is lowercased, `sender` is the reverse path of the transaction.
    async fn on_rcpt(&self, sender: &str, rcpt: &str) -> ReplyCode;

    /// Reply to the end of DATA.
    async fn on_mail(&self, mail: Box<Envelope>) -> ReplyCode;
}

/// Receives the incoming mail of a connection
///
/// # Errors
///
/// * server failed to send a message
/// * the client timed out, or made too many errors
pub async fn handle_connection<S, M>(conn: &mut Connection<S>, handler: &M) -> anyhow::Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
    M: OnMail,
{
    let mut helo_domain = None;

    conn.send_code(ReplyCode::Greetings).await?;

    while conn.is_alive {
        match Transaction::receive(conn, &helo_domain, handler).await? {
            TransactionResult::Nothing => {}
            TransactionResult::Mail(mail) => {
                helo_domain = Some(mail.helo.clone());
                let reply = handler.on_mail(mail).await;
                conn.send_code(reply).await?;
            }
        }
    }

    Ok(())
}

/// address of the listener and task accepting the clients
type Running = Option<(std::net::SocketAddr, tokio::task::JoinHandle<()>)>;

/// Mail received by the service itself on an SMTP listener.
///
/// Routes are implicit: every address known to the storage is deliverable.
pub struct SmtpProvider {
    config: std::sync::Arc<ConfigSmtp>,
    running: std::sync::Mutex<Running>,
}

impl SmtpProvider {
    ///
    #[must_use]
    pub fn new(config: ConfigSmtp) -> Self {
        Self {
            config: std::sync::Arc::new(config),
            running: std::sync::Mutex::new(None),
        }
    }

    /// The address the listener is bound to, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.running
            .lock()
            .ok()
            .and_then(|running| running.as_ref().map(|(addr, _)| *addr))
    }

    fn running(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Running>> {
        self.running
            .lock()
            .map_err(|_| anyhow::anyhow!("smtp provider state poisoned"))
    }
}

#[async_trait::async_trait]
impl MailProvider for SmtpProvider {
    async fn start(
        &self,
        storage: std::sync::Arc<dyn Database>,
        blacklist: std::sync::Arc<Blacklist>,
    ) -> anyhow::Result<axum::Router> {
        let started = self.running()?.is_some();
        anyhow::ensure!(!started, "smtp listener already started");

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .with_context(|| format!("cannot bind the smtp listener on '{}'", self.config.addr))?;

        let server = Server::new(
            self.config.clone(),
            listener,
            std::sync::Arc::new(StorageMailHandler::new(storage, blacklist)),
        );
        let addr = server.addr()?;
        log::info!(target: log_channels::SERVER, "smtp listening on {addr}");

        let task = tokio::spawn(async move {
            if let Err(error) = server.listen_and_serve().await {
                log::error!(target: log_channels::SERVER, "smtp listener stopped: {error}");
            }
        });
        *self.running()? = Some((addr, task));

        Ok(axum::Router::new())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some((addr, task)) = self.running()?.take() {
            task.abort();
            log::info!(target: log_channels::SERVER, "smtp listener on {addr} stopped");
        }
        Ok(())
    }

    async fn register_route(&self, _: &Inbox) -> anyhow::Result<String> {
        Ok(SMTP_PROVIDER_ID.to_string())
    }
}
