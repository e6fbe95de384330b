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
use super::{handle_connection, Connection, Envelope, OnMail, ReplyCode, StorageMailHandler};
use burner_common::{
    re::{anyhow, async_trait},
    storage::Database,
    Blacklist, Inbox,
};
use burner_config::ConfigSmtp;
use burner_storage::InMemory;

/// A type implementing AsyncRead + AsyncWrite to emulate sockets
pub struct Mock {
    read_cursor: std::io::Cursor<Vec<u8>>,
    pub written: Vec<u8>,
}

impl Mock {
    pub fn new(read: Vec<u8>) -> Self {
        Self {
            read_cursor: std::io::Cursor::new(read),
            written: Vec::new(),
        }
    }
}

impl tokio::io::AsyncRead for Mock {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.get_mut().read_cursor).poll_read(cx, buf)
    }
}

impl tokio::io::AsyncWrite for Mock {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::pin::Pin::new(&mut self.get_mut().written).poll_write(cx, buf)
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::task::Poll::Ready(Ok(()))
    }
}

/// used for testing, accepts every recipient and every message.
pub struct DefaultMailHandler;

#[async_trait::async_trait]
impl OnMail for DefaultMailHandler {
    async fn on_rcpt(&self, _: &str, _: &str) -> ReplyCode {
        ReplyCode::Code250
    }

    async fn on_mail(&self, _: Box<Envelope>) -> ReplyCode {
        ReplyCode::Code250
    }
}

pub fn local_test() -> ConfigSmtp {
    let mut config = ConfigSmtp {
        domain: "testserver.com".to_string(),
        ..ConfigSmtp::default()
    };
    config.error.soft_count = -1;
    config
}

/// run a connection and assert output produced by the receiver and @expected_output
pub async fn test_receiver_inner<M: OnMail>(
    mail_handler: &M,
    smtp_input: &[u8],
    expected_output: &[u8],
    config: ConfigSmtp,
) -> anyhow::Result<()> {
    let mut conn = Connection::new(
        "127.0.0.1:0".parse().unwrap(),
        std::sync::Arc::new(config),
        Mock::new(smtp_input.to_vec()),
    );

    let result = handle_connection(&mut conn, mail_handler).await;

    pretty_assertions::assert_eq!(
        std::str::from_utf8(expected_output),
        std::str::from_utf8(&conn.io_stream.inner.written),
    );

    result
}

macro_rules! test_receiver {
    ($input:expr, $output:expr) => {
        test_receiver! {
            on_mail => &DefaultMailHandler,
            with_config => local_test(),
            $input,
            $output
        }
    };
    (on_mail => $handler:expr, $input:expr, $output:expr) => {
        test_receiver! {
            on_mail => $handler,
            with_config => local_test(),
            $input,
            $output
        }
    };
    (with_config => $config:expr, $input:expr, $output:expr) => {
        test_receiver! {
            on_mail => &DefaultMailHandler,
            with_config => $config,
            $input,
            $output
        }
    };
    (on_mail => $handler:expr, with_config => $config:expr, $input:expr, $output:expr) => {
        test_receiver_inner($handler, $input.as_bytes(), $output.as_bytes(), $config).await
    };
}

async fn storage_with(address: &str) -> (std::sync::Arc<InMemory>, Inbox) {
    let storage = std::sync::Arc::new(InMemory::new());
    let inbox = Inbox::new(address.to_string(), "127.0.0.1".to_string(), burner_common::now());
    storage.save_new_inbox(&inbox).await.unwrap();
    (storage, inbox)
}

fn handler(storage: std::sync::Arc<InMemory>, blacklist: &[&str]) -> StorageMailHandler {
    StorageMailHandler::new(storage, std::sync::Arc::new(Blacklist::new(blacklist)))
}

// see https://datatracker.ietf.org/doc/html/rfc5321#section-4.3.2

#[tokio::test]
async fn test_receiver_1() {
    assert!(test_receiver! {
        [
            "HELO foobar\r\n",
            "MAIL FROM:<john@doe>\r\n",
            "RCPT TO:<aa@bb>\r\n",
            "DATA\r\n",
            ".\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn test_receiver_2() {
    assert!(test_receiver! {
        ["foo\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "501 Syntax error in parameters or arguments\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn ehlo() {
    assert!(test_receiver! {
        ["EHLO foobar\r\n", "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250-testserver.com\r\n",
            "250-8BITMIME\r\n",
            "250 SMTPUTF8\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn unimplemented_and_bad_sequence() {
    assert!(test_receiver! {
        [
            "HELO foobar\r\n",
            "VRFY john\r\n",
            "STARTTLS\r\n",
            "DATA\r\n",
            "MAIL FROM:<john@doe>\r\n",
            "DATA\r\n",
            "NOOP\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "502 Command not implemented\r\n",
            "502 Command not implemented\r\n",
            "503 Bad sequence of commands\r\n",
            "250 Ok\r\n",
            "503 Bad sequence of commands\r\n",
            "250 Ok\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn rset_clears_the_envelope() {
    assert!(test_receiver! {
        [
            "HELO foobar\r\n",
            "MAIL FROM:<john@doe>\r\n",
            "RCPT TO:<aa@bb>\r\n",
            "RSET\r\n",
            "DATA\r\n",
            "MAIL FROM:<john@doe>\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "503 Bad sequence of commands\r\n",
            "250 Ok\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn too_many_errors() {
    let mut config = local_test();
    config.error.hard_count = 3;

    assert!(test_receiver! {
        with_config => config,
        ["foo\r\n", "foo\r\n", "foo\r\n", "QUIT\r\n"].concat(),
        [
            "220 testserver.com Service ready\r\n",
            "501 Syntax error in parameters or arguments\r\n",
            "501 Syntax error in parameters or arguments\r\n",
            "501-Syntax error in parameters or arguments\r\n",
            "451 Too many errors from the client\r\n",
        ]
        .concat()
    }
    .is_err());
}

#[tokio::test]
async fn too_many_recipients() {
    let mut config = local_test();
    config.rcpt_count_max = 1;

    assert!(test_receiver! {
        with_config => config,
        [
            "HELO foobar\r\n",
            "MAIL FROM:<john@doe>\r\n",
            "RCPT TO:<aa@bb>\r\n",
            "RCPT TO:<cc@dd>\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "452 Requested action not taken: too many recipients\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn message_too_big() {
    let mut config = local_test();
    config.message_size_max = 30;

    assert!(test_receiver! {
        with_config => config,
        [
            "HELO foobar\r\n",
            "MAIL FROM:<john@doe>\r\n",
            "RCPT TO:<aa@bb>\r\n",
            "DATA\r\n",
            "0123456789\r\n",
            "0123456789\r\n",
            "0123456789\r\n",
            ".\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "552 5.3.4 Message size exceeds fixed maximum message size\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn unknown_recipient() {
    let (storage, _) = storage_with("test@example.com").await;

    assert!(test_receiver! {
        on_mail => &handler(storage, &[]),
        [
            "HELO foobar\r\n",
            "MAIL FROM:<x@y>\r\n",
            "RCPT TO:<notknown@example.com>\r\n",
            "RCPT TO:<test@example.com>\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "550 5.1.1 Bad destination mailbox address\r\n",
            "250 Ok\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn blacklisted_sender() {
    let (storage, _) = storage_with("test@example.com").await;

    assert!(test_receiver! {
        on_mail => &handler(storage, &["spam.com"]),
        [
            "HELO foobar\r\n",
            "MAIL FROM:<bob@mail.spam.com>\r\n",
            "RCPT TO:<test@example.com>\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "550 5.7.1 Sender domain is blacklisted\r\n",
        ]
        .concat()
    }
    .is_ok());
}

#[tokio::test]
async fn stored_for_the_recipient() {
    let (storage, inbox) = storage_with("test@example.com").await;

    assert!(test_receiver! {
        on_mail => &handler(storage.clone(), &[]),
        [
            "HELO foobar\r\n",
            "MAIL FROM:<bob@example.com>\r\n",
            "RCPT TO:<Test@Example.com>\r\n",
            "DATA\r\n",
            "From: bob@example.com\r\n",
            "Subject: discount Gophers!\r\n",
            "\r\n",
            "This is the email body.\r\n",
            ".\r\n",
            "QUIT\r\n",
        ]
        .concat(),
        [
            "220 testserver.com Service ready\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "250 Ok\r\n",
            "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
            "250 Ok\r\n",
            "221 Service closing transmission channel\r\n",
        ]
        .concat()
    }
    .is_ok());

    let messages = storage.get_messages_by_inbox_id(&inbox.id).await.unwrap();
    assert_eq!(messages.len(), 1);

    let message = &messages[0];
    assert_eq!(message.sender, "bob@example.com");
    assert_eq!(message.from_address, "bob@example.com");
    assert_eq!(message.subject, "discount Gophers!");
    assert_eq!(message.body_plain, "This is the email body.");
    assert_eq!(message.body_html, "");
    assert_eq!(message.provider_message_id, "smtp");
    assert_eq!(message.ttl, inbox.ttl);
}

#[tokio::test]
async fn provider_serves_tcp() {
    use crate::MailProvider;

    let mut config = local_test();
    config.addr = "127.0.0.1:0".parse().unwrap();

    let provider = super::SmtpProvider::new(config);
    let (storage, _) = storage_with("test@example.com").await;
    provider
        .start(storage, std::sync::Arc::new(Blacklist::default()))
        .await
        .unwrap();

    let addr = provider.local_addr().unwrap();
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();

    let mut greetings = [0; 34];
    tokio::io::AsyncReadExt::read_exact(&mut stream, &mut greetings)
        .await
        .unwrap();
    assert_eq!(&greetings, b"220 testserver.com Service ready\r\n");

    provider.stop().await.unwrap();
    assert!(provider.local_addr().is_none());
}
