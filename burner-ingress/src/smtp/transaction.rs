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
use super::{code::ReplyCode, connection::Connection, event::Event, OnMail};
use crate::log_channels;
use burner_common::re::{anyhow, log};
use burner_config::ConfigSmtp;

/// State of an SMTP session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// After TCP/IP socket has been accepted
    Connect,
    /// After receiving HELO/EHLO command
    Helo,
    /// After receiving MAIL FROM command
    MailFrom,
    /// After an accepted RCPT TO command
    RcptTo,
    /// After receiving DATA command
    Data,
    /// After receiving QUIT command, or the end of the stream
    Stop,
}

/// A completed transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// argument of HELO/EHLO
    pub helo: String,
    /// reverse path, empty for bounces
    pub mail_from: String,
    /// accepted recipients, lowercased
    pub rcpt: Vec<String>,
    /// raw message, lines ended by CRLF
    pub body: String,
}

pub struct Transaction {
    state: State,
    envelope: Envelope,
    /// the body went over the size limit and is being discarded
    oversized: bool,
}

pub enum TransactionResult {
    Nothing,
    Mail(Box<Envelope>),
}

// Generated from a string received
enum ProcessedEvent {
    Nothing,
    Reply(ReplyCode),
    ReplyChangeState(State, ReplyCode),
    TransactionCompleted(Box<Envelope>),
}

impl Transaction {
    async fn parse_and_apply_and_get_reply<M: OnMail>(
        &mut self,
        config: &ConfigSmtp,
        handler: &M,
        client_message: &str,
    ) -> ProcessedEvent {
        log::trace!(
            target: log_channels::TRANSACTION,
            "buffer=\"{}\"",
            client_message
        );

        let command_or_code = if self.state == State::Data {
            Ok(Event::parse_data(client_message))
        } else {
            Event::parse_cmd(client_message)
        };

        log::trace!(
            target: log_channels::TRANSACTION,
            "parsed=\"{:?}\"",
            command_or_code
        );

        match command_or_code {
            Ok(command) => self.process_event(config, handler, command).await,
            Err(code) => ProcessedEvent::Reply(code),
        }
    }

    async fn process_event<M: OnMail>(
        &mut self,
        config: &ConfigSmtp,
        handler: &M,
        event: Event,
    ) -> ProcessedEvent {
        match (&self.state, event) {
            (_, Event::NoopCmd) => ProcessedEvent::Reply(ReplyCode::Code250),

            (_, Event::HelpCmd(_)) => ProcessedEvent::Reply(ReplyCode::Help),

            (_, Event::RsetCmd) => {
                self.reset();
                ProcessedEvent::ReplyChangeState(State::Helo, ReplyCode::Code250)
            }

            (_, Event::ExpnCmd(_) | Event::VrfyCmd(_) | Event::Unsupported) => {
                ProcessedEvent::Reply(ReplyCode::Code502Unimplemented)
            }

            (_, Event::QuitCmd) => ProcessedEvent::ReplyChangeState(State::Stop, ReplyCode::Code221),

            (_, Event::HeloCmd(helo)) => {
                self.set_helo(helo);
                ProcessedEvent::ReplyChangeState(State::Helo, ReplyCode::Code250)
            }

            (_, Event::EhloCmd(helo)) => {
                self.set_helo(helo);
                ProcessedEvent::ReplyChangeState(State::Helo, ReplyCode::Code250Esmtp)
            }

            (State::Helo, Event::MailCmd(mail_from)) => {
                self.reset();
                self.envelope.mail_from = mail_from;

                log::trace!(
                    target: log_channels::TRANSACTION,
                    "envelop=\"{:?}\"",
                    self.envelope,
                );
                ProcessedEvent::ReplyChangeState(State::MailFrom, ReplyCode::Code250)
            }

            (State::MailFrom | State::RcptTo, Event::RcptCmd(_))
                if self.envelope.rcpt.len() >= config.rcpt_count_max =>
            {
                ProcessedEvent::Reply(ReplyCode::Code452TooManyRecipients)
            }

            (State::MailFrom | State::RcptTo, Event::RcptCmd(rcpt_to)) => {
                let rcpt_to = rcpt_to.to_lowercase();

                match handler.on_rcpt(&self.envelope.mail_from, &rcpt_to).await {
                    ReplyCode::Code250 => {
                        if !self.envelope.rcpt.contains(&rcpt_to) {
                            self.envelope.rcpt.push(rcpt_to);
                        }
                        ProcessedEvent::ReplyChangeState(State::RcptTo, ReplyCode::Code250)
                    }
                    denied => ProcessedEvent::Reply(denied),
                }
            }

            (State::RcptTo, Event::DataCmd) => {
                self.envelope.body.clear();
                self.oversized = false;
                ProcessedEvent::ReplyChangeState(State::Data, ReplyCode::Code354)
            }

            (State::Data, Event::DataLine(line)) => {
                if !self.oversized {
                    if self.envelope.body.len() + line.len() + 2 > config.message_size_max {
                        self.oversized = true;
                        self.envelope.body = String::new();
                    } else {
                        self.envelope.body.push_str(&line);
                        self.envelope.body.push_str("\r\n");
                    }
                }
                ProcessedEvent::Nothing
            }

            (State::Data, Event::DataEnd) if self.oversized => {
                self.reset();
                ProcessedEvent::ReplyChangeState(State::Helo, ReplyCode::Code552)
            }

            (State::Data, Event::DataEnd) => {
                let mut output = Envelope {
                    helo: self.envelope.helo.clone(),
                    ..Envelope::default()
                };
                std::mem::swap(&mut self.envelope, &mut output);

                ProcessedEvent::TransactionCompleted(Box::new(output))
            }

            _ => ProcessedEvent::Reply(ReplyCode::Code503),
        }
    }

    fn set_helo(&mut self, helo: String) {
        self.reset();
        self.envelope.helo = helo;
    }

    fn reset(&mut self) {
        self.envelope.mail_from.clear();
        self.envelope.rcpt.clear();
        self.envelope.body = String::new();
        self.oversized = false;
    }
}

impl Transaction {
    /// Drive the session until a message is received or the session ends.
    pub async fn receive<S, M>(
        conn: &mut Connection<S>,
        helo_domain: &Option<String>,
        handler: &M,
    ) -> anyhow::Result<TransactionResult>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin,
        M: OnMail,
    {
        let mut transaction = Self {
            state: if helo_domain.is_none() {
                State::Connect
            } else {
                State::Helo
            },
            envelope: Envelope {
                helo: helo_domain.clone().unwrap_or_default(),
                ..Envelope::default()
            },
            oversized: false,
        };

        loop {
            if transaction.state == State::Stop {
                conn.is_alive = false;
                return Ok(TransactionResult::Nothing);
            }

            match conn.read().await {
                Ok(Some(client_message)) => {
                    let config = conn.config.clone();
                    match transaction
                        .parse_and_apply_and_get_reply(&config, handler, &client_message)
                        .await
                    {
                        ProcessedEvent::Nothing => {}
                        ProcessedEvent::Reply(reply_to_send) => {
                            conn.send_code(reply_to_send).await?;
                        }
                        ProcessedEvent::ReplyChangeState(new_state, reply_to_send) => {
                            log::info!(
                                target: log_channels::TRANSACTION,
                                "================ STATE: /{:?}/ => /{:?}/",
                                transaction.state,
                                new_state
                            );
                            transaction.state = new_state;
                            conn.send_code(reply_to_send).await?;
                        }
                        ProcessedEvent::TransactionCompleted(mail) => {
                            return Ok(TransactionResult::Mail(mail));
                        }
                    }
                }
                Ok(None) => {
                    log::info!(target: log_channels::TRANSACTION, "eof");
                    transaction.state = State::Stop;
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    conn.send_code(ReplyCode::Code451Timeout).await?;
                    anyhow::bail!(e)
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    conn.send_code(if transaction.state == State::Data {
                        ReplyCode::Code552
                    } else {
                        ReplyCode::Code500
                    })
                    .await?;
                    anyhow::bail!(e)
                }
                Err(e) => anyhow::bail!(e),
            }
        }
    }
}
