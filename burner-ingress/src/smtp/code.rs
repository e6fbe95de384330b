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
/// Replies of the receiver.
///
/// See "Simple Mail Transfer Protocol" https://datatracker.ietf.org/doc/html/rfc5321#section-4.2
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, strum::EnumIter, strum::IntoStaticStr)]
pub enum ReplyCode {
    /// help message
    Help,
    /// service ready, sent when the connection opens
    Greetings,
    /// service closing transmission channel
    Code221,
    /// requested mail action okay, completed
    Code250,
    /// reply to EHLO, with the supported extensions
    Code250Esmtp,
    /// start mail input
    Code354,
    /// requested action aborted: local error in processing
    Code451,
    /// the client did not send anything in time
    Code451Timeout,
    /// the client made too many errors, the connection is closed
    Code451TooManyError,
    /// the envelope already holds the maximum number of recipients
    Code452TooManyRecipients,
    /// syntax error, command unrecognized
    Code500,
    /// syntax error in parameters or arguments
    Code501,
    /// command not implemented
    Code502Unimplemented,
    /// bad sequence of commands
    Code503,
    /// command parameter not implemented
    Code504,
    /// no inbox for the recipient
    Code550BadMailbox,
    /// the domain of the sender is blacklisted
    Code550Blacklisted,
    /// the message exceeds the size limit
    Code552,
    /// transaction failed
    Code554,
    /// the server is already serving the maximum number of clients
    ConnectionMaxReached,
}

impl ReplyCode {
    /// Is the reply telling the client something went wrong.
    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(
            self,
            Self::Help
                | Self::Greetings
                | Self::Code221
                | Self::Code250
                | Self::Code250Esmtp
                | Self::Code354
        )
    }

    /// The reply as sent on the wire, `domain` being the name of the server.
    #[must_use]
    pub fn reply(self, domain: &str) -> String {
        match self {
            Self::Help => "214 burner.kiwi only accepts mail for its inboxes\r\n".to_string(),
            Self::Greetings => format!("220 {domain} Service ready\r\n"),
            Self::Code221 => "221 Service closing transmission channel\r\n".to_string(),
            Self::Code250 => "250 Ok\r\n".to_string(),
            Self::Code250Esmtp => format!("250-{domain}\r\n250-8BITMIME\r\n250 SMTPUTF8\r\n"),
            Self::Code354 => "354 Start mail input; end with <CRLF>.<CRLF>\r\n".to_string(),
            Self::Code451 => {
                "451 Requested action aborted: local error in processing\r\n".to_string()
            }
            Self::Code451Timeout => "451 Timeout - closing connection.\r\n".to_string(),
            Self::Code451TooManyError => "451 Too many errors from the client\r\n".to_string(),
            Self::Code452TooManyRecipients => {
                "452 Requested action not taken: too many recipients\r\n".to_string()
            }
            Self::Code500 => "500 Syntax error command unrecognized\r\n".to_string(),
            Self::Code501 => "501 Syntax error in parameters or arguments\r\n".to_string(),
            Self::Code502Unimplemented => "502 Command not implemented\r\n".to_string(),
            Self::Code503 => "503 Bad sequence of commands\r\n".to_string(),
            Self::Code504 => "504 Command parameter not implemented\r\n".to_string(),
            Self::Code550BadMailbox => "550 5.1.1 Bad destination mailbox address\r\n".to_string(),
            Self::Code550Blacklisted => "550 5.7.1 Sender domain is blacklisted\r\n".to_string(),
            Self::Code552 => {
                "552 5.3.4 Message size exceeds fixed maximum message size\r\n".to_string()
            }
            Self::Code554 => "554 Transaction failed\r\n".to_string(),
            Self::ConnectionMaxReached => "554 Cannot process connection, closing.\r\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReplyCode;

    #[test]
    fn well_formed() {
        for code in <ReplyCode as strum::IntoEnumIterator>::iter() {
            let reply = code.reply("testserver.com");
            let name: &'static str = code.into();

            assert!(reply.ends_with("\r\n"), "{name}");
            for line in reply.trim_end().split("\r\n") {
                let (number, _) = line.split_at(3);
                assert!(number.parse::<u16>().is_ok(), "{name}");
                assert_eq!(
                    number.starts_with('4') || number.starts_with('5'),
                    code.is_error(),
                    "{name}"
                );
            }
        }
    }
}
