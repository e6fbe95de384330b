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
use super::code::ReplyCode;

/// Longest command line accepted, see https://datatracker.ietf.org/doc/html/rfc5321#section-4.5.3.1.4
const COMMAND_LINE_MAX: usize = 512 - "\r\n".len();

/// Commands received by the receiver.
///
/// See "Simple Mail Transfer Protocol" https://datatracker.ietf.org/doc/html/rfc5321
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// Syntax = `"HELO" SP ( Domain / address-literal ) CRLF`
    HeloCmd(String),
    /// Syntax = `"EHLO" SP ( Domain / address-literal ) CRLF`
    EhloCmd(String),
    /// Syntax = `"MAIL FROM:" Reverse-path [SP Mail-parameters] CRLF`
    ///
    /// The reverse path is empty for bounces.
    MailCmd(String),
    /// Syntax = `"RCPT TO:" Forward-path [SP Rcpt-parameters] CRLF`
    RcptCmd(String),
    /// Syntax = `"DATA" CRLF`
    DataCmd,
    /// Lines ended by CRLF sent between [`Event::DataCmd`] and [`Event::DataEnd`]
    DataLine(String),
    /// Syntax = `"." CRLF`
    DataEnd,
    /// Syntax = `"RSET" CRLF`
    RsetCmd,
    /// Syntax = `"VRFY" SP String CRLF`
    VrfyCmd(String),
    /// Syntax = `"EXPN" SP String CRLF`
    ExpnCmd(String),
    /// Syntax = `"HELP" [ SP String ] CRLF`
    HelpCmd(Option<String>),
    /// Syntax = `"NOOP" [ SP String ] CRLF`
    NoopCmd,
    /// Syntax = `"QUIT" CRLF`
    QuitCmd,
    /// STARTTLS and AUTH, recognized but never offered
    Unsupported,
}

impl Event {
    /// Create a command from a line received outside of DATA, or the reply to send on error.
    ///
    /// # Errors
    ///
    /// * the line is empty or too long (500)
    /// * the command or its arguments are not valid (501, 504)
    pub fn parse_cmd(input: &str) -> Result<Self, ReplyCode> {
        if input.len() > COMMAND_LINE_MAX || input.is_empty() {
            return Err(ReplyCode::Code500);
        }

        let words = input.split_whitespace().collect::<Vec<&str>>();

        let mut smtp_args = words.iter();
        let smtp_verb = match smtp_args.next() {
            // NOTE: whitespace before the verb
            Some(first_word) if !input.starts_with(*first_word) => {
                return Err(ReplyCode::Code501);
            }
            Some(smtp_verb) => smtp_verb,
            None => return Err(ReplyCode::Code500),
        };

        match (
            smtp_verb.to_ascii_uppercase().as_str(),
            smtp_args.as_slice(),
        ) {
            ("HELO", args) => Self::parse_domain_or_address_literal(args).map(Self::HeloCmd),
            ("EHLO", args) => Self::parse_domain_or_address_literal(args).map(Self::EhloCmd),
            ("MAIL", args) => Self::parse_arg_mail_from(args),
            ("RCPT", args) => Self::parse_arg_rcpt_to(args),

            ("VRFY", [user_or_mailbox] | [user_or_mailbox, "SMTPUTF8"]) => {
                Ok(Self::VrfyCmd((*user_or_mailbox).to_string()))
            }
            ("EXPN", [mailing_list] | [mailing_list, "SMTPUTF8"]) => {
                Ok(Self::ExpnCmd((*mailing_list).to_string()))
            }

            ("HELP", []) => Ok(Self::HelpCmd(None)),
            ("HELP", [help_value]) => Ok(Self::HelpCmd(Some((*help_value).to_string()))),

            ("DATA", []) => Ok(Self::DataCmd),
            ("QUIT", []) => Ok(Self::QuitCmd),
            ("RSET", []) => Ok(Self::RsetCmd),
            ("NOOP", [..]) => Ok(Self::NoopCmd),

            ("STARTTLS" | "AUTH", _) => Ok(Self::Unsupported),

            _ => Err(ReplyCode::Code501),
        }
    }

    fn parse_domain_or_address_literal(args: &[&str]) -> Result<String, ReplyCode> {
        match args {
            [ip] if ip.starts_with('[') && ip.ends_with(']') => ip[1..ip.len() - 1]
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.to_string())
                .map_err(|_| ReplyCode::Code501),
            [domain] => addr::parse_domain_name(domain)
                .map(|domain| domain.to_string())
                .map_err(|_| ReplyCode::Code501),
            _ => Err(ReplyCode::Code501),
        }
    }

    fn from_path(input: &str, may_be_empty: bool) -> Result<String, ReplyCode> {
        match input.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            Some("") if may_be_empty => Ok(String::new()),
            Some(mailbox) => addr::parse_email_address(mailbox)
                .map(|mailbox| mailbox.to_string())
                .map_err(|_| ReplyCode::Code501),
            None => Err(ReplyCode::Code501),
        }
    }

    /// Split `FROM:<path> params` and `FROM: <path> params`.
    fn split_path<'a>(prefix: &str, args: &[&'a str]) -> Result<(&'a str, usize), ReplyCode> {
        match args {
            [keyword, path, ..] if keyword.eq_ignore_ascii_case(prefix) => Ok((*path, 2)),
            [keyword_and_path, ..] => {
                let keyword_and_path: &'a str = *keyword_and_path;
                match keyword_and_path.get(..prefix.len()) {
                    Some(keyword)
                        if keyword.eq_ignore_ascii_case(prefix)
                            && keyword_and_path.len() > prefix.len() =>
                    {
                        Ok((&keyword_and_path[prefix.len()..], 1))
                    }
                    _ => Err(ReplyCode::Code501),
                }
            }
            [] => Err(ReplyCode::Code501),
        }
    }

    fn parse_arg_mail_from(args: &[&str]) -> Result<Self, ReplyCode> {
        let (path, consumed) = Self::split_path("FROM:", args)?;
        let path = Self::from_path(path, true)?;

        for arg in &args[consumed..] {
            let (keyword, value) = arg.split_once('=').unwrap_or((*arg, ""));
            match (keyword.to_ascii_uppercase().as_str(), value) {
                ("BODY", "7BIT" | "8BITMIME") | ("SMTPUTF8", "") | ("AUTH", _) => {}
                ("SIZE", size) if size.parse::<usize>().is_ok() => {}
                ("BODY" | "SIZE", _) => return Err(ReplyCode::Code501),
                _ => return Err(ReplyCode::Code504),
            }
        }

        Ok(Self::MailCmd(path))
    }

    fn parse_arg_rcpt_to(args: &[&str]) -> Result<Self, ReplyCode> {
        let (path, consumed) = Self::split_path("TO:", args)?;
        let path = Self::from_path(path, false)?;

        if args.len() > consumed {
            return Err(ReplyCode::Code504);
        }
        Ok(Self::RcptCmd(path))
    }

    /// Parse a line received between DATA and <CRLF>.<CRLF>, undoing the dot-stuffing.
    ///
    /// See https://www.rfc-editor.org/rfc/rfc5321#section-4.5.2
    #[must_use]
    pub fn parse_data(input: &str) -> Self {
        match input {
            "." => Self::DataEnd,
            dot_string if dot_string.starts_with('.') => Self::DataLine(dot_string[1..].to_string()),
            _ => Self::DataLine(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn helo() {
        assert_eq!(
            Event::parse_cmd("HELO foobar"),
            Ok(Event::HeloCmd("foobar".to_string()))
        );
        assert_eq!(
            Event::parse_cmd("ehlo [127.0.0.1]"),
            Ok(Event::EhloCmd("127.0.0.1".to_string()))
        );
        assert_eq!(Event::parse_cmd("HELO"), Err(ReplyCode::Code501));
        assert_eq!(Event::parse_cmd("HELO a b"), Err(ReplyCode::Code501));
        assert_eq!(Event::parse_cmd(" HELO foobar"), Err(ReplyCode::Code501));
    }

    #[test]
    fn mail_from() {
        assert_eq!(
            Event::parse_cmd("MAIL FROM:<john@doe>"),
            Ok(Event::MailCmd("john@doe".to_string()))
        );
        assert_eq!(
            Event::parse_cmd("mail from: <john@doe> BODY=8BITMIME SMTPUTF8 SIZE=1000"),
            Ok(Event::MailCmd("john@doe".to_string()))
        );
        assert_eq!(
            Event::parse_cmd("MAIL FROM:<>"),
            Ok(Event::MailCmd(String::new()))
        );
        assert_eq!(Event::parse_cmd("MAIL FROM:"), Err(ReplyCode::Code501));
        assert_eq!(Event::parse_cmd("MAIL FROM:john@doe"), Err(ReplyCode::Code501));
        assert_eq!(
            Event::parse_cmd("MAIL FROM:<john@doe> BODY=BINARYMIME"),
            Err(ReplyCode::Code501)
        );
        assert_eq!(
            Event::parse_cmd("MAIL FROM:<john@doe> RET=FULL"),
            Err(ReplyCode::Code504)
        );
    }

    #[test]
    fn rcpt_to() {
        assert_eq!(
            Event::parse_cmd("RCPT TO:<aa@bb>"),
            Ok(Event::RcptCmd("aa@bb".to_string()))
        );
        assert_eq!(
            Event::parse_cmd("RCPT TO: <aa@bb>"),
            Ok(Event::RcptCmd("aa@bb".to_string()))
        );
        assert_eq!(Event::parse_cmd("RCPT TO:<>"), Err(ReplyCode::Code501));
        assert_eq!(
            Event::parse_cmd("RCPT TO:<aa@bb> NOTIFY=NEVER"),
            Err(ReplyCode::Code504)
        );
    }

    #[test]
    fn others() {
        assert_eq!(Event::parse_cmd("DATA"), Ok(Event::DataCmd));
        assert_eq!(Event::parse_cmd("NOOP anything"), Ok(Event::NoopCmd));
        assert_eq!(Event::parse_cmd("STARTTLS"), Ok(Event::Unsupported));
        assert_eq!(Event::parse_cmd("AUTH PLAIN abc"), Ok(Event::Unsupported));
        assert_eq!(Event::parse_cmd("HELP"), Ok(Event::HelpCmd(None)));
        assert_eq!(Event::parse_cmd("foo"), Err(ReplyCode::Code501));
        assert_eq!(Event::parse_cmd(""), Err(ReplyCode::Code500));
        assert_eq!(
            Event::parse_cmd(&"NOOP ".repeat(200)),
            Err(ReplyCode::Code500)
        );
    }

    #[test]
    fn data() {
        assert_eq!(Event::parse_data("."), Event::DataEnd);
        assert_eq!(Event::parse_data(".."), Event::DataLine(".".to_string()));
        assert_eq!(
            Event::parse_data("hello"),
            Event::DataLine("hello".to_string())
        );
        assert_eq!(Event::parse_data(""), Event::DataLine(String::new()));
    }
}
