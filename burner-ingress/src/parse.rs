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
use burner_common::re::anyhow;
use mailparse::MailHeaderMap;

/// The parts of a received message kept by the inboxes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// display name of the `From` header
    pub from_name: String,
    /// address of the `From` header
    pub from_address: String,
    /// `Subject` header
    pub subject: String,
    /// first text/plain part, without trailing line breaks
    pub body_plain: String,
    /// first text/html part
    pub body_html: String,
}

/// Split the value of a `From` header into a display name and an address.
///
/// A value that cannot be parsed is returned as the address.
#[must_use]
pub fn split_from(value: &str) -> (String, String) {
    let first = mailparse::addrparse(value)
        .ok()
        .and_then(|list| list.iter().find_map(first_single));

    first.unwrap_or_else(|| (String::new(), value.trim().to_string()))
}

fn first_single(addr: &mailparse::MailAddr) -> Option<(String, String)> {
    match addr {
        mailparse::MailAddr::Single(info) => Some((
            info.display_name.clone().unwrap_or_default(),
            info.addr.clone(),
        )),
        mailparse::MailAddr::Group(group) => group
            .addrs
            .first()
            .map(|info| (info.display_name.clone().unwrap_or_default(), info.addr.clone())),
    }
}

/// Parse a raw RFC 5322 message.
///
/// Attachments are skipped, only the first text/plain and text/html parts are kept.
///
/// # Errors
///
/// * the headers cannot be parsed
/// * a kept part cannot be decoded
pub fn parse_message(raw: &[u8]) -> anyhow::Result<ParsedMessage> {
    let mail = mailparse::parse_mail(raw)?;

    let (from_name, from_address) = mail
        .headers
        .get_first_value("From")
        .map(|from| split_from(&from))
        .unwrap_or_default();

    let mut parsed = ParsedMessage {
        from_name,
        from_address,
        subject: mail.headers.get_first_value("Subject").unwrap_or_default(),
        ..ParsedMessage::default()
    };
    collect_bodies(&mail, &mut parsed)?;

    parsed.body_plain.truncate(parsed.body_plain.trim_end_matches(['\r', '\n']).len());
    Ok(parsed)
}

fn collect_bodies(part: &mailparse::ParsedMail<'_>, out: &mut ParsedMessage) -> anyhow::Result<()> {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_bodies(sub, out)?;
        }
        return Ok(());
    }

    if matches!(
        part.get_content_disposition().disposition,
        mailparse::DispositionType::Attachment
    ) {
        return Ok(());
    }

    match part.ctype.mimetype.as_str() {
        "text/plain" if out.body_plain.is_empty() => out.body_plain = part.get_body()?,
        "text/html" if out.body_html.is_empty() => out.body_html = part.get_body()?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_header() {
        assert_eq!(
            split_from("Hayden <hayden@example.com>"),
            ("Hayden".to_string(), "hayden@example.com".to_string())
        );
        assert_eq!(
            split_from("hayden@example.com"),
            (String::new(), "hayden@example.com".to_string())
        );
        assert_eq!(
            split_from("undisclosed-recipients:;"),
            (String::new(), "undisclosed-recipients:;".to_string())
        );
    }

    #[test]
    fn plain_only() {
        let parsed = parse_message(
            [
                "From: bob@example.com\r\n",
                "Subject: discount Gophers!\r\n",
                "\r\n",
                "This is the email body.\r\n",
            ]
            .concat()
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(
            parsed,
            ParsedMessage {
                from_name: String::new(),
                from_address: "bob@example.com".to_string(),
                subject: "discount Gophers!".to_string(),
                body_plain: "This is the email body.".to_string(),
                body_html: String::new(),
            }
        );
    }

    #[test]
    fn alternative_with_attachment() {
        let parsed = parse_message(
            [
                "From: \"Bob\" <bob@example.com>\r\n",
                "Subject: hi\r\n",
                "MIME-Version: 1.0\r\n",
                "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
                "\r\n",
                "--outer\r\n",
                "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
                "\r\n",
                "--inner\r\n",
                "Content-Type: text/plain; charset=utf-8\r\n",
                "\r\n",
                "plain text\r\n",
                "--inner\r\n",
                "Content-Type: text/html; charset=utf-8\r\n",
                "\r\n",
                "<p>html text</p>\r\n",
                "--inner--\r\n",
                "--outer\r\n",
                "Content-Type: text/plain\r\n",
                "Content-Disposition: attachment; filename=\"notes.txt\"\r\n",
                "\r\n",
                "attached\r\n",
                "--outer--\r\n",
            ]
            .concat()
            .as_bytes(),
        )
        .unwrap();

        assert_eq!(parsed.from_name, "Bob");
        assert_eq!(parsed.from_address, "bob@example.com");
        assert_eq!(parsed.body_plain, "plain text");
        assert!(parsed.body_html.starts_with("<p>html text</p>"));
    }
}
