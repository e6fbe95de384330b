//! Server side rendering of the html pages.
//!
//! Every value coming from a mail or a client is escaped. Html bodies of messages are
//! shown in a sandboxed frame, the content security policy forbids scripts anyway.

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

use burner_common::{Inbox, Message};

/// Escape `input` for an html text node or a quoted attribute.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, static_url: &str, body: &str) -> String {
    let stylesheet = if static_url.is_empty() {
        String::new()
    } else {
        format!(
            r#"<link rel="stylesheet" href="{}/css/style.css">"#,
            escape(static_url.trim_end_matches('/'))
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - burner.kiwi</title>
{stylesheet}
</head>
<body>
<header><a href="/">burner.kiwi</a></header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    match (seconds / 3600, (seconds % 3600) / 60) {
        (0, 0) => "less than a minute".to_string(),
        (0, minutes) => format!("{minutes}m"),
        (hours, minutes) => format!("{hours}h {minutes}m"),
    }
}

fn sender(message: &Message) -> String {
    match (message.from_name.as_str(), message.from_address.as_str()) {
        ("", "") => escape(&message.sender),
        ("", address) => escape(address),
        (name, address) => format!("{} &lt;{}&gt;", escape(name), escape(address)),
    }
}

/// The inbox with its messages, newest first.
#[must_use]
pub fn inbox(static_url: &str, inbox: &Inbox, messages: &[Message], now: i64) -> String {
    let list = if messages.is_empty() {
        "<p class=\"empty\">No messages yet, this page refreshes on its own.</p>".to_string()
    } else {
        let rows = messages
            .iter()
            .map(|message| {
                format!(
                    r#"<li><a href="/messages/{id}/"><span class="from">{from}</span> <span class="subject">{subject}</span> <span class="received">{ago} ago</span></a></li>"#,
                    id = message.id,
                    from = sender(message),
                    subject = escape(&message.subject),
                    ago = duration(now - message.received_at),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("<ul class=\"messages\">\n{rows}\n</ul>")
    };

    layout(
        &inbox.address,
        static_url,
        &format!(
            r#"<section class="inbox">
<h1>{address}</h1>
<p>This address expires in {expires}. <a href="/edit">Choose another</a> or <a href="/delete">forget it</a>.</p>
{list}
</section>"#,
            address = escape(&inbox.address),
            expires = duration(inbox.ttl - now),
        ),
    )
}

/// One message of the inbox.
#[must_use]
pub fn message(static_url: &str, inbox: &Inbox, message: &Message) -> String {
    let body = if message.body_html.is_empty() {
        format!("<pre class=\"plain\">{}</pre>", escape(&message.body_plain))
    } else {
        format!(
            r#"<iframe class="html" sandbox="allow-popups allow-popups-to-escape-sandbox" srcdoc="{}"></iframe>"#,
            escape(&message.body_html)
        )
    };

    layout(
        &message.subject,
        static_url,
        &format!(
            r#"<article class="message">
<p><a href="/">Back to {address}</a></p>
<h1>{subject}</h1>
<p class="from">From: {from}</p>
{body}
</article>"#,
            address = escape(&inbox.address),
            subject = escape(&message.subject),
            from = sender(message),
        ),
    )
}

/// Form choosing the local part and the host of a new address.
#[must_use]
pub fn edit(static_url: &str, hosts: &[String], error: Option<&str>) -> String {
    let options = hosts
        .iter()
        .map(|host| format!("<option value=\"{0}\">@{0}</option>", escape(host)))
        .collect::<String>();
    let error = error
        .map(|error| format!("<p class=\"error\">{}</p>", escape(error)))
        .unwrap_or_default();

    layout(
        "Choose an address",
        static_url,
        &format!(
            r#"<section class="edit">
<h1>Choose an address</h1>
{error}
<form method="post" action="/edit">
<input type="text" name="user" minlength="3" maxlength="64" pattern="[A-Za-z0-9]+" required>
<select name="host">{options}</select>
<button type="submit">Create</button>
</form>
</section>"#
        ),
    )
}

/// Confirmation before forgetting the inbox.
#[must_use]
pub fn delete(static_url: &str, inbox: &Inbox) -> String {
    layout(
        "Forget this inbox",
        static_url,
        &format!(
            r#"<section class="delete">
<h1>Forget {address}?</h1>
<p>The messages stay until the address expires, but you will not be able to come back to them.</p>
<form method="post" action="/delete">
<input type="hidden" name="really-delete" value="true">
<button type="submit">Forget it</button>
</form>
<form method="post" action="/delete">
<input type="hidden" name="really-delete" value="false">
<button type="submit">Keep it</button>
</form>
</section>"#,
            address = escape(&inbox.address),
        ),
    )
}

/// Page of a failed request.
#[must_use]
pub fn error(msg: &str) -> String {
    layout(
        "Error",
        "",
        &format!(
            "<section class=\"error\">\n<h1>Oops</h1>\n<p>{}</p>\n</section>",
            escape(msg)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escaped() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn durations() {
        assert_eq!(duration(-5), "less than a minute");
        assert_eq!(duration(59), "less than a minute");
        assert_eq!(duration(61), "1m");
        assert_eq!(duration(86_400), "24h 0m");
    }

    #[test]
    fn message_html_is_framed() {
        let inbox = Inbox::new("bobby@example.com".to_string(), String::new(), 0);
        let mut mail = Message::new(&inbox, 10);
        mail.from_name = "Hayden".to_string();
        mail.from_address = "hayden@example.com".to_string();
        mail.subject = "<script>".to_string();
        mail.body_html = "<b>hi</b>".to_string();

        let page = message("https://static.burner.kiwi/", &inbox, &mail);
        assert!(page.contains("<h1>&lt;script&gt;</h1>"));
        assert!(page.contains("Hayden &lt;hayden@example.com&gt;"));
        assert!(page.contains(r#"srcdoc="&lt;b&gt;hi&lt;/b&gt;""#));
        assert!(page.contains(r#"href="https://static.burner.kiwi/css/style.css""#));
    }
}
