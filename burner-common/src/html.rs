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
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, Attribute, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

/// Longest body handed to the parser, in bytes.
pub const MAX_HTML_LEN: usize = 2 * 1024 * 1024;

/// Deepest element nesting handed to the parser.
pub const MAX_NESTING: usize = 512;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements closed by a sibling or by the end tag of their parent.
const IMPLIED_END: [&str; 8] = ["p", "li", "td", "th", "tr", "option", "dt", "dd"];

/// Make every `<a>` of `html` open in a new browsing context.
///
/// The input is parsed as a full html document, so the output always carries
/// the `<html>`, `<head>` and `<body>` elements. Malformed markup is repaired
/// by the parser. An empty input gives an empty output.
///
/// # Errors
///
/// * the input is longer than [`MAX_HTML_LEN`]
/// * the elements are nested deeper than [`MAX_NESTING`]
/// * the document could not be serialized back
pub fn rewrite_links(html: &str) -> anyhow::Result<String> {
    if html.is_empty() {
        return Ok(String::new());
    }
    anyhow::ensure!(
        html.len() <= MAX_HTML_LEN,
        "html body of {} bytes is too long",
        html.len()
    );
    anyhow::ensure!(
        nesting(html) <= MAX_NESTING,
        "html body is nested deeper than {MAX_NESTING} elements"
    );

    let dom = html5ever::parse_document(RcDom::default(), html5ever::ParseOpts::default())
        .one(html);
    set_blank_target(&dom.document);

    let mut out = vec![];
    serialize(
        &mut out,
        &SerializableHandle::from(dom.document.clone()),
        SerializeOpts::default(),
    )?;

    Ok(String::from_utf8(out)?)
}

/// Estimate of the element depth of `html`, without building a tree.
///
/// An end tag only closes the innermost open element (after the implied ones),
/// so misnested markup is counted deeper than the parser would build it.
fn nesting(html: &str) -> usize {
    let bytes = html.as_bytes();
    let mut open = Vec::<String>::new();
    let mut deepest = 0;
    let mut i = 0;

    while let Some(offset) = bytes[i..].iter().position(|b| *b == b'<') {
        i += offset + 1;
        match bytes.get(i) {
            Some(b'!') if bytes[i..].starts_with(b"!--") => {
                i = html[i..].find("-->").map_or(bytes.len(), |end| i + end + 3);
                continue;
            }
            Some(b'/') => {
                let name = tag_name(&bytes[i + 1..]);
                while open
                    .last()
                    .is_some_and(|top| *top != name && IMPLIED_END.contains(&top.as_str()))
                {
                    open.pop();
                }
                if open.last().is_some_and(|top| *top == name) {
                    open.pop();
                }
            }
            Some(b) if b.is_ascii_alphabetic() => {
                let name = tag_name(&bytes[i..]);
                let end = tag_end(&bytes[i..]);
                let self_closing = end > 0 && bytes.get(i + end - 1) == Some(&b'/');

                if IMPLIED_END.contains(&name.as_str()) && open.last() == Some(&name) {
                    open.pop();
                }
                if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                    open.push(name);
                    deepest = deepest.max(open.len());
                }
                i += end;
            }
            _ => {}
        }
    }

    deepest
}

fn tag_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .map(|b| char::from(b.to_ascii_lowercase()))
        .collect()
}

/// Offset of the `>` closing a tag, quoted attribute values skipped.
fn tag_end(bytes: &[u8]) -> usize {
    let mut quote = None;
    for (offset, b) in bytes.iter().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(*b),
            (Some(q), _) if q == *b => quote = None,
            (None, b'>') => return offset,
            _ => {}
        }
    }
    bytes.len()
}

fn set_blank_target(document: &Handle) {
    let mut pending = vec![document.clone()];

    while let Some(node) = pending.pop() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        {
            if name.local == local_name!("a") {
                let mut attrs = attrs.borrow_mut();
                match attrs
                    .iter_mut()
                    .find(|attr| attr.name.local == local_name!("target"))
                {
                    Some(target) => target.value = "_blank".into(),
                    None => attrs.push(Attribute {
                        name: QualName::new(None, ns!(), local_name!("target")),
                        value: "_blank".into(),
                    }),
                }
            }
        }

        pending.extend(node.children.borrow().iter().cloned());
    }
}
