//! burner common definitions

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::doc_markdown)]

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

mod address;
mod blacklist;
mod inbox;
mod message;

/// rewriting of untrusted html bodies
pub mod html;
/// storage contract shared by every backend
pub mod storage;

pub use address::{AddressError, AddressGenerator};
pub use blacklist::Blacklist;
pub use inbox::{Inbox, InboxState, INBOX_LIFETIME, ROUTE_UNREGISTERED};
pub use message::Message;

/// current unix time, in seconds.
#[must_use]
pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// re-exported module
pub mod re {
    pub use anyhow;
    pub use async_trait;
    pub use log;
    pub use serde_json;
    pub use uuid;
}
