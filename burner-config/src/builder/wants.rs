#![allow(clippy::module_name_repetitions)]

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

use crate::config::{ConfigDatabase, ConfigIngress, ConfigLogs};

///
pub struct WantsServer(pub(crate) ());

///
pub struct WantsDomains {
    #[allow(dead_code)]
    pub(crate) parent: WantsServer,
    pub(super) key: String,
    pub(super) website_url: String,
    pub(super) static_url: String,
}

///
pub struct WantsDatabase {
    pub(crate) parent: WantsDomains,
    pub(super) domains: Vec<String>,
}

///
pub struct WantsIngress {
    pub(crate) parent: WantsDatabase,
    pub(super) database: ConfigDatabase,
}

///
pub struct WantsLogs {
    pub(crate) parent: WantsIngress,
    pub(super) ingress: ConfigIngress,
}

///
pub struct WantsValidate {
    pub(crate) parent: WantsLogs,
    pub(super) logs: ConfigLogs,
    pub(super) blacklisted_domains: Vec<String>,
    pub(super) developing: bool,
    pub(super) lambda: bool,
    pub(super) http_addr: Option<std::net::SocketAddr>,
}
