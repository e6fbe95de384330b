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
use crate::config::{
    Config, ConfigDatabase, ConfigIngress, ConfigLogs, ConfigServer, ConfigSmtp, ConfigSmtpError,
    DatabaseKind, IngressKind,
};
use burner_common::re::log;

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ConfigServer::default(),
            database: ConfigDatabase::default(),
            ingress: ConfigIngress::default(),
            blacklisted_domains: vec![],
            logs: ConfigLogs::default(),
        }
    }
}

impl Default for ConfigServer {
    fn default() -> Self {
        Self {
            key: String::default(),
            website_url: String::default(),
            static_url: String::default(),
            static_dir: Self::default_static_dir(),
            domains: vec![],
            developing: false,
            lambda: false,
            restore_real_ip: false,
            real_ip_header: Self::default_real_ip_header(),
            http_addr: Self::default_http_addr(),
            refresh_interval: None,
        }
    }
}

impl ConfigServer {
    pub(crate) fn default_static_dir() -> std::path::PathBuf {
        std::path::PathBuf::from("static")
    }

    pub(crate) fn default_real_ip_header() -> String {
        "X-Forwarded-For".to_string()
    }

    pub(crate) fn default_http_addr() -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], 8080))
    }
}

impl Default for ConfigDatabase {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            url: None,
            dynamo_table: None,
        }
    }
}

impl ConfigDatabase {
    pub(crate) const fn default_kind() -> DatabaseKind {
        DatabaseKind::Memory
    }
}

impl Default for ConfigIngress {
    fn default() -> Self {
        Self {
            kind: Self::default_kind(),
            smtp: ConfigSmtp::default(),
            mailgun: None,
        }
    }
}

impl ConfigIngress {
    pub(crate) const fn default_kind() -> IngressKind {
        IngressKind::Smtp
    }
}

impl Default for ConfigSmtp {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            domain: Self::hostname(),
            read_timeout: Self::default_timeout(),
            write_timeout: Self::default_timeout(),
            message_size_max: Self::default_message_size_max(),
            rcpt_count_max: Self::default_rcpt_count_max(),
            client_count_max: Self::default_client_count_max(),
            error: ConfigSmtpError::default(),
        }
    }
}

impl ConfigSmtp {
    pub(crate) fn default_addr() -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], 25))
    }

    pub(crate) fn hostname() -> String {
        hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string())
    }

    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(20)
    }

    pub(crate) const fn default_message_size_max() -> usize {
        5 * 1024 * 1024
    }

    pub(crate) const fn default_rcpt_count_max() -> usize {
        50
    }

    pub(crate) const fn default_client_count_max() -> i64 {
        64
    }
}

impl Default for ConfigSmtpError {
    fn default() -> Self {
        Self {
            soft_count: 5,
            hard_count: 10,
            delay: std::time::Duration::from_millis(1000),
        }
    }
}

impl Default for ConfigLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            format: Self::default_format(),
            level: Self::default_level(),
        }
    }
}

impl ConfigLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        std::path::PathBuf::from_iter(["/", "var", "log", "burner", "burner.log"])
    }

    pub(crate) fn default_format() -> String {
        "{d} {l} - {m}{n}".to_string()
    }

    pub(crate) fn default_level() -> std::collections::BTreeMap<String, log::LevelFilter> {
        std::collections::BTreeMap::from([("default".to_string(), log::LevelFilter::Warn)])
    }
}
