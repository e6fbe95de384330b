#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

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

use burner_common::re::{anyhow, log};

///
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ConfigServer,
    #[serde(default)]
    pub database: ConfigDatabase,
    #[serde(default)]
    pub ingress: ConfigIngress,
    /// sender domains refused by the ingress, matched as substrings
    #[serde(default)]
    pub blacklisted_domains: Vec<String>,
    #[serde(default)]
    pub logs: ConfigLogs,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigServer {
    /// secret signing the cookies and the api tokens
    #[serde(default)]
    pub key: String,
    /// public base url, used by the mail provider to reach the webhook
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub static_url: String,
    #[serde(default = "ConfigServer::default_static_dir")]
    pub static_dir: std::path::PathBuf,
    /// hosts of the generated addresses
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub developing: bool,
    /// join the route registration before answering
    #[serde(default)]
    pub lambda: bool,
    #[serde(default)]
    pub restore_real_ip: bool,
    #[serde(default = "ConfigServer::default_real_ip_header")]
    pub real_ip_header: String,
    #[serde(default = "ConfigServer::default_http_addr")]
    pub http_addr: std::net::SocketAddr,
    /// seconds between two reloads of the inbox page
    #[serde(default)]
    pub refresh_interval: Option<u64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Memory,
    Postgres,
    Sqlite3,
    Dynamo,
}

impl std::str::FromStr for DatabaseKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            "sqlite3" => Ok(Self::Sqlite3),
            "dynamo" => Ok(Self::Dynamo),
            _ => anyhow::bail!("unknown database type: '{s}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDatabase {
    #[serde(rename = "type", default = "ConfigDatabase::default_kind")]
    pub kind: DatabaseKind,
    /// connection url of the sql backends
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub dynamo_table: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngressKind {
    Smtp,
    Mailgun,
}

impl std::str::FromStr for IngressKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "mailgun" => Ok(Self::Mailgun),
            _ => anyhow::bail!("unknown ingress: '{s}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigIngress {
    #[serde(rename = "type", default = "ConfigIngress::default_kind")]
    pub kind: IngressKind,
    #[serde(default)]
    pub smtp: ConfigSmtp,
    #[serde(default)]
    pub mailgun: Option<ConfigMailgun>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSmtp {
    #[serde(default = "ConfigSmtp::default_addr")]
    pub addr: std::net::SocketAddr,
    /// name announced in the greeting
    #[serde(default = "ConfigSmtp::hostname")]
    pub domain: String,
    #[serde(with = "humantime_serde", default = "ConfigSmtp::default_timeout")]
    pub read_timeout: std::time::Duration,
    #[serde(with = "humantime_serde", default = "ConfigSmtp::default_timeout")]
    pub write_timeout: std::time::Duration,
    #[serde(default = "ConfigSmtp::default_message_size_max")]
    pub message_size_max: usize,
    #[serde(default = "ConfigSmtp::default_rcpt_count_max")]
    pub rcpt_count_max: usize,
    #[serde(default = "ConfigSmtp::default_client_count_max")]
    pub client_count_max: i64,
    #[serde(default)]
    pub error: ConfigSmtpError,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSmtpError {
    /// errors before each reply is delayed, -1 to disable
    pub soft_count: i64,
    /// errors before the connection is closed, -1 to disable
    pub hard_count: i64,
    #[serde(with = "humantime_serde")]
    pub delay: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigMailgun {
    /// api key, also signing the webhooks
    pub key: String,
    /// receiving domain, checked against the account at startup
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLogs {
    #[serde(default = "ConfigLogs::default_filepath")]
    pub filepath: std::path::PathBuf,
    #[serde(default = "ConfigLogs::default_format")]
    pub format: String,
    #[serde(default = "ConfigLogs::default_level")]
    pub level: std::collections::BTreeMap<String, log::LevelFilter>,
}
