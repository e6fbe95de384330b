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
// this produce just too much false positive in this file
#![allow(clippy::missing_const_for_fn)]

use super::wants::{
    WantsDatabase, WantsDomains, WantsIngress, WantsLogs, WantsServer, WantsValidate,
};
use crate::config::{
    ConfigDatabase, ConfigIngress, ConfigLogs, ConfigMailgun, ConfigSmtp, DatabaseKind,
    IngressKind,
};
use burner_common::re::log;

///
pub struct Builder<State> {
    pub(crate) state: State,
}

impl Builder<WantsServer> {
    /// secret and urls suitable for tests and local runs.
    #[must_use]
    pub fn with_debug_server(self) -> Builder<WantsDomains> {
        self.with_server(
            "debug-key-debug-key-debug-key-debug-key",
            "http://localhost:8080",
            "http://localhost:8080/static",
        )
    }

    ///
    #[must_use]
    pub fn with_server(
        self,
        key: &str,
        website_url: &str,
        static_url: &str,
    ) -> Builder<WantsDomains> {
        Builder::<WantsDomains> {
            state: WantsDomains {
                parent: self.state,
                key: key.to_string(),
                website_url: website_url.trim_end_matches('/').to_string(),
                static_url: static_url.to_string(),
            },
        }
    }
}

impl Builder<WantsDomains> {
    ///
    #[must_use]
    pub fn with_domains(self, domains: &[&str]) -> Builder<WantsDatabase> {
        Builder::<WantsDatabase> {
            state: WantsDatabase {
                parent: self.state,
                domains: domains.iter().map(ToString::to_string).collect(),
            },
        }
    }
}

impl Builder<WantsDatabase> {
    ///
    #[must_use]
    pub fn with_memory_database(self) -> Builder<WantsIngress> {
        self.with_database(ConfigDatabase::default())
    }

    /// `kind` is expected to be [`DatabaseKind::Postgres`] or [`DatabaseKind::Sqlite3`].
    #[must_use]
    pub fn with_sql_database(self, kind: DatabaseKind, url: &str) -> Builder<WantsIngress> {
        self.with_database(ConfigDatabase {
            kind,
            url: Some(url.to_string()),
            dynamo_table: None,
        })
    }

    ///
    #[must_use]
    pub fn with_dynamo_database(self, table: &str) -> Builder<WantsIngress> {
        self.with_database(ConfigDatabase {
            kind: DatabaseKind::Dynamo,
            url: None,
            dynamo_table: Some(table.to_string()),
        })
    }

    ///
    #[must_use]
    pub fn with_database(self, database: ConfigDatabase) -> Builder<WantsIngress> {
        Builder::<WantsIngress> {
            state: WantsIngress {
                parent: self.state,
                database,
            },
        }
    }
}

impl Builder<WantsIngress> {
    ///
    #[must_use]
    pub fn with_default_smtp_ingress(self) -> Builder<WantsLogs> {
        self.with_smtp_ingress(ConfigSmtp::default())
    }

    ///
    #[must_use]
    pub fn with_smtp_ingress(self, smtp: ConfigSmtp) -> Builder<WantsLogs> {
        Builder::<WantsLogs> {
            state: WantsLogs {
                parent: self.state,
                ingress: ConfigIngress {
                    kind: IngressKind::Smtp,
                    smtp,
                    mailgun: None,
                },
            },
        }
    }

    ///
    #[must_use]
    pub fn with_mailgun_ingress(self, key: &str, domain: &str) -> Builder<WantsLogs> {
        Builder::<WantsLogs> {
            state: WantsLogs {
                parent: self.state,
                ingress: ConfigIngress {
                    kind: IngressKind::Mailgun,
                    smtp: ConfigSmtp::default(),
                    mailgun: Some(ConfigMailgun {
                        key: key.to_string(),
                        domain: domain.to_string(),
                    }),
                },
            },
        }
    }
}

impl Builder<WantsLogs> {
    ///
    #[must_use]
    pub fn with_default_logs(self) -> Builder<WantsValidate> {
        self.with_logs(ConfigLogs::default())
    }

    ///
    #[must_use]
    pub fn with_logs_settings(
        self,
        filepath: impl Into<std::path::PathBuf>,
        format: &str,
        level: &[(String, log::LevelFilter)],
    ) -> Builder<WantsValidate> {
        self.with_logs(ConfigLogs {
            filepath: filepath.into(),
            format: format.to_string(),
            level: level.iter().cloned().collect(),
        })
    }

    ///
    #[must_use]
    pub fn with_logs(self, logs: ConfigLogs) -> Builder<WantsValidate> {
        Builder::<WantsValidate> {
            state: WantsValidate {
                parent: self.state,
                logs,
                blacklisted_domains: vec![],
                developing: false,
                lambda: false,
                http_addr: None,
            },
        }
    }
}

impl Builder<WantsValidate> {
    ///
    #[must_use]
    pub fn with_blacklisted_domains(mut self, domains: &[&str]) -> Self {
        self.state.blacklisted_domains = domains.iter().map(ToString::to_string).collect();
        self
    }

    ///
    #[must_use]
    pub fn with_developing(mut self, developing: bool) -> Self {
        self.state.developing = developing;
        self
    }

    /// join the route registration before answering the client.
    #[must_use]
    pub fn with_lambda(mut self, lambda: bool) -> Self {
        self.state.lambda = lambda;
        self
    }

    ///
    #[must_use]
    pub fn with_http_addr(mut self, addr: std::net::SocketAddr) -> Self {
        self.state.http_addr = Some(addr);
        self
    }
}
