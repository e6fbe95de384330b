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
use super::{wants::WantsValidate, with::Builder};
use crate::{
    config::{ConfigServer, DatabaseKind, IngressKind},
    Config,
};
use burner_common::re::anyhow;

impl Builder<WantsValidate> {
    ///
    ///
    /// # Errors
    ///
    /// * see [`Builder::ensure`]
    pub fn validate(self) -> anyhow::Result<Config> {
        let extra = self.state;
        let ingress = extra.parent;
        let database = ingress.parent;
        let domains = database.parent;
        let server = domains.parent;

        let defaults = ConfigServer::default();

        Self::ensure(Config {
            server: ConfigServer {
                key: server.key,
                website_url: server.website_url,
                static_url: server.static_url,
                domains: domains.domains,
                developing: extra.developing,
                lambda: extra.lambda,
                http_addr: extra.http_addr.unwrap_or(defaults.http_addr),
                ..defaults
            },
            database: database.database,
            ingress: ingress.ingress,
            blacklisted_domains: extra.blacklisted_domains,
            logs: extra.logs,
        })
    }

    ///
    ///
    /// # Errors
    ///
    /// * the key, the website url, the static url or the domain list is empty
    /// * a sql database has no url, a dynamo database has no table
    /// * the mailgun ingress has no key or no domain
    pub fn ensure(config: Config) -> anyhow::Result<Config> {
        anyhow::ensure!(!config.server.key.is_empty(), "the server key is required");
        anyhow::ensure!(
            !config.server.website_url.is_empty(),
            "the website url is required"
        );
        anyhow::ensure!(
            !config.server.static_url.is_empty(),
            "the static url is required"
        );
        anyhow::ensure!(
            config.server.domains.iter().any(|d| !d.trim().is_empty()),
            "at least one domain is required"
        );

        match config.database.kind {
            DatabaseKind::Memory => {}
            DatabaseKind::Postgres | DatabaseKind::Sqlite3 => anyhow::ensure!(
                config.database.url.as_ref().map_or(false, |u| !u.is_empty()),
                "the database url is required for '{:?}'",
                config.database.kind
            ),
            DatabaseKind::Dynamo => anyhow::ensure!(
                config
                    .database
                    .dynamo_table
                    .as_ref()
                    .map_or(false, |t| !t.is_empty()),
                "the dynamo table is required"
            ),
        }

        if config.ingress.kind == IngressKind::Mailgun {
            match &config.ingress.mailgun {
                Some(mailgun) if !mailgun.key.is_empty() && !mailgun.domain.is_empty() => {}
                _ => anyhow::bail!("the mailgun key and domain are required"),
            }
        }

        Ok(config)
    }
}
