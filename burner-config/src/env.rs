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
use crate::{Config, ConfigMailgun};
use burner_common::re::anyhow::{self, Context};

/// `1 t T TRUE true True` or `0 f F FALSE false False`.
fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => anyhow::bail!("'{value}' is not a boolean"),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Overwrite the fields named by the environment variables of `vars`.
    ///
    /// Unknown variables are ignored.
    ///
    /// # Errors
    ///
    /// * a boolean, a number or an address cannot be parsed
    pub fn with_env_overrides<K, V>(
        mut self,
        vars: impl IntoIterator<Item = (K, V)>,
    ) -> anyhow::Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut mailgun_key = None;
        let mut mailgun_domain = None;

        for (name, value) in vars {
            let (name, value) = (name.as_ref(), value.as_ref());
            let context = || format!("in environment variable '{name}'");

            match name {
                "KEY" => self.server.key = value.to_string(),
                "WEBSITE_URL" => self.server.website_url = value.to_string(),
                "STATIC_URL" => self.server.static_url = value.to_string(),
                "STATIC_DIR" => self.server.static_dir = value.into(),
                "DOMAINS" => self.server.domains = split_list(value),
                "DEVELOPING" => self.server.developing = parse_bool(value).with_context(context)?,
                "LAMBDA" => self.server.lambda = parse_bool(value).with_context(context)?,
                "RESTORE_REAL_IP" => {
                    self.server.restore_real_ip = parse_bool(value).with_context(context)?;
                }
                "REAL_IP_HEADER" => self.server.real_ip_header = value.to_string(),
                "PORT" => {
                    self.server.http_addr.set_port(value.parse().with_context(context)?);
                }
                "REFRESH_INTERVAL" => {
                    self.server.refresh_interval = Some(value.parse().with_context(context)?);
                }
                "DB_TYPE" => self.database.kind = value.parse().with_context(context)?,
                "DATABASE_URL" => self.database.url = Some(value.to_string()),
                "DYNAMO_TABLE" => self.database.dynamo_table = Some(value.to_string()),
                "INGRESS" => self.ingress.kind = value.parse().with_context(context)?,
                "SMTP_ADDR" => self.ingress.smtp.addr = value.parse().with_context(context)?,
                "SMTP_DOMAIN" => self.ingress.smtp.domain = value.to_string(),
                "MG_KEY" => mailgun_key = Some(value.to_string()),
                "MG_DOMAIN" => mailgun_domain = Some(value.to_string()),
                "BLACKLISTED_DOMAINS" => self.blacklisted_domains = split_list(value),
                _ => {}
            }
        }

        if mailgun_key.is_some() || mailgun_domain.is_some() {
            let current = self.ingress.mailgun.take();
            self.ingress.mailgun = Some(ConfigMailgun {
                key: mailgun_key
                    .or_else(|| current.as_ref().map(|c| c.key.clone()))
                    .unwrap_or_default(),
                domain: mailgun_domain
                    .or_else(|| current.map(|c| c.domain))
                    .unwrap_or_default(),
            });
        }

        Ok(self)
    }

    /// Build a configuration from the defaults and the process environment.
    ///
    /// # Errors
    ///
    /// * see [`Config::with_env_overrides`]
    /// * the resulting configuration is not valid
    pub fn from_env() -> anyhow::Result<Self> {
        crate::builder::Builder::<crate::builder::WantsValidate>::ensure(
            Self::default().with_env_overrides(std::env::vars())?,
        )
    }
}
