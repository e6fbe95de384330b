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
use crate::log_channels;
use burner_common::{
    re::{
        anyhow::{self, Context},
        async_trait, log,
        uuid::Uuid,
    },
    storage::{Database, Error, Result},
    Inbox, Message,
};
use burner_config::DatabaseKind;
use sqlx::{any::AnyRow, Row};

const SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Timestamps and flags are stored as `BIGINT`, decoded the same way by
/// every driver behind `sqlx::Any`.
const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS inbox (
        id TEXT PRIMARY KEY,
        address TEXT NOT NULL UNIQUE,
        created_at BIGINT NOT NULL,
        created_by TEXT NOT NULL,
        ttl BIGINT NOT NULL,
        provider_route_id TEXT NOT NULL,
        failed_to_create BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS message (
        id TEXT PRIMARY KEY,
        inbox_id TEXT NOT NULL REFERENCES inbox (id) ON DELETE CASCADE,
        received_at BIGINT NOT NULL,
        provider_message_id TEXT NOT NULL,
        sender TEXT NOT NULL,
        from_name TEXT NOT NULL,
        from_address TEXT NOT NULL,
        subject TEXT NOT NULL,
        body_plain TEXT NOT NULL,
        body_html TEXT NOT NULL,
        ttl BIGINT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS message_inbox_id ON message (inbox_id)",
];

const SELECT_INBOX: &str = "SELECT id, address, created_at, created_by, ttl, provider_route_id, \
    failed_to_create FROM inbox";

const SELECT_MESSAGE: &str = "SELECT id, inbox_id, received_at, provider_message_id, sender, \
    from_name, from_address, subject, body_plain, body_html, ttl FROM message";

/// A bare path given for `sqlite3` is opened (and created) as a file.
pub(crate) fn normalize_url(kind: DatabaseKind, url: &str) -> String {
    if kind == DatabaseKind::Sqlite3 && !url.starts_with("sqlite:") {
        format!("sqlite://{url}?mode=rwc")
    } else {
        url.to_string()
    }
}

fn backend(error: sqlx::Error) -> Error {
    Error::Backend(error.into())
}

fn insert_error(error: sqlx::Error, key: &impl ToString) -> Error {
    match error.as_database_error().map(|e| e.kind()) {
        Some(sqlx::error::ErrorKind::UniqueViolation) => Error::Duplicate(key.to_string()),
        Some(sqlx::error::ErrorKind::ForeignKeyViolation) => Error::NotFound,
        _ => backend(error),
    }
}

fn uuid(row: &AnyRow, column: &str) -> anyhow::Result<Uuid> {
    let value = row.try_get::<String, _>(column)?;
    Uuid::parse_str(&value).with_context(|| format!("column '{column}' holds '{value}'"))
}

fn inbox_from_row(row: &AnyRow) -> anyhow::Result<Inbox> {
    Ok(Inbox {
        id: uuid(row, "id")?,
        address: row.try_get("address")?,
        created_at: row.try_get("created_at")?,
        created_by: row.try_get("created_by")?,
        ttl: row.try_get("ttl")?,
        provider_route_id: row.try_get("provider_route_id")?,
        failed_to_create: row.try_get::<i64, _>("failed_to_create")? != 0,
    })
}

fn message_from_row(row: &AnyRow) -> anyhow::Result<Message> {
    Ok(Message {
        id: uuid(row, "id")?,
        inbox_id: uuid(row, "inbox_id")?,
        received_at: row.try_get("received_at")?,
        provider_message_id: row.try_get("provider_message_id")?,
        sender: row.try_get("sender")?,
        from_name: row.try_get("from_name")?,
        from_address: row.try_get("from_address")?,
        subject: row.try_get("subject")?,
        body_plain: row.try_get("body_plain")?,
        body_html: row.try_get("body_html")?,
        ttl: row.try_get("ttl")?,
    })
}

/// Backend for postgres and sqlite, through the `sqlx::Any` driver.
#[derive(Debug, Clone)]
pub struct SqlDatabase {
    pool: sqlx::AnyPool,
    started: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl SqlDatabase {
    /// Open a pool on `url`, `postgres://` or `sqlite:`.
    ///
    /// # Errors
    ///
    /// * the database cannot be reached
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();

        let options = if url.starts_with("sqlite:") {
            // a single connection, kept forever, so `sqlite::memory:` stays the same database
            sqlx::any::AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            sqlx::any::AnyPoolOptions::new().max_connections(10)
        };

        let pool = options
            .connect(url)
            .await
            .context("cannot connect to the sql database")?;

        Ok(Self {
            pool,
            started: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
        })
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("while running '{statement}'"))?;
        }
        Ok(())
    }

    async fn fetch_inbox(&self, column: &str, value: &str) -> Result<Inbox> {
        let query = format!("{SELECT_INBOX} WHERE {column} = $1");
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(Error::NotFound)?;

        Ok(inbox_from_row(&row)?)
    }
}

#[async_trait::async_trait]
impl Database for SqlDatabase {
    async fn start(&self) -> anyhow::Result<()> {
        self.migrate().await?;

        if !self
            .started
            .swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            log::info!(target: log_channels::SQL, "schema ready, starting the sweeper");
            crate::sweeper::spawn(
                log_channels::SQL,
                SWEEP_PERIOD,
                std::sync::Arc::new(self.clone()),
            );
        }
        Ok(())
    }

    async fn save_new_inbox(&self, inbox: &Inbox) -> Result<()> {
        sqlx::query(
            "INSERT INTO inbox (id, address, created_at, created_by, ttl, provider_route_id, \
             failed_to_create) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(inbox.id.to_string())
        .bind(inbox.address.as_str())
        .bind(inbox.created_at)
        .bind(inbox.created_by.as_str())
        .bind(inbox.ttl)
        .bind(inbox.provider_route_id.as_str())
        .bind(i64::from(inbox.failed_to_create))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, &inbox.address))?;

        Ok(())
    }

    async fn get_inbox_by_id(&self, id: &Uuid) -> Result<Inbox> {
        self.fetch_inbox("id", &id.to_string()).await
    }

    async fn get_inbox_by_address(&self, address: &str) -> Result<Inbox> {
        self.fetch_inbox("address", address).await
    }

    async fn email_address_exists(&self, address: &str) -> Result<bool> {
        Ok(sqlx::query("SELECT id FROM inbox WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .is_some())
    }

    async fn set_inbox_created(&self, inbox: &Inbox) -> Result<()> {
        let result = sqlx::query(
            "UPDATE inbox SET failed_to_create = 0, provider_route_id = $1 WHERE id = $2",
        )
        .bind(inbox.provider_route_id.as_str())
        .bind(inbox.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn set_inbox_failed(&self, inbox: &Inbox) -> Result<()> {
        let result = sqlx::query("UPDATE inbox SET failed_to_create = 1 WHERE id = $1")
            .bind(inbox.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn save_new_message(&self, message: &Message) -> Result<()> {
        if sqlx::query("SELECT id FROM inbox WHERE id = $1")
            .bind(message.inbox_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .is_none()
        {
            return Err(Error::NotFound);
        }

        sqlx::query(
            "INSERT INTO message (id, inbox_id, received_at, provider_message_id, sender, \
             from_name, from_address, subject, body_plain, body_html, ttl) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(message.id.to_string())
        .bind(message.inbox_id.to_string())
        .bind(message.received_at)
        .bind(message.provider_message_id.as_str())
        .bind(message.sender.as_str())
        .bind(message.from_name.as_str())
        .bind(message.from_address.as_str())
        .bind(message.subject.as_str())
        .bind(message.body_plain.as_str())
        .bind(message.body_html.as_str())
        .bind(message.ttl)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, &message.id))?;

        Ok(())
    }

    async fn get_messages_by_inbox_id(&self, inbox_id: &Uuid) -> Result<Vec<Message>> {
        let query = format!("{SELECT_MESSAGE} WHERE inbox_id = $1");
        let rows = sqlx::query(&query)
            .bind(inbox_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(rows
            .iter()
            .map(message_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn get_message_by_id(&self, inbox_id: &Uuid, message_id: &Uuid) -> Result<Message> {
        let query = format!("{SELECT_MESSAGE} WHERE id = $1 AND inbox_id = $2");
        let row = sqlx::query(&query)
            .bind(message_id.to_string())
            .bind(inbox_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(Error::MessageDoesntExist)?;

        Ok(message_from_row(&row)?)
    }

    async fn remove_expired(&self, now: i64) -> anyhow::Result<u64> {
        // messages follow through the cascade
        Ok(sqlx::query("DELETE FROM inbox WHERE ttl < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }
}
