//! burner storage backends

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

mod log_channels {
    pub const MEMORY: &str = "storage::memory";
    pub const SQL: &str = "storage::sql";
    pub const DYNAMO: &str = "storage::dynamo";
}

mod dynamo;
mod memory;
mod sql;
mod sweeper;

#[cfg(test)]
mod contract;

pub use dynamo::DynamoDatabase;
pub use memory::InMemory;
pub use sql::SqlDatabase;

use burner_common::{re::anyhow, storage::Database};
use burner_config::{ConfigDatabase, DatabaseKind};

/// Instantiate the backend selected by the configuration.
///
/// The backend is not started, see [`Database::start`].
///
/// # Errors
///
/// * the url or the table required by the backend is missing
/// * the sql database cannot be reached
pub async fn build(config: &ConfigDatabase) -> anyhow::Result<std::sync::Arc<dyn Database>> {
    Ok(match config.kind {
        DatabaseKind::Memory => std::sync::Arc::new(InMemory::new()),
        DatabaseKind::Postgres | DatabaseKind::Sqlite3 => {
            let url = config
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("the database url is required"))?;
            std::sync::Arc::new(SqlDatabase::connect(&sql::normalize_url(config.kind, url)).await?)
        }
        DatabaseKind::Dynamo => {
            let table = config
                .dynamo_table
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("the dynamo table is required"))?;
            std::sync::Arc::new(DynamoDatabase::from_env(table).await)
        }
    })
}
