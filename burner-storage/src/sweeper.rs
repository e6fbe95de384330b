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
use burner_common::{re::log, storage::Database};

/// Spawn the periodic deletion of expired rows.
///
/// A failed sweep is logged and retried at the next tick.
pub(crate) fn spawn(
    target: &'static str,
    period: std::time::Duration,
    database: std::sync::Arc<dyn Database>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            match database.remove_expired(burner_common::now()).await {
                Ok(0) => log::debug!(target: target, "sweep: nothing expired"),
                Ok(count) => log::info!(target: target, "sweep: {count} expired rows removed"),
                Err(error) => log::error!(target: target, "sweep failed: {error:#}"),
            }
        }
    })
}
