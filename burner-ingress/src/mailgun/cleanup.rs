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
use super::api::RouteApi;
use crate::log_channels;
use burner_common::re::{anyhow, log};

const PAGE_SIZE: usize = 100;
const PERIOD: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Delete the routes whose description holds an expiry before `now`.
///
/// Routes without a numeric description were not created by this service and are kept.
///
/// # Errors
///
/// * the routes cannot be listed
pub async fn remove_expired_routes(api: &dyn RouteApi, now: i64) -> anyhow::Result<usize> {
    let mut expired = vec![];
    let mut skip = 0;

    loop {
        let page = api.list_routes(skip, PAGE_SIZE).await?;
        let listed = page.items.len();

        expired.extend(
            page.items
                .into_iter()
                .filter(|route| {
                    route
                        .description
                        .trim()
                        .parse::<i64>()
                        .is_ok_and(|ttl| ttl < now)
                })
                .map(|route| route.id),
        );

        skip += listed;
        if listed < PAGE_SIZE || skip >= page.total_count {
            break;
        }
    }

    let mut removed = 0;
    for id in expired {
        match api.delete_route(&id).await {
            Ok(()) => removed += 1,
            Err(error) => log::warn!(target: log_channels::MAILGUN, "{error:#}"),
        }
    }
    Ok(removed)
}

/// Run [`remove_expired_routes`] every hour.
pub fn spawn(api: std::sync::Arc<dyn RouteApi>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PERIOD);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await;

        loop {
            interval.tick().await;

            match remove_expired_routes(api.as_ref(), burner_common::now()).await {
                Ok(removed) => log::info!(
                    target: log_channels::MAILGUN,
                    "{removed} expired routes removed"
                ),
                Err(error) => log::error!(
                    target: log_channels::MAILGUN,
                    "route cleanup failed: {error:#}"
                ),
            }
        }
    })
}
