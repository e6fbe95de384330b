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
        log,
    },
    storage::Database,
    Blacklist,
};
use burner_config::Config;

/// Serve the service on `listener` until `shutdown` resolves.
///
/// The storage is started, then the mail provider, whose routes are merged into the
/// http router. The provider is stopped once the http server has drained.
///
/// # Errors
///
/// * the storage or the provider cannot start
/// * the http server failed
pub async fn serve(
    config: std::sync::Arc<Config>,
    storage: std::sync::Arc<dyn Database>,
    listener: tokio::net::TcpListener,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    storage.start().await.context("Cannot start the storage")?;

    let blacklist = std::sync::Arc::new(Blacklist::new(&config.blacklisted_domains));
    let provider = burner_ingress::build(&config)?;
    let provider_routes = provider
        .start(storage.clone(), blacklist)
        .await
        .context("Cannot start the mail provider")?;

    let state = burner_http::AppState::new(config.clone(), storage, provider.clone())?;
    let app = burner_http::router(state).merge(provider_routes);

    log::info!(
        target: log_channels::RUNTIME,
        "Listening for http on {}, mail ingress is '{:?}'",
        listener.local_addr()?,
        config.ingress.kind
    );

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("The http server failed");

    provider.stop().await?;
    log::info!(target: log_channels::RUNTIME, "Stopped");
    served
}

/// Start the burner runtime, until ctrl-c.
///
/// # Errors
///
/// * see [`serve`]
pub fn start_runtime(config: std::sync::Arc<Config>) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("burner")
        .build()?
        .block_on(async move {
            let storage = burner_storage::build(&config.database).await?;
            let listener = tokio::net::TcpListener::bind(config.server.http_addr)
                .await
                .with_context(|| {
                    format!("Failed to bind socket on addr: '{}'", config.server.http_addr)
                })?;

            log::info!(target: log_channels::RUNTIME, "Runtime started successfully");

            serve(config, storage, listener, async {
                if let Err(error) = tokio::signal::ctrl_c().await {
                    log::error!(target: log_channels::RUNTIME, "Cannot listen for ctrl-c: {error}");
                }
            })
            .await
        })
}
