// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use skyexchange_server::api::router;
use skyexchange_server::balance_poller::BalancePoller;
use skyexchange_server::config::{Config, LogFormat, DEFAULT_LOG_FILTER};
use skyexchange_server::secure::keys::public_key_hex;
use skyexchange_server::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_logging(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    init_logging(config.log_format);

    let state = AppState::from_config(config)?;
    let config = state.config.clone();
    let shutdown = CancellationToken::new();

    info!(
        server_public_key = %public_key_hex(state.server_public_key()),
        coins = ?state.gateways.coins(),
        data_dir = %config.data_dir.display(),
        "Exchange state initialized"
    );
    if config.admins.is_empty() {
        warn!("No admin keys configured; admin endpoints will refuse every caller");
    }

    let poller = config.balance_poll.map(|interval| {
        let poller = BalancePoller::new(state.clone(), interval);
        tokio::spawn(poller.run(shutdown.clone()))
    });

    let app = router(state);
    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!(error = %e, "Failed to listen for shutdown signal");
                    }
                    info!("Shutdown signal received");
                }
                _ = shutdown.cancelled() => {}
            }
            shutdown.cancel();
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    let served = match &config.tls {
        Some(tls) => {
            // The ring provider must be installed before any TLS config is built.
            if rustls::crypto::ring::default_provider()
                .install_default()
                .is_err()
            {
                warn!("A rustls crypto provider was already installed");
            }
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            info!(addr = %config.bind_addr, "Exchange listening on https (docs at /docs)");
            axum_server::bind_rustls(config.bind_addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            warn!(addr = %config.bind_addr, "TLS not configured; listening on plain http (docs at /docs)");
            axum_server::bind(config.bind_addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    shutdown.cancel();
    if let Some(poller) = poller {
        if let Err(e) = poller.await {
            error!(error = %e, "Balance poller task failed");
        }
    }

    served?;
    info!("Exchange stopped");
    Ok(())
}
