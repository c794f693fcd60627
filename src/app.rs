use crate::config::Config;
use crate::modules::Module;
use crate::sheets::{SheetsClient, SheetsCredentials};
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
}

impl App {
    /// Build the spreadsheet client and shared state from `config`.
    ///
    /// Missing credentials or spreadsheet ids are not fatal here; requests
    /// that need them fail with a configuration error naming the variable.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let credentials = SheetsCredentials {
            access_token: config.google_access_token.clone(),
            api_key: config.google_api_key.clone(),
        };
        if credentials.access_token.is_none() {
            if credentials.api_key.is_none() {
                warn!("neither GOOGLE_ACCESS_TOKEN nor GOOGLE_API_KEY is set, spreadsheet calls will fail");
            } else {
                warn!("GOOGLE_ACCESS_TOKEN is not set, writes will fail");
            }
        }

        let sheets = SheetsClient::new(
            &config.sheets_base_url,
            credentials,
            config.sheets_requests_per_minute,
            config.sheets_timeout,
        )
        .context("Failed to create spreadsheet client")?;

        info!(
            base_url = %config.sheets_base_url,
            requests_per_minute = config.sheets_requests_per_minute,
            timeout = fmt_duration(config.sheets_timeout),
            "spreadsheet client configured"
        );

        let configured = config.configured_modules();
        let missing: Vec<&str> = Module::ALL
            .into_iter()
            .filter(|module| !configured.contains(module))
            .map(Module::spreadsheet_env)
            .collect();
        info!(
            configured = ?configured.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
            "module spreadsheets loaded"
        );
        if !missing.is_empty() {
            warn!(missing = ?missing, "some modules have no spreadsheet configured");
        }
        if let Some(ttl) = config.cache_ttl {
            info!(ttl = fmt_duration(ttl), "dataset TTLs overridden");
        }

        let app_state = AppState::new(config.clone(), Arc::new(sheets));
        Ok(App { config, app_state })
    }

    /// Serve until SIGINT/SIGTERM, then drain for at most `SHUTDOWN_TIMEOUT`.
    pub async fn run(self) -> ExitCode {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(error = %e, address = %addr, "failed to bind");
                return ExitCode::FAILURE;
            }
        };
        info!(address = %addr, "web server listening");

        let (signalled_tx, mut signalled_rx) = tokio::sync::watch::channel(false);
        let server = axum::serve(listener, create_router(self.app_state))
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(true);
            })
            .into_future();
        let mut server = tokio::spawn(server);

        tokio::select! {
            result = &mut server => {
                return match result {
                    Ok(Ok(())) => ExitCode::SUCCESS,
                    Ok(Err(e)) => {
                        error!(error = %e, "web server failed");
                        ExitCode::FAILURE
                    }
                    Err(e) => {
                        error!(error = %e, "web server task panicked");
                        ExitCode::FAILURE
                    }
                };
            }
            _ = signalled_rx.changed() => {}
        }

        let timeout = self.config.shutdown_timeout;
        info!(timeout = fmt_duration(timeout), "draining in-flight requests");
        match tokio::time::timeout(timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("graceful shutdown complete");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = %e, "web server failed during shutdown");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = %e, "web server task panicked during shutdown");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(timeout = fmt_duration(timeout), "graceful shutdown timed out");
                ExitCode::FAILURE
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
