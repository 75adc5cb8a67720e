use std::net::SocketAddr;

use anyhow::Context;
use http::HeaderValue;
use tokio::{signal, sync::watch};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use shopfloor_ops as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let data_source =
        api::datasource::from_config(&cfg).context("failed to initialize data source")?;
    info!(data_source = data_source.name(), "data source ready");

    let notifier = api::notifications::build_notifier(&cfg.notifications)
        .context("failed to initialize alert notifier")?;

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration detected; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true".into());
    };

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;
    let refresh_interval = cfg.alert_refresh_interval();

    let app_state = api::AppState::new(cfg, data_source, notifier);

    // Populate alerts before the first request arrives
    if let Err(err) = app_state.services.alerts.refresh().await {
        warn!(error = %err, "initial alert refresh failed");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = refresh_interval.map(|interval| {
        info!(interval_secs = interval.as_secs(), "starting alert poller");
        app_state
            .services
            .alerts
            .clone()
            .spawn_poller(interval, shutdown_rx)
    });

    let app = api::build_router(app_state).layer(cors_layer);

    info!("shopfloor-ops listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller {
        if let Err(err) = handle.await {
            warn!(error = %err, "alert poller did not stop cleanly");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
