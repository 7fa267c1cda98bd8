mod api;
mod middleware;
mod notifications;
mod scheduler;

use std::sync::Arc;

use creatorsync_sync::Components;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::{AuthState, RateLimitState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(creatorsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = creatorsync_db::PoolConfig::from_app_config(&config);
    let pool = creatorsync_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = creatorsync_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations applied");

    let components = Components::build(pool.clone(), &config)?;
    let notifier = notifications::spawn_event_log(components.events());

    let mut jobs = scheduler::build_scheduler(pool.clone(), &components, Arc::clone(&config)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        creatorsync_core::Environment::Development
    ))?;
    let app = build_app(
        AppState {
            pool,
            service: components.service.clone(),
        },
        auth,
        RateLimitState::default(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "creatorsync server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let an in-flight sync finish its current account, then stop the jobs.
    components.scheduler.request_stop();
    jobs.shutdown().await?;
    notifier.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
