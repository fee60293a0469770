/**
 * OWL DASHBOARD - Point d'entrée du dashboard de flotte
 *
 * RÔLE : Bootstrap : config, client backend, controller, poller, HTTP.
 * Arrêt propre sur Ctrl-C : le poller est stoppé avant la fin du serveur.
 */

use anyhow::Context;
use owl_dashboard::client::HttpTelemetrySource;
use owl_dashboard::config::load_config;
use owl_dashboard::controller::DashboardController;
use owl_dashboard::health::HealthTracker;
use owl_dashboard::http::{build_router, AppState};
use owl_dashboard::poller::Poller;
use owl_dashboard::render::Renderer;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("owl_dashboard=info")),
        )
        .init();

    let cfg = load_config().await;
    info!("backend {}, polling every {} ms", cfg.backend.base_url, cfg.poll_interval_ms);

    let source = HttpTelemetrySource::new(&cfg.backend).context("invalid backend configuration")?;
    let renderer = Renderer::new(cfg.scale.cpu_max, cfg.scale.temp_max);
    let controller = DashboardController::new(renderer, HealthTracker::new());

    let poller = Poller::new(source, controller.clone());
    poller.start(cfg.poll_interval());

    let app = build_router(AppState {
        controller,
        stale_after_secs: cfg.stale_after_secs,
    });

    let listener = TcpListener::bind(cfg.listen.as_str())
        .await
        .with_context(|| format!("cannot bind {}", cfg.listen))?;
    info!("listening on http://{}", cfg.listen);

    let shutdown_poller = poller.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
            shutdown_poller.stop();
        })
        .await
        .context("http server failed")?;

    poller.stop();
    Ok(())
}
