use anyhow::Result;
use forecast_core::{clear_ready, init_tracing, load_config, mark_not_live, mark_ready, StartupState};
use forecast_gateway::{serve, shutdown_signal, AppState, RegistryState, ValidationPolicy};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = StartupState::new();
    let cfg = load_config("forecast-gateway")?;
    init_tracing(&cfg.service_name, &cfg.log_level)?;
    info!(?cfg, "config loaded");
    startup.advance();

    let registry = RegistryState::load(&cfg.artifact_path, cfg.artifact_sha256.as_deref());
    if !registry.is_loaded() { warn!("serving without models; /predict will answer 500 until restart"); }
    let state = AppState::new(registry, ValidationPolicy::from(&cfg));

    let addr = cfg.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    startup.advance();
    if state.registry.is_loaded() { mark_ready(); }
    info!(%addr, models = state.registry.model_count(), phases = ?startup.durations(), "forecast-gateway listening");

    let res = serve(listener, state, shutdown_signal()).await;
    clear_ready();
    if let Err(e) = &res {
        mark_not_live();
        error!(error = ?e, "server exited with error");
    }
    info!("shutdown");
    res
}
