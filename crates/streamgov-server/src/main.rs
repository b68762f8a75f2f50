use std::collections::HashMap;
use std::env;
use std::time::Duration;

use streamgov_server::{ControlPlane, load_config, observability, reconcile_loop};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config_path, source) = resolve_config_path();
    let cfg = load_config(Some(&config_path))?;

    observability::init_tracing(&cfg.logging.level);
    tracing::info!(path = %config_path, source, clusters = cfg.governance.clusters.len(), "configuration loaded");

    // Live-cluster clients are injected by the deployment; without them the
    // control plane still serves declared state, with reconciliation idle.
    let clients = HashMap::new();
    let plane = ControlPlane::build(cfg.governance, clients);

    let interval = Duration::from_secs(cfg.reconcile.interval_secs);
    tokio::select! {
        _ = reconcile_loop::run(&plane, interval) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
    Ok(())
}

/// Config path resolution: `--config <path>`, then `STREAMGOV_CONFIG`, then
/// `streamgov.toml` next to the binary.
fn resolve_config_path() -> (String, &'static str) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, "cli");
            }
        }
    }
    if let Ok(path) = env::var("STREAMGOV_CONFIG") {
        if !path.is_empty() {
            return (path, "env");
        }
    }
    ("streamgov.toml".to_string(), "default")
}
