//! Periodic drift detection: one pass per interval, one sub-pass per wired
//! cluster, surfacing owned-but-undeclared resources per namespace.

use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bootstrap::ControlPlane;

/// Runs drift detection forever. Cancelled by dropping the task.
pub async fn run(plane: &ControlPlane, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_once(plane).await;
    }
}

/// One full drift-detection pass over every wired cluster.
pub async fn run_once(plane: &ControlPlane) {
    let clusters: Vec<String> = plane.reconcilers.clusters().map(str::to_string).collect();
    for cluster in clusters {
        if let Err(e) = reconcile_cluster(plane, &cluster).await {
            // A failing cluster must not starve the others; retried on the
            // next tick.
            warn!(cluster = %cluster, error = %e, "reconciliation pass failed");
        }
    }
}

async fn reconcile_cluster(
    plane: &ControlPlane,
    cluster: &str,
) -> streamgov_core::Result<()> {
    debug!(cluster, "starting reconciliation pass");

    for ns in plane.namespaces.list_all(cluster).await? {
        let topics = plane.topics.list_unsynchronized_names(&ns).await?;
        if !topics.is_empty() {
            info!(
                cluster,
                namespace = ns.name(),
                topics = ?topics,
                "unsynchronized topics detected"
            );
        }

        let connectors = plane.connectors.list_unsynchronized(&ns).await?;
        if !connectors.is_empty() {
            let names: Vec<&str> = connectors.iter().map(|c| c.name()).collect();
            info!(
                cluster,
                namespace = ns.name(),
                connectors = ?names,
                "unsynchronized connectors detected"
            );
        }
    }
    Ok(())
}
