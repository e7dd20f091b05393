use std::time::Duration;

use minicluster::ClusterConfig;
use minicluster::LocalCluster;
use minicluster::Result;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const RUNS: usize = 2;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Twice in a row: a stopped cluster must leave nothing behind that blocks the
    // next one in the same process.
    for run in 1..=RUNS {
        let mut cluster = LocalCluster::new(ClusterConfig::new(100, 3))?;
        cluster.start().await?;
        info!(
            "run {}: cluster up at {} with masters {:?}",
            run,
            cluster.home().display(),
            cluster.master_ports()
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        if let Some(leader) = cluster.leader_index() {
            info!("run {}: master-{} leads", run, leader);
        }

        let report = cluster.stop().await?;
        for warning in &report.warnings {
            warn!("run {}: {}", run, warning);
        }
    }

    println!("Exiting program.");
    Ok(())
}
