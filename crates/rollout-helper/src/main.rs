//! rollout-helper - silences alerts for nodes undergoing an OS rollout.
//!
//! Polls the cluster for nodes entering or leaving a rollout and keeps
//! Alertmanager silences in step: three silences appear when a node starts
//! rolling and are deleted once it finishes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rollout_helper::config::HelperConfig;
use rollout_helper::health::{self, Readiness};
use rollout_helper::kube::KubeClient;
use rollout_silence::{AlertmanagerClient, SilenceReconciler, SilenceRegistry};
use rollout_watch::{ClusterView, NodeSampler};

#[derive(Parser)]
#[command(name = "rollout-helper")]
#[command(about = "Silences alerts for nodes undergoing an OS rollout")]
#[command(version)]
struct Cli {
    /// Alertmanager base URL.
    #[arg(long)]
    alertmanager_url: Option<String>,

    /// Authorization header value for Alertmanager requests.
    #[arg(long, env = "ALERTMNGR_TOKEN", hide_env_values = true)]
    alertmanager_token: Option<String>,

    /// Log rollout transitions without touching Alertmanager.
    #[arg(long)]
    no_alertmanager: bool,

    /// Kubernetes API base URL. Defaults to the in-cluster environment.
    #[arg(long)]
    kube_api_url: Option<String>,

    /// Bearer token file to use with --kube-api-url.
    #[arg(long)]
    kube_token: Option<PathBuf>,

    /// Listen address for the health endpoints.
    #[arg(long, default_value = "0.0.0.0:8080")]
    health_addr: SocketAddr,

    /// Seconds between node listings.
    #[arg(long, default_value_t = 30)]
    poll_interval_secs: u64,

    /// Minutes each created silence stays active.
    #[arg(long, default_value_t = 90)]
    silence_ttl_mins: i64,
}

impl Cli {
    fn into_config(self) -> HelperConfig {
        HelperConfig {
            alertmanager_url: self.alertmanager_url,
            alertmanager_token: self.alertmanager_token,
            no_alertmanager: self.no_alertmanager,
            kube_api_url: self.kube_api_url,
            kube_token_path: self.kube_token,
            health_addr: self.health_addr,
            poll_interval_secs: self.poll_interval_secs,
            silence_ttl_mins: self.silence_ttl_mins,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("rollout_helper=info".parse()?))
        .init();

    let config = Cli::parse().into_config();
    config.validate()?;

    run(config).await
}

async fn run(config: HelperConfig) -> anyhow::Result<()> {
    info!(
        health_addr = %config.health_addr,
        poll_interval_secs = config.poll_interval_secs,
        "starting rollout-helper"
    );

    let cluster: Arc<dyn ClusterView> = match config.kube_api_url.as_deref() {
        Some(url) => Arc::new(KubeClient::with_endpoint(
            url,
            config.kube_token_path.as_deref(),
        )?),
        None => Arc::new(KubeClient::in_cluster()?),
    };

    // Bind before anything else, so a taken port fails startup.
    let listener = health::bind(config.health_addr).await?;

    let (shutdown_tx, _) = broadcast::channel(1);

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                let _ = signal_tx.send(());
            }
            Err(err) => error!(error = %err, "failed to listen for shutdown signals"),
        }
    });

    let readiness = Readiness::new();
    let mut health_shutdown = shutdown_tx.subscribe();
    let health_task = tokio::spawn(health::serve(listener, readiness.clone(), async move {
        let _ = health_shutdown.recv().await;
    }));

    let (sampler, mut events) = NodeSampler::new(Arc::clone(&cluster), config.sampler_config());

    let mut reconciler = match config.alertmanager() {
        Some((url, token)) => {
            let client = AlertmanagerClient::new(url, token)?;
            info!(url = %client.base_url(), "alertmanager integration enabled");

            let registry: Arc<dyn SilenceRegistry> = Arc::new(client);
            let mut reconciler =
                SilenceReconciler::new(registry, Arc::clone(&cluster), config.reconciler_config());
            reconciler.recover().await;
            Some(reconciler)
        }
        None => {
            info!("alertmanager integration disabled, transitions are logged only");
            None
        }
    };

    readiness.mark_ready();

    let sampler_task = tokio::spawn(sampler.run(shutdown_tx.subscribe()));

    // The sampler drops its sender when it shuts down; the loop ends once
    // the channel drains.
    while let Some(state) = events.recv().await {
        match reconciler.as_mut() {
            Some(reconciler) => {
                if let Err(err) = reconciler
                    .handle_node_state(&state.name, state.is_rolling)
                    .await
                {
                    error!(node = %state.name, error = %err, "failed to reconcile silences");
                }
            }
            None => {
                debug!(
                    node = %state.name,
                    rolling = state.is_rolling,
                    "transition observed, nothing to do"
                );
            }
        }
    }

    let _ = sampler_task.await;
    match health_task.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(error = %err, "health server error"),
        Err(err) => error!(error = %err, "health server task failed"),
    }

    info!("rollout-helper stopped");
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("received SIGINT, initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }

    Ok(())
}
