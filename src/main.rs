use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use exchange_router::bootstrap::Bootstrap;
use exchange_router::config::AppConfig;
use exchange_router::control::{AccessList, Credentials};
use exchange_router::events::RouterEvent;
use exchange_router::router::api::{create_api_router, ApiState};
use exchange_router::router::{Directory, Router};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal router error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let api_addr = config.listen_addr().context("parse listen address")?;
    let credentials = config.credentials().context("parse API tokens")?;
    if credentials.is_empty() {
        warn!("no API tokens configured; every authenticated endpoint will refuse requests");
    }

    let mut directory = Directory::new(&config.native_aliases, config.wrapped_native.as_deref());
    if directory.native().wrapped.is_none() {
        warn!("wrapped native asset not configured; native exchanges disabled");
    }

    let router = Arc::new(Router::new(
        config.router_settings(),
        directory.native().clone(),
        AccessList::new(config.admins.iter().cloned()),
    ));

    if let Some(path) = &config.bootstrap_path {
        let seed = Bootstrap::from_path(path)?;
        seed.apply(&router, &mut directory, config.admins.first().map(String::as_str))
            .await
            .with_context(|| format!("apply bootstrap {}", path.display()))?;
    } else {
        warn!("no bootstrap file; routing tables start empty");
    }

    let app = App {
        config: Arc::new(config),
        router,
        directory: Some(directory),
        credentials: Some(credentials),
    };
    app.run(api_addr).await
}

struct App {
    config: Arc<AppConfig>,
    router: Arc<Router>,
    directory: Option<Directory>,
    credentials: Option<Credentials>,
}

impl App {
    async fn run(mut self, api_addr: std::net::SocketAddr) -> Result<()> {
        info!(
            admins = self.config.admins.len(),
            max_inflight = self.config.max_inflight,
            hop_timeout_ms = self.config.hop_timeout_ms,
            "exchange router online"
        );

        // Log router events as they happen
        let mut events = self.router.subscribe();
        let _event_handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RouterEvent::Exchanged {
                        caller,
                        amount_in,
                        amount_out,
                        ..
                    }) => {
                        debug!(%caller, %amount_in, %amount_out, "exchange event");
                    }
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => info!(event = %json, "router event"),
                        Err(err) => warn!(error = %err, ?event, "router event not serializable"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        // Start HTTP API server
        let directory = self.directory.take().unwrap_or_default();
        let credentials = self.credentials.take().unwrap_or_default();
        let api_router = create_api_router(ApiState::new(self.router.clone(), directory, credentials));
        let listener = tokio::net::TcpListener::bind(&api_addr)
            .await
            .with_context(|| format!("bind API server address {api_addr}"))?;

        info!(address = %api_addr, "HTTP API server starting");
        let _api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api_router).await {
                warn!(error = %e, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let exec_stats = self.router.executor().get_stats();
                    let counts = self.router.counts().await;

                    info!(
                        total_executions = exec_stats.total_executions,
                        successful = exec_stats.successful_executions,
                        failed = exec_stats.failed_executions,
                        success_rate = exec_stats.success_rate,
                        avg_execution_ms = ?exec_stats.avg_execution_time_ms,
                        major_assets = counts.major_assets,
                        major_routes = counts.major_routes,
                        minor_edges = counts.minor_edges,
                        lp_entries = counts.lp_entries,
                        adapters = counts.adapters,
                        "router heartbeat"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    self.router.shutdown();
                    break;
                }
            }
        }
        Ok(())
    }
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
