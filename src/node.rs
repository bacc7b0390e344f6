use crate::blockchain::Chain;
use crate::config::Config;
use crate::error::ChainError;
use crate::policy::AdminAllowList;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    Ready,
    Stopping,
}

pub struct Node {
    pub config: Config,
    pub chain: Arc<Chain>,
    pub state: Arc<RwLock<NodeState>>,
}

impl Node {
    /// Builds the chain with the configured administrators. The node starts in
    /// `Booting` until [`Node::run`] has bound its listener.
    pub fn new(config: Config) -> Self {
        let policy = AdminAllowList::with_admins(config.governance.admins.iter().cloned());
        info!(
            node_id = %config.node.node_id,
            admins = config.governance.admins.len(),
            "node.init"
        );

        Self {
            chain: Arc::new(Chain::new(Arc::new(policy))),
            state: Arc::new(RwLock::new(NodeState::Booting)),
            config,
        }
    }

    pub async fn state(&self) -> NodeState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: NodeState) {
        let mut s = self.state.write().await;
        if *s != state {
            info!(from = ?*s, to = ?state, "node.state");
            *s = state;
        }
    }

    /// Periodically cuts a block while the pool has pending transactions.
    pub fn spawn_block_scheduler(&self, interval: Duration) -> JoinHandle<()> {
        let chain = self.chain.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if chain.pool_size() == 0 {
                    continue;
                }

                match chain.cut_block() {
                    Ok(block) => info!(
                        index = block.index,
                        tx_count = block.transactions.len(),
                        "scheduler.block_cut"
                    ),
                    Err(e) => warn!(error = %e, "scheduler.cut_failed"),
                }
            }
        })
    }

    /// Starts the scheduler and API, flips to `Ready`, and runs until
    /// `shutdown` resolves.
    #[cfg(feature = "api")]
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<(), ChainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.api_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ChainError::Io(format!("API address {} unavailable: {}", addr, e)))?;

        let scheduler = self
            .config
            .block_production
            .interval_secs
            .map(|secs| self.spawn_block_scheduler(Duration::from_secs(secs)));

        let app = crate::api::build_api_router(self.clone());
        self.set_state(NodeState::Ready).await;
        info!(addr = %addr, height = self.chain.height(), "node.ready");

        let node = self.clone();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                node.set_state(NodeState::Stopping).await;
            })
            .await;

        if let Some(task) = scheduler {
            task.abort();
        }

        if let Err(e) = &served {
            error!(error = %e, "api.server_failed");
        }
        info!(height = self.chain.height(), pending = self.chain.pool_size(), "node.stopped");
        served.map_err(ChainError::from)
    }

    /// Headless variant: runs the scheduler only.
    #[cfg(not(feature = "api"))]
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<(), ChainError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scheduler = self
            .config
            .block_production
            .interval_secs
            .map(|secs| self.spawn_block_scheduler(Duration::from_secs(secs)));

        self.set_state(NodeState::Ready).await;
        shutdown.await;
        self.set_state(NodeState::Stopping).await;

        if let Some(task) = scheduler {
            task.abort();
        }
        info!(height = self.chain.height(), "node.stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "signal.ctrl_c_unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "signal.sigterm_unavailable");
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
    info!("node.shutdown_requested");
}
