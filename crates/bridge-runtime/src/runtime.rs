//! Wiring and lifecycle of the running bridge.

use crate::config::RuntimeConfig;
use crate::identity::LocalIdentity;
use anyhow::{Context, Result};
use mb_01_lifecycle::{
    BridgeApi, BridgeService, FileStateStore, LoopbackTransport, SystemTimeSource,
};
use mb_02_api_gateway::{ApiGatewayService, GatewayError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

type GatewayJoin = Result<Result<(), GatewayError>, tokio::task::JoinError>;

/// Time given to spawned tasks after the shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The running bridge: service, transport and the shutdown channel.
pub struct BridgeRuntime {
    config: RuntimeConfig,
    identity: LocalIdentity,
    transport: Arc<LoopbackTransport>,
    service: Arc<BridgeService>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl BridgeRuntime {
    /// Build every component. Nothing runs until [`run`](Self::run).
    pub async fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let identity = LocalIdentity::load_or_create(&config.identity_path())?;
        let store = FileStateStore::open(&config.data_dir)
            .with_context(|| format!("opening state in {}", config.data_dir.display()))?;

        warn!("No mesh stack linked in; running on the loopback transport");
        let transport = Arc::new(LoopbackTransport::new(identity.address()));
        transport.learn_identity(identity.address(), identity.public_identity());

        let service = Arc::new(BridgeService::new(
            transport.clone(),
            transport.clone(),
            Arc::new(store),
            Arc::new(SystemTimeSource),
            config.lifecycle.clone(),
        ));

        if config.announce_immediately {
            info!("Clearing persisted announce deadline");
            service
                .throttler()
                .reset()
                .await
                .context("resetting announce deadline")?;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            identity,
            transport,
            service,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn service(&self) -> Arc<BridgeService> {
        Arc::clone(&self.service)
    }

    pub fn transport(&self) -> Arc<LoopbackTransport> {
        Arc::clone(&self.transport)
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Run the dispatcher and the gateway until `stop` resolves or the
    /// gateway fails.
    pub async fn run<F>(self, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("===========================================");
        info!("  Mesh Bridge v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            name = %self.config.lifecycle.display_name,
            address = %self.identity.address().pretty(),
            data_dir = %self.config.data_dir.display(),
            "Bridge identity"
        );

        let dispatcher = self.service.dispatcher();
        let dispatcher_handle = tokio::spawn(dispatcher.run(self.shutdown_rx.clone()));

        let bridge: Arc<dyn BridgeApi> = self.service.clone();
        let gateway = ApiGatewayService::new(
            self.config.gateway.clone(),
            bridge,
            self.shutdown_rx.clone(),
        )?;
        let mut gateway_handle = tokio::spawn(async move { gateway.start().await });

        let mut gateway_result = None;
        tokio::select! {
            _ = stop => info!("Stop signal received"),
            joined = &mut gateway_handle => gateway_result = Some(joined),
        }

        self.shutdown(dispatcher_handle, gateway_handle, gateway_result)
            .await
    }

    async fn shutdown(
        &self,
        dispatcher: JoinHandle<()>,
        gateway: JoinHandle<Result<(), GatewayError>>,
        finished: Option<GatewayJoin>,
    ) -> Result<()> {
        info!("Initiating graceful shutdown...");
        if self.shutdown_tx.send(true).is_err() {
            error!("Failed to send shutdown signal");
        }

        let gateway_result = match finished {
            Some(result) => result,
            None => match tokio::time::timeout(SHUTDOWN_GRACE, gateway).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Gateway did not stop in time");
                    Ok(Ok(()))
                }
            },
        };

        if tokio::time::timeout(SHUTDOWN_GRACE, dispatcher).await.is_err() {
            warn!("Dispatcher did not stop in time");
        }

        let bus = self.service.bus().stats();
        info!(
            pending = self.service.queue().depth(),
            received = bus.received,
            duplicates = bus.duplicates,
            delivered = bus.delivered,
            dropped_subscribers = bus.dropped_subscribers,
            "Shutdown complete"
        );

        gateway_result
            .context("gateway task panicked")?
            .context("gateway stopped with an error")
    }
}
