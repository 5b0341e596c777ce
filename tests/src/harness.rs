//! In-process bridge for end-to-end tests.
//!
//! The gateway listens on an ephemeral port. The dispatcher is not spawned;
//! tests drive it with [`TestBridge::tick`] so queue depth is deterministic.

use mb_01_lifecycle::{
    BridgeApi, BridgeService, InMemoryStateStore, LifecycleConfig, LoopbackTransport,
    ManualTimeSource, TickReport,
};
use mb_02_api_gateway::{ApiGatewayService, GatewayConfig};
use shared_types::{Address, Identity};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const LOCAL: Address = Address::from_bytes([0xaa; 16]);

/// A bridge with its gateway serving on loopback.
pub struct TestBridge {
    pub transport: Arc<LoopbackTransport>,
    pub service: Arc<BridgeService>,
    pub clock: Arc<ManualTimeSource>,
    pub addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<()>,
}

impl TestBridge {
    pub async fn start() -> Self {
        Self::start_with(LifecycleConfig::default()).await
    }

    pub async fn start_with(lifecycle: LifecycleConfig) -> Self {
        let mut gateway = GatewayConfig::default();
        gateway.websocket.poll_interval_ms = 50;
        Self::start_with_gateway(lifecycle, gateway).await
    }

    pub async fn start_with_gateway(lifecycle: LifecycleConfig, gateway: GatewayConfig) -> Self {
        let transport = Arc::new(LoopbackTransport::new(LOCAL));
        let clock = Arc::new(ManualTimeSource::new(1_000_000));
        let service = Arc::new(BridgeService::new(
            transport.clone(),
            transport.clone(),
            Arc::new(InMemoryStateStore::new()),
            clock.clone(),
            lifecycle,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let bridge: Arc<dyn BridgeApi> = service.clone();
        let gateway = ApiGatewayService::new(gateway, bridge, shutdown_rx)
            .expect("valid gateway config");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            gateway.serve(listener).await.expect("gateway serve");
        });

        Self {
            transport,
            service,
            clock,
            addr,
            shutdown_tx,
            server,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// A peer whose identity the transport can recall.
    pub fn known_peer(&self, byte: u8) -> Address {
        let address = Address::from_bytes([byte; 16]);
        self.transport
            .learn_identity(address, Identity::new(vec![byte; 32]));
        address
    }

    /// One dispatcher step.
    pub async fn tick(&self) -> TickReport {
        self.service.dispatcher().tick().await
    }

    /// Poll until the bus has `count` subscribers.
    pub async fn wait_for_subscribers(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.service.status().subscribers != count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "expected {} subscribers, have {}",
                count,
                self.service.status().subscribers
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Signal shutdown and wait for the server to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = tokio::time::timeout(Duration::from_secs(5), self.server).await;
    }

    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
