//! # Bridge Service
//!
//! Owns the queue, the throttler and the inbound bus, and implements
//! [`BridgeApi`] for the gateway.
//!
//! ## Send Flow
//!
//! 1. Parse the destination (format and length errors stop here)
//! 2. Recall the identity; if unknown, request a path once and fail
//! 3. Build the `OutboundMessage` and enqueue it (blocking, or bounded by
//!    `enqueue_timeout_secs`)

use crate::dispatcher::Dispatcher;
use crate::domain::{AnnounceThrottler, LifecycleConfig, LifecycleError, OutboundQueue};
use crate::ports::inbound::{BridgeApi, BridgeStatus, SendRequest};
use crate::ports::outbound::{IdentityResolver, MeshTransport, StateStore, TimeSource};
use async_trait::async_trait;
use shared_bus::{BusConfig, DeliveryOutcome, InboundBus, Subscription};
use shared_types::{Address, InboundMessage, OutboundMessage};
use std::sync::Arc;
use tracing::{info, warn};

/// The bridge service.
pub struct BridgeService {
    queue: Arc<OutboundQueue>,
    throttler: Arc<AnnounceThrottler>,
    bus: Arc<InboundBus>,
    transport: Arc<dyn MeshTransport>,
    resolver: Arc<dyn IdentityResolver>,
    config: LifecycleConfig,
}

impl BridgeService {
    /// Build the service and register its bus as the transport's delivery
    /// callback.
    pub fn new(
        transport: Arc<dyn MeshTransport>,
        resolver: Arc<dyn IdentityResolver>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn TimeSource>,
        config: LifecycleConfig,
    ) -> Self {
        let queue = Arc::new(OutboundQueue::new(config.queue_capacity));
        let throttler = Arc::new(
            AnnounceThrottler::new(
                Arc::clone(&transport),
                store,
                clock,
                config.announce_interval_secs,
            )
            .with_display_name(config.display_name.clone()),
        );
        let bus = Arc::new(InboundBus::with_config(BusConfig {
            channel_capacity: config.subscriber_buffer,
            receipt_capacity: config.dedup_capacity,
        }));

        let callback_bus = Arc::clone(&bus);
        transport.register_delivery_callback(Arc::new(move |message: InboundMessage| {
            callback_bus.on_inbound_message(&message);
        }));

        info!(
            address = %transport.local_address().pretty(),
            name = %config.display_name,
            queue_capacity = queue.capacity(),
            "Bridge ready to receive"
        );

        Self {
            queue,
            throttler,
            bus,
            transport,
            resolver,
            config,
        }
    }

    /// Validate, resolve and queue one outbound message.
    pub async fn send(&self, request: SendRequest) -> Result<(), LifecycleError> {
        let address = Address::from_hex(&request.destination).map_err(|e| {
            warn!(destination = %request.destination, error = %e, "Rejected destination");
            LifecycleError::from(e)
        })?;

        let Some(identity) = self.resolver.recall(&address) else {
            warn!(
                destination = %address.pretty(),
                "Could not recall an identity, requesting a path"
            );
            if let Err(e) = self.resolver.request_path(&address).await {
                warn!(destination = %address.pretty(), error = %e, "Path request failed");
            }
            return Err(LifecycleError::IdentityUnresolved { address });
        };

        let message = OutboundMessage::new(address, identity, request.message, request.title)
            .with_method(self.config.delivery_method)
            .with_propagation_fallback(self.config.propagation_fallback);
        match self.config.enqueue_timeout() {
            Some(wait) => self.queue.enqueue_timeout(message, wait).await?,
            None => self.queue.enqueue(message).await?,
        }

        info!(
            destination = %address.pretty(),
            depth = self.queue.depth(),
            "Message queued"
        );
        Ok(())
    }

    pub fn status(&self) -> BridgeStatus {
        let local = self.transport.local_address();
        BridgeStatus {
            queue_depth: self.queue.depth(),
            queue_capacity: self.queue.capacity(),
            dedup_set_size: self.bus.dedup_len(),
            local_address: local.pretty(),
            local_hash: local.to_hex(),
            subscribers: self.bus.subscriber_count(),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Same path the transport callback takes.
    pub fn on_inbound_message(&self, message: &InboundMessage) -> DeliveryOutcome {
        self.bus.on_inbound_message(message)
    }

    /// A dispatcher sharing this service's queue and throttler.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.throttler),
            Arc::clone(&self.transport),
            self.config.dispatch_interval(),
        )
    }

    pub fn throttler(&self) -> &Arc<AnnounceThrottler> {
        &self.throttler
    }

    pub fn queue(&self) -> &Arc<OutboundQueue> {
        &self.queue
    }

    pub fn bus(&self) -> &Arc<InboundBus> {
        &self.bus
    }

    pub fn local_address(&self) -> Address {
        self.transport.local_address()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

#[async_trait]
impl BridgeApi for BridgeService {
    async fn send(&self, request: SendRequest) -> Result<(), LifecycleError> {
        BridgeService::send(self, request).await
    }

    fn status(&self) -> BridgeStatus {
        BridgeService::status(self)
    }

    fn subscribe(&self) -> Subscription {
        BridgeService::subscribe(self)
    }
}
