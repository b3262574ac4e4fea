//! Broker lifecycle: Uninitialized, Running, Stopped.
//!
//! A running broker owns the endpoint registry, a dedicated tokio runtime,
//! the client listener, and the shutdown signal. Stopping discards all of
//! them; a later init constructs a fresh instance with an empty registry.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::Config;
use crate::registry::EndpointRegistry;
use crate::server;

/// Errors raised while starting a broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The dedicated runtime could not be built.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The client listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested bind address.
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A running bridge broker.
///
/// Owns the registry for the duration of the Running state; dropped, and
/// the registry with it, on stop.
pub struct CosimBroker {
    registry: Arc<EndpointRegistry>,
    shutdown: watch::Sender<bool>,
    local_addr: SocketAddr,
    runtime: tokio::runtime::Runtime,
}

impl CosimBroker {
    /// Bind the listener, start accepting clients, and transition to
    /// Running.
    ///
    /// The broker runs its accept loop and connection tasks on its own
    /// runtime so the simulator thread is never borrowed for client work.
    pub fn start(config: &Config) -> Result<Self, BrokerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("cosim-bridge")
            .enable_all()
            .build()
            .map_err(BrokerError::Runtime)?;

        let addr = config.bind_addr();
        let listener = runtime
            .block_on(TcpListener::bind(&addr))
            .map_err(|source| BrokerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| BrokerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let registry = Arc::new(EndpointRegistry::new(config.max_queue_depth));
        let (shutdown, shutdown_rx) = watch::channel(false);

        runtime.spawn(server::serve(listener, registry.clone(), shutdown_rx));
        info!(addr = %local_addr, "bridge listening for clients");

        Ok(Self {
            registry,
            shutdown,
            local_addr,
            runtime,
        })
    }

    /// The endpoint registry.
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Actual bound address (relevant when configured with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, disconnect clients, discard the registry.
    ///
    /// Parked client receives are unblocked by closing every endpoint
    /// queue; connection tasks then end and their sockets drop. The
    /// runtime is shut down in the background so the caller never blocks.
    pub fn stop(self) {
        info!(addr = %self.local_addr, "tearing down bridge");
        let _ = self.shutdown.send(true);
        self.registry.close_all();
        self.runtime.shutdown_background();
    }
}

/// Process-wide broker handle.
///
/// The write lock serializes lifecycle transitions (no double-bind race
/// between concurrent init calls); steady-state traffic takes only the
/// uncontended read lock to reach the registry.
static BROKER: RwLock<Option<CosimBroker>> = RwLock::new(None);

fn read_global() -> std::sync::RwLockReadGuard<'static, Option<CosimBroker>> {
    BROKER.read().unwrap_or_else(|e| e.into_inner())
}

fn write_global() -> std::sync::RwLockWriteGuard<'static, Option<CosimBroker>> {
    BROKER.write().unwrap_or_else(|e| e.into_inner())
}

/// Start the process-wide broker if it is not already running.
///
/// Idempotent: a second init while Running is a no-op.
pub fn global_init(config: &Config) -> Result<(), BrokerError> {
    let mut guard = write_global();
    if guard.is_none() {
        *guard = Some(CosimBroker::start(config)?);
    }
    Ok(())
}

/// Stop and discard the process-wide broker. Idempotent.
pub fn global_stop() {
    if let Some(broker) = write_global().take() {
        broker.stop();
    }
}

/// The running broker's registry, or `None` if not Running.
pub fn global_registry() -> Option<Arc<EndpointRegistry>> {
    read_global().as_ref().map(|b| b.registry().clone())
}

/// The running broker's bound address, or `None` if not Running.
pub fn global_local_addr() -> Option<SocketAddr> {
    read_global().as_ref().map(|b| b.local_addr())
}
