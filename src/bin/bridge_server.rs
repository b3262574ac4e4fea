//! Standalone bridge server binary.
//!
//! Runs the broker without a simulator attached, pre-registering endpoints
//! from configuration. Useful for developing software clients against the
//! wire protocol.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cosim_bridge::endpoint::TypeDescriptor;
use cosim_bridge::{Config, CosimBroker};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting cosim bridge server");

    let broker = CosimBroker::start(&config)?;
    info!("Listening on {}", broker.local_addr());

    for ep in &config.endpoints {
        let registered = broker.registry().register(
            ep.id,
            TypeDescriptor::new(ep.send_type_id, ep.send_type_size),
            TypeDescriptor::new(ep.recv_type_id, ep.recv_type_size),
        );
        if !registered {
            error!("Duplicate endpoint id {} in configuration", ep.id);
        }
    }

    // Park until interrupted; the broker serves clients on its own runtime.
    let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
    ctrlc_handler(move || {
        let _ = stop_tx.send(());
    })?;
    let _ = stop_rx.recv();

    info!("Shutting down");
    broker.stop();
    Ok(())
}

/// Install a SIGINT handler without an extra dependency.
fn ctrlc_handler<F: FnMut() + Send + 'static>(
    handler: F,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("cosim-signals".to_string())
        .spawn(move || {
            let mut handler = handler;
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    handler();
                }
            });
        })?;
    Ok(())
}
