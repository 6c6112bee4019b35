use anyhow::Context;
use pulse_link::transport::{TcpConnector, TransportConnector, WebSocketConnector};
use pulse_link::{ConnectionManager, ConnectionState, ControlCommand, LinkConfig, LinkEvent};
use std::time::Duration;

use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let mut config = LinkConfig::from_env();
    if let Some(endpoint) = std::env::args().nth(1) {
        config.endpoint = endpoint;
    }

    info!("Pulse link starting");
    info!("  Endpoint: {}", config.endpoint);

    match config.endpoint.strip_prefix("tcp://") {
        Some(address) => {
            let connector = TcpConnector::new(address);
            run(config, connector).await
        }
        None => {
            let connector = WebSocketConnector::new(config.endpoint.clone());
            run(config, connector).await
        }
    }
}

async fn run<C: TransportConnector>(config: LinkConfig, connector: C) -> anyhow::Result<()> {
    let close_timeout = config.connect_timeout;
    let manager = ConnectionManager::new(config, connector);

    let _signals = manager.on_signal(|sample| {
        debug!(
            "{} t={} value={:.4} quality={:.2}",
            sample.kind, sample.timestamp, sample.value, sample.quality
        );
    });

    // Ask the device to stream every time the link comes up
    let commander = manager.clone();
    let _status = manager.on_status_change(move |state| {
        info!("Link status: {}", state);
        if *state == ConnectionState::Connected {
            if let Err(e) = commander.send_command(ControlCommand::start_acquisition()) {
                warn!("Failed to request acquisition: {}", e);
            }
        }
    });

    let _events = manager.on_event(|event| match event {
        LinkEvent::ReconnectExhausted { attempts } => {
            warn!("Giving up after {} reconnect attempts", attempts);
        }
        LinkEvent::StateChanged { .. } => {}
        other => debug!("Link event: {:?}", other),
    });

    manager.connect().context("link task is not running")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    manager.disconnect().context("link task is not running")?;
    let mut state = manager.watch_state();
    if tokio::time::timeout(
        close_timeout + Duration::from_secs(1),
        state.wait_for(|s| *s == ConnectionState::Disconnected),
    )
    .await
    .is_err()
    {
        warn!("Link did not close cleanly");
    }

    Ok(())
}
