//! Demo binary for `peerlink`.
//!
//! Connects to an in-process echoing peer, sends one event and prints the
//! events that come back.

mod cli;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use peerlink::{
    Event,
    Session,
    SessionConfig,
    SimulatedDevice,
    SimulatedTransport,
    config::DEFAULT_SERVICE_ID,
};
use serde_json::Value;
use tokio::{sync::broadcast::error::RecvError, time::timeout};
use tracing::Level;

const REPLY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = cli::Cli::parse();
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::INFO } else { Level::WARN })
        .init();

    let args: Option<Value> = cli.args.as_deref().map(serde_json::from_str).transpose()?;
    let config = SessionConfig::builder()
        .identifier(cli.identifier)
        .verbose(cli.verbose)
        .build()?;

    let transport = Arc::new(
        SimulatedTransport::new()
            .with_device(SimulatedDevice::new("sim:echo", [DEFAULT_SERVICE_ID]).named("echo")),
    );
    transport.enable_echo(config.chunker());

    let session = Session::with_broadcast(config, transport);
    let mut events = session
        .subscribe()
        .ok_or("session has no broadcast publisher")?;

    let delivery = session.send_event(cli.event, args)?;
    let outcome = delivery.wait().await?;
    tracing::info!(?outcome, "event delivered");

    let reply = timeout(REPLY_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(Event::Message { name, data }) => return Some((name, data)),
                Ok(other) => println!("{}", other.name()),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await;

    match reply {
        Ok(Some((name, Some(data)))) => println!("{name} {data}"),
        Ok(Some((name, None))) => println!("{name}"),
        Ok(None) | Err(_) => eprintln!("no reply from peer"),
    }

    session.shutdown().await;
    Ok(())
}
