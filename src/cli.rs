//! Command line interface for the `peerlink` demo binary.
//!
//! The demo connects to an in-process echoing peer, sends one event and
//! prints every event that comes back.

use clap::Parser;

/// Command line arguments for the `peerlink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "peerlink",
    version,
    about = "Send a JSON event to a simulated peer and print the reply"
)]
pub struct Cli {
    /// Dot-separated identifier naming this session.
    #[arg(short, long, default_value = "demo.device")]
    pub identifier: String,

    /// Name of the event to send.
    #[arg(short, long, default_value = "ping")]
    pub event: String,

    /// JSON value passed as the event argument.
    #[arg(short, long)]
    pub args: Option<String>,

    /// Raise lifecycle diagnostics to INFO.
    #[arg(short, long)]
    pub verbose: bool,
}
