//! Entry point for `selective-repeat`.
//!
//! Parses CLI arguments, runs one simulation and prints the report.  All
//! protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing).

use anyhow::{bail, Context, Result};
use clap::Parser;

use selective_repeat::seq_space::{DEFAULT_MODULUS, DEFAULT_WINDOW};
use selective_repeat::simulator::{Simulator, SimulatorConfig};
use selective_repeat::timer::{TimerConfig, DEFAULT_RTT};
use selective_repeat::SeqSpace;

/// Selective-Repeat ARQ over a simulated lossy link.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of messages to simulate.
    #[arg(short, long, default_value_t = 20)]
    messages: usize,

    /// Packet loss probability.
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,

    /// Packet corruption probability.
    #[arg(short, long, default_value_t = 0.0)]
    corrupt: f64,

    /// Average time between messages from the sender's application.
    #[arg(short, long, default_value_t = 10.0)]
    interval: f64,

    /// Send/receive window size.
    #[arg(short, long, default_value_t = DEFAULT_WINDOW as usize)]
    window: usize,

    /// Sequence-number space; must be at least twice the window.
    #[arg(long, default_value_t = DEFAULT_MODULUS as usize)]
    seq_space: usize,

    /// Retransmission timeout.
    #[arg(long, default_value_t = DEFAULT_RTT)]
    rtt: f64,

    /// RNG seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Give up after this much simulated time.
    #[arg(long, default_value_t = 1_000_000.0)]
    max_time: f64,

    /// More log output (-v debug, -vv trace).  RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialise env_logger; RUST_LOG wins over -v.
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let seq = SeqSpace::new(cli.seq_space, cli.window).context("invalid sequence space")?;
    let config = SimulatorConfig {
        messages: cli.messages,
        loss_prob: cli.loss,
        corrupt_prob: cli.corrupt,
        avg_interarrival: cli.interval,
        seed: cli.seed,
        max_time: cli.max_time,
    };
    let sim = Simulator::new(config, seq, TimerConfig { rtt: cli.rtt })
        .context("invalid simulator configuration")?;

    let report = sim.run();
    println!("{report}");

    if !report.timed_out && !report.is_complete() {
        bail!("receiver output does not match the accepted messages");
    }
    Ok(())
}
