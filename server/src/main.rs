use clap::Parser;
use log::{error, info};
use server::leaderboard::{render_scoreboard, Leaderboard, ResultAggregator};
use server::network::{Server, ServerConfig};
use server::persistence;
use server::registry::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::interval;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Monty Hall game server", long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'a', long, default_value = "0.0.0.0")]
    host: String,

    /// Port the game server listens on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Minimum delay in seconds between connections from one address
    #[arg(short, long, default_value = "1.0")]
    delay: f64,

    /// Seconds a session waits for a request before closing
    #[arg(long, default_value = "30")]
    read_timeout: u64,

    /// Result aggregation period in milliseconds
    #[arg(long, default_value = "200")]
    tick_ms: u64,

    /// Leaderboard snapshot file
    #[arg(short, long, default_value = "monty_state.bin")]
    save_file: PathBuf,

    /// Log to the terminal instead of drawing the scoreboard
    #[arg(long)]
    debug: bool,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            delay: Duration::from_secs_f64(args.delay.max(0.0)),
            read_timeout: Duration::from_secs(args.read_timeout),
            tick: Duration::from_millis(args.tick_ms.max(1)),
            save_file: args.save_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    let debug = args.debug;

    let default_filter = if debug { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = ServerConfig::from(args);

    let leaderboard = Arc::new(RwLock::new(Leaderboard::from_players(
        persistence::load(&config.save_file)?,
    )));
    let registry = Arc::new(RwLock::new(SessionRegistry::new(config.delay)));
    let (results_tx, results_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = Server::bind(&config, Arc::clone(&registry), results_tx).await?;
    let server_handle = tokio::spawn(server.run(shutdown_rx.clone()));

    let aggregator = ResultAggregator::new(
        results_rx,
        Arc::clone(&leaderboard),
        Arc::clone(&registry),
    );
    let aggregator_handle = tokio::spawn(aggregator.run(config.tick, shutdown_rx));

    if debug {
        tokio::signal::ctrl_c().await?;
    } else {
        let started = Instant::now();
        let mut redraw = interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = redraw.tick() => {
                    let active = registry.read().await.active_sessions();
                    let scores = leaderboard.read().await.snapshot();
                    let clock = format!("up {:.0}s", started.elapsed().as_secs_f64());
                    print!("\x1b[2J\x1b[H{}", render_scoreboard(&clock, &active, &scores));
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    break;
                }
            }
        }
    }

    println!("Received Ctrl+C, shutting down gracefully...");
    shutdown_tx.send_replace(true);

    if let Err(e) = server_handle.await {
        error!("Network task panicked: {}", e);
    }
    if let Err(e) = aggregator_handle.await {
        error!("Aggregator task panicked: {}", e);
    }

    let snapshot = leaderboard.read().await.players().clone();
    persistence::save(&config.save_file, &snapshot)?;

    info!("Shutdown complete");
    println!("Shutdown complete.");
    Ok(())
}
