use clap::Parser;
use client::network::Player;
use client::{simulate, Strategy};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Monty Hall reference player", long_about = None)]
struct Args {
    /// IP address of the server
    #[arg(short = 'a', long, default_value = "127.0.0.1")]
    addr: String,

    /// Port the server listens on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Player name, at least four characters
    #[arg(short, long, default_value = "ALAN")]
    name: String,

    /// Door strategy after the hint
    #[arg(short, long, value_enum, default_value_t = Strategy::Switch)]
    strategy: Strategy,

    /// Number of games to play, 0 plays forever
    #[arg(short, long, default_value = "0")]
    games: u64,

    /// Play this many rounds locally instead of connecting
    #[arg(long)]
    simulate: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if let Some(rounds) = args.simulate {
        let report = simulate(args.strategy, rounds);
        println!(
            "Total prizes {} in {} games = {:.3} ({:?}, {:.1}% won)",
            report.total_prize,
            report.rounds,
            report.total_prize as f64 / report.rounds.max(1) as f64,
            args.strategy,
            100.0 * report.win_rate()
        );
        return Ok(());
    }

    if args.name.trim().chars().count() < 4 {
        return Err("player name needs at least four characters".into());
    }

    let server = format!("{}:{}", args.addr, args.port);
    info!("Starting game with {} as {}", server, args.name);

    let player = Player::new(&server, &args.name, args.strategy);
    let summary = player.run(args.games).await?;

    println!(
        "{} played {} games, won {}, scored {} ({} throttled attempts)",
        player.name(),
        summary.games,
        summary.wins,
        summary.score,
        summary.throttled
    );

    Ok(())
}
