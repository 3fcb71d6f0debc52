use crate::{choose_door, Strategy};
use log::{info, warn};
use rand::Rng;
use shared::{Response, DOOR_COUNT};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::sleep;

/// Back-off after the server answered `WAIT`
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// How one connection attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Played { guess: usize, opened: usize, prize: i64 },
    Throttled,
}

/// Running totals over every game a player finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerSummary {
    pub games: u64,
    pub wins: u64,
    pub score: i64,
    pub throttled: u64,
}

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn open(server: &str) -> ClientResult<Self> {
        let stream = TcpStream::connect(server).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    async fn request(&mut self, line: &str) -> ClientResult<Response> {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;

        let reply = self
            .lines
            .next_line()
            .await?
            .ok_or("server closed the connection")?;

        Response::parse(&reply).ok_or_else(|| format!("unexpected reply {:?}", reply).into())
    }
}

/// A scripted player that follows one door strategy
pub struct Player {
    server: String,
    name: String,
    strategy: Strategy,
}

impl Player {
    pub fn new(server: &str, name: &str, strategy: Strategy) -> Self {
        Self {
            server: server.to_string(),
            name: name.trim().to_uppercase(),
            strategy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plays a single game on a fresh connection
    pub async fn play_game(&self) -> ClientResult<GameOutcome> {
        let mut conn = Connection::open(&self.server).await?;

        match conn.request(&format!("PLAY{}", self.name)).await? {
            Response::Hello(_) => {}
            Response::Wait => return Ok(GameOutcome::Throttled),
            other => return Err(format!("expected HIHI, got {}", other).into()),
        }

        let guess = rand::thread_rng().gen_range(0..DOOR_COUNT);
        let hint = match conn.request(&format!("GUES{}", guess)).await? {
            Response::Hint(hint) => hint,
            other => return Err(format!("expected HINT, got {}", other).into()),
        };

        let opened = choose_door(self.strategy, guess, hint);
        let prize = match conn.request(&format!("OPEN{}", opened)).await? {
            Response::Prize(prize) => prize,
            other => return Err(format!("expected PRIZ, got {}", other).into()),
        };

        match conn.request("DONE").await? {
            Response::Goodbye => {}
            other => warn!("Expected GOODBYE, got {}", other),
        }

        Ok(GameOutcome::Played {
            guess,
            opened,
            prize,
        })
    }

    /// Plays `games` finished games, or forever when `games` is zero.
    /// Throttled attempts are retried and do not count.
    pub async fn run(&self, games: u64) -> ClientResult<PlayerSummary> {
        let mut summary = PlayerSummary::default();

        while games == 0 || summary.games < games {
            match self.play_game().await? {
                GameOutcome::Throttled => {
                    summary.throttled += 1;
                    sleep(RETRY_DELAY).await;
                }
                GameOutcome::Played {
                    guess,
                    opened,
                    prize,
                } => {
                    summary.games += 1;
                    summary.score += prize;
                    if prize > 0 {
                        summary.wins += 1;
                    }
                    info!(
                        "Game {}: guess {}, opened {}, got {}",
                        summary.games, guess, opened, prize
                    );
                }
            }
        }

        Ok(summary)
    }
}
