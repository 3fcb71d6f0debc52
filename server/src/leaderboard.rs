//! Result aggregation and the running leaderboard
//!
//! Session workers never touch the leaderboard directly. Each finished
//! session pushes one `GameResult` onto an unbounded queue, and the
//! `ResultAggregator` is the only consumer: it drains the queue on a fixed
//! cadence, folds every record into per-player statistics and retires the
//! session from the registry's active view.

use crate::game::GameResult;
use crate::registry::{ActiveSession, SessionRegistry};
use crate::utils::clean_name;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Widest name shown on the scoreboard
const NAME_WIDTH: usize = 20;

/// Aggregate statistics for one declared player name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games: u64,
    /// Sum of all prizes and penalties
    pub score: i64,
    /// Games that ended with a positive prize
    pub wins: u64,
}

impl PlayerStats {
    fn first(prize: i64) -> Self {
        let mut stats = Self::default();
        stats.record(prize);
        stats
    }

    fn record(&mut self, prize: i64) {
        self.games += 1;
        self.score = self.score.saturating_add(prize);
        if prize > 0 {
            self.wins += 1;
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games as f64
    }
}

#[derive(Debug, Default)]
pub struct Leaderboard {
    players: HashMap<String, PlayerStats>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_players(players: HashMap<String, PlayerStats>) -> Self {
        Self { players }
    }

    /// Folds one finished game into the player's statistics
    pub fn record(&mut self, name: &str, prize: i64) {
        match self.players.get_mut(name) {
            Some(stats) => stats.record(prize),
            None => {
                self.players.insert(name.to_string(), PlayerStats::first(prize));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&PlayerStats> {
        self.players.get(name)
    }

    pub fn players(&self) -> &HashMap<String, PlayerStats> {
        &self.players
    }

    /// Entries sorted by accuracy, best first, ties broken by name
    pub fn snapshot(&self) -> Vec<(String, PlayerStats)> {
        let mut entries: Vec<(String, PlayerStats)> = self
            .players
            .iter()
            .map(|(name, stats)| (name.clone(), *stats))
            .collect();

        entries.sort_by(|a, b| {
            b.1.accuracy()
                .total_cmp(&a.1.accuracy())
                .then_with(|| a.0.cmp(&b.0))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Single consumer of the result queue
pub struct ResultAggregator {
    results: mpsc::UnboundedReceiver<GameResult>,
    leaderboard: Arc<RwLock<Leaderboard>>,
    registry: Arc<RwLock<SessionRegistry>>,
}

impl ResultAggregator {
    pub fn new(
        results: mpsc::UnboundedReceiver<GameResult>,
        leaderboard: Arc<RwLock<Leaderboard>>,
        registry: Arc<RwLock<SessionRegistry>>,
    ) -> Self {
        Self {
            results,
            leaderboard,
            registry,
        }
    }

    /// Applies every result queued so far without waiting for more.
    /// Returns the number of records consumed.
    pub async fn drain_and_apply(&mut self) -> usize {
        let mut consumed = 0;

        while let Ok(result) = self.results.try_recv() {
            self.apply(result).await;
            consumed += 1;
        }

        consumed
    }

    async fn apply(&self, result: GameResult) {
        {
            let mut registry = self.registry.write().await;
            registry.finish(result.addr.ip(), result.session_id, Instant::now());
        }

        match (&result.name, result.prize) {
            (_, None) => {
                debug!("Session #{} ended without a reveal", result.session_id);
            }
            (None, Some(prize)) => {
                info!(
                    "Dropping prize {} of anonymous session #{} from {}",
                    prize, result.session_id, result.addr
                );
            }
            (Some(name), Some(prize)) => {
                let mut leaderboard = self.leaderboard.write().await;
                leaderboard.record(name, prize);
                info!("{} scored {} (session #{})", name, prize, result.session_id);
            }
        }
    }

    /// Drains the queue every `period` until `shutdown` fires, then performs a
    /// final drain so that results of already finished sessions are kept.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.drain_and_apply().await;
                    let pruned = self.registry.write().await.prune(Instant::now());
                    if pruned > 0 {
                        debug!("Pruned {} expired registry entries", pruned);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let consumed = self.drain_and_apply().await;
        info!("Aggregator stopped after final drain of {} results", consumed);
    }
}

/// Renders the text dashboard: running sessions followed by the scoreboard
pub fn render_scoreboard(
    timestamp: &str,
    active: &[ActiveSession],
    scores: &[(String, PlayerStats)],
) -> String {
    let rule = "=".repeat(65);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "{}  ----  {} games", timestamp, active.len());
    for session in active {
        let prize = session
            .prize
            .map_or_else(|| "NONE".to_string(), |p| p.to_string());
        let _ = writeln!(
            out,
            "  {} :: {} :: {}",
            session.addr,
            clean_name(session.name.as_deref(), NAME_WIDTH),
            prize
        );
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "TOTAL SCORES");
    let _ = writeln!(
        out,
        "{:20} {:>10} {:>20} {:>12}",
        "NAME", "GAMES", "SCORE", "ACCURACY(%)"
    );
    let _ = writeln!(out, "{}", "-".repeat(65));
    for (name, stats) in scores {
        let _ = writeln!(
            out,
            "{:20} {:10} {:20}     {:>3.3}%",
            clean_name(Some(name), NAME_WIDTH),
            stats.games,
            stats.score,
            100.0 * stats.accuracy()
        );
    }
    let _ = writeln!(out, "{}", rule);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SessionStatus;
    use crate::registry::Admission;
    use assert_approx_eq::assert_approx_eq;
    use std::net::SocketAddr;

    fn result(addr: &str, session_id: u64, name: Option<&str>, prize: Option<i64>) -> GameResult {
        GameResult {
            timestamp: 0,
            addr: addr.parse::<SocketAddr>().unwrap(),
            session_id,
            name: name.map(str::to_string),
            prize,
        }
    }

    fn aggregator() -> (
        ResultAggregator,
        mpsc::UnboundedSender<GameResult>,
        Arc<RwLock<Leaderboard>>,
        Arc<RwLock<SessionRegistry>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let leaderboard = Arc::new(RwLock::new(Leaderboard::new()));
        let registry = Arc::new(RwLock::new(SessionRegistry::new(Duration::from_secs(1))));
        let aggregator = ResultAggregator::new(rx, Arc::clone(&leaderboard), Arc::clone(&registry));
        (aggregator, tx, leaderboard, registry)
    }

    #[test]
    fn test_player_stats() {
        let mut stats = PlayerStats::first(100);
        stats.record(0);
        stats.record(-100);
        stats.record(100);

        assert_eq!(stats.games, 4);
        assert_eq!(stats.score, 100);
        assert_eq!(stats.wins, 2);
        assert_approx_eq!(stats.accuracy(), 0.5);
    }

    #[test]
    fn test_no_entry_before_first_result() {
        let mut leaderboard = Leaderboard::new();
        assert!(leaderboard.get("ALAN").is_none());

        leaderboard.record("ALAN", 0);
        let stats = leaderboard.get("ALAN").unwrap();
        assert_eq!(stats.games, 1);
        assert_eq!(stats.wins, 0);
        assert_approx_eq!(stats.accuracy(), 0.0);
    }

    #[test]
    fn test_accuracy_is_exact_ratio() {
        let mut leaderboard = Leaderboard::new();
        for prize in [100, 0, 0, 100, 100, -100, 0] {
            leaderboard.record("ALAN", prize);
        }

        let stats = leaderboard.get("ALAN").unwrap();
        assert_eq!(stats.games, 7);
        assert_eq!(stats.wins, 3);
        assert_approx_eq!(stats.accuracy(), 3.0 / 7.0);
    }

    #[test]
    fn test_snapshot_sorted_by_accuracy() {
        let mut leaderboard = Leaderboard::new();
        leaderboard.record("LOW1", 0);
        leaderboard.record("HIGH", 100);
        leaderboard.record("MIDL", 100);
        leaderboard.record("MIDL", 0);
        leaderboard.record("LOW0", -100);

        let names: Vec<String> = leaderboard.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["HIGH", "MIDL", "LOW0", "LOW1"]);
    }

    #[tokio::test]
    async fn test_drain_folds_results() {
        let (mut aggregator, tx, leaderboard, _registry) = aggregator();

        tx.send(result("10.0.0.1:5000", 1, Some("ALAN"), Some(100))).unwrap();
        tx.send(result("10.0.0.2:5000", 2, Some("ALAN"), Some(-100))).unwrap();
        tx.send(result("10.0.0.3:5000", 3, Some("BOB1"), Some(0))).unwrap();

        assert_eq!(aggregator.drain_and_apply().await, 3);
        assert_eq!(aggregator.drain_and_apply().await, 0);

        let leaderboard = leaderboard.read().await;
        let alan = leaderboard.get("ALAN").unwrap();
        assert_eq!((alan.games, alan.score, alan.wins), (2, 0, 1));
        assert_eq!(leaderboard.get("BOB1").unwrap().games, 1);
    }

    #[tokio::test]
    async fn test_results_without_prize_or_name_skipped() {
        let (mut aggregator, tx, leaderboard, _registry) = aggregator();

        tx.send(result("10.0.0.1:5000", 1, Some("ALAN"), None)).unwrap();
        tx.send(result("10.0.0.2:5000", 2, None, Some(-100))).unwrap();

        assert_eq!(aggregator.drain_and_apply().await, 2);
        assert!(leaderboard.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_drain_retires_active_session() {
        let (mut aggregator, tx, _leaderboard, registry) = aggregator();
        let (_status_tx, status_rx) = watch::channel(SessionStatus::default());
        let addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();

        let session_id = match registry.write().await.admit(addr.ip(), Instant::now(), status_rx) {
            Admission::Accept { session_id } => session_id,
            Admission::Reject => panic!("first connection rejected"),
        };
        assert_eq!(registry.read().await.active_sessions().len(), 1);

        tx.send(result("10.0.0.1:5000", session_id, Some("ALAN"), Some(100))).unwrap();
        aggregator.drain_and_apply().await;

        assert!(registry.read().await.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_until_shutdown() {
        let (aggregator, tx, leaderboard, _registry) = aggregator();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(aggregator.run(Duration::from_millis(20), shutdown_rx));

        tx.send(result("10.0.0.1:5000", 1, Some("ALAN"), Some(100))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(leaderboard.read().await.get("ALAN").unwrap().games, 1);

        tx.send(result("10.0.0.1:5000", 2, Some("ALAN"), Some(0))).unwrap();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(leaderboard.read().await.get("ALAN").unwrap().games, 2);
    }

    #[test]
    fn test_render_scoreboard() {
        let active = vec![ActiveSession {
            addr: "10.0.0.1".parse().unwrap(),
            session_id: 1,
            name: Some("ALAN".to_string()),
            prize: None,
        }];
        let scores = vec![(
            "BOB1".to_string(),
            PlayerStats {
                games: 4,
                score: 200,
                wins: 2,
            },
        )];

        let text = render_scoreboard("2019-01-01 00:00:00", &active, &scores);

        assert!(text.contains("1 games"));
        assert!(text.contains("10.0.0.1 :: ALAN :: NONE"));
        assert!(text.contains("TOTAL SCORES"));
        assert!(text.contains("50.000%"));
        assert!(text.lines().any(|l| l.starts_with("BOB1")));
    }
}
