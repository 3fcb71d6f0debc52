//! # Monty Hall Game Server Library
//!
//! This library provides the server side of a multiplayer "Monty Hall"
//! guessing game played over a line based text protocol on TCP. It runs one
//! game per connection, throttles clients that reconnect too quickly, and
//! aggregates finished games into a running leaderboard.
//!
//! ## Core Responsibilities
//!
//! ### Game Sessions
//! Each accepted connection gets a fresh three door game. The client
//! registers a name with `PLAY<name>`, may `GUES<d>` a door to receive a
//! hint pointing at an empty door, and `OPEN<d>` a door to reveal its prize.
//! Only the first reveal counts. Every further `OPEN` is a cheat and is
//! answered with an escalating penalty, as is hanging up mid game.
//!
//! ### Reconnect Throttling
//! A client address may only start a new session once the configured delay
//! has passed since its previous accepted connection. Early reconnects are
//! answered with `WAIT` and closed without ever creating a session.
//!
//! ### Result Aggregation
//! Finished sessions emit exactly one result record onto a queue. A single
//! aggregator drains that queue on a fixed cadence and folds each record
//! into per-player statistics (games, score, wins, accuracy).
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The per-session protocol state machine on top of the shared door rules.
//!
//! ### Session Module (`session`)
//! The worker that drives one connection: bounded-timeout reads, one
//! response line per request, status publication and result emission.
//!
//! ### Registry Module (`registry`)
//! Address keyed table of active and recently finished sessions that
//! makes every admission decision atomically.
//!
//! ### Network Module (`network`)
//! The TCP listener, runtime configuration and per-connection task spawning.
//!
//! ### Leaderboard Module (`leaderboard`)
//! Player statistics, the result aggregator and the text scoreboard.
//!
//! ### Persistence Module (`persistence`)
//! Loading and saving the leaderboard across restarts.
//!
//! ## Concurrency Model
//!
//! One tokio task per accepted connection, one acceptor task and one
//! aggregator task. Sessions talk to the aggregator only through the
//! unbounded result channel; the registry and the leaderboard sit behind
//! `RwLock`s. The number of concurrent sessions is not capped.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::leaderboard::{Leaderboard, ResultAggregator};
//! use server::network::{Server, ServerConfig};
//! use server::registry::SessionRegistry;
//! use std::sync::Arc;
//! use tokio::sync::{mpsc, watch, RwLock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig::default();
//!     let registry = Arc::new(RwLock::new(SessionRegistry::new(config.delay)));
//!     let leaderboard = Arc::new(RwLock::new(Leaderboard::new()));
//!     let (results_tx, results_rx) = mpsc::unbounded_channel();
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     let aggregator = ResultAggregator::new(results_rx, leaderboard, Arc::clone(&registry));
//!     tokio::spawn(aggregator.run(config.tick, shutdown_rx.clone()));
//!
//!     let server = Server::bind(&config, registry, results_tx).await?;
//!     server.run(shutdown_rx).await;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod leaderboard;
pub mod network;
pub mod persistence;
pub mod registry;
pub mod session;
pub mod utils;
