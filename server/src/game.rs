//! Per-connection game session and its request/response state machine
//!
//! A session starts out waiting for a `PLAY<name>` line. Once a name has been
//! registered the player may `GUES` a door to receive a hint and `OPEN` a door
//! to reveal the prize. Only the first reveal counts; every further `OPEN` is
//! treated as a cheat and answered with an escalating penalty. The session
//! never touches the network itself, the worker in `session` feeds it lines.

use log::{debug, error, warn};
use shared::{Command, Game, Response};
use std::fmt;
use std::net::SocketAddr;

/// Whether the connection stays open after a response has been sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Publicly visible part of a running session, shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub name: Option<String>,
    pub prize: Option<i64>,
}

/// Record emitted exactly once when a session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Milliseconds since the unix epoch at which the session ended
    pub timestamp: u64,
    pub addr: SocketAddr,
    pub session_id: u64,
    pub name: Option<String>,
    pub prize: Option<i64>,
}

#[derive(Debug)]
pub struct GameSession {
    id: u64,
    remote: SocketAddr,
    game: Game,
    name: Option<String>,
    abandoned: bool,
}

impl GameSession {
    pub fn new(id: u64, remote: SocketAddr) -> Self {
        Self::with_game(id, remote, Game::new())
    }

    pub fn with_game(id: u64, remote: SocketAddr, game: Game) -> Self {
        Self {
            id,
            remote,
            game,
            name: None,
            abandoned: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn prize(&self) -> Option<i64> {
        self.game.prize()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// A session becomes playable once the client has registered a name
    pub fn is_playable(&self) -> bool {
        self.name.is_some()
    }

    /// Processes one request. `None` stands for a line that did not parse.
    pub fn handle(&mut self, command: Option<Command>) -> (Response, Flow) {
        match command {
            Some(Command::Done) => (Response::Goodbye, Flow::Close),

            Some(Command::Play(name)) => {
                debug!("{} registered as {}", self, name);
                self.name = Some(name.clone());
                (Response::Hello(name), Flow::Continue)
            }

            Some(Command::Guess(door)) if self.is_playable() => {
                let selected = self.game.select(door);
                let hint = self.game.hint();
                if hint.is_none() {
                    error!("{} has no door to hint for selection {}", self, selected);
                }
                (Response::Hint(hint), Flow::Continue)
            }

            Some(Command::Open(door)) if self.is_playable() => {
                if self.game.is_revealed() {
                    warn!("Cheat detected in {}: door {} opened again", self, door);
                }
                (Response::Prize(self.game.open(door)), Flow::Continue)
            }

            other => {
                debug!("Bad request in {}: {:?}", self, other);
                (Response::Confused, Flow::Continue)
            }
        }
    }

    /// Applies the hang-up penalty. Repeated calls have no further effect.
    pub fn abandon(&mut self) -> Option<i64> {
        if !self.abandoned {
            self.abandoned = true;
            warn!("Remote {} hung up", self);
            self.game.penalty();
        }
        self.game.prize()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            name: self.name.clone(),
            prize: self.game.prize(),
        }
    }

    pub fn into_result(self, timestamp: u64) -> GameResult {
        GameResult {
            timestamp,
            addr: self.remote,
            session_id: self.id,
            name: self.name,
            prize: self.game.prize(),
        }
    }
}

impl fmt::Display for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session #{} {} ({})",
            self.id,
            self.remote,
            self.name.as_deref().unwrap_or("?")
        )
    }
}
