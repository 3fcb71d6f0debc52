//! Address-keyed session registry and reconnect throttling
//!
//! This module tracks, per client IP address:
//! - The time of the last accepted connection, used to throttle reconnects
//! - The live status of the session bound to that connection
//! - A monotonically increasing session id so that a late result from a
//!   replaced session cannot evict its successor
//!
//! The registry is shared between the acceptor (admission) and the
//! aggregator (cleanup) behind a single `RwLock`; every admission decision
//! is one check-and-insert under the write lock.

use crate::game::SessionStatus;
use log::info;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept { session_id: u64 },
    Reject,
}

/// Registry bookkeeping for one client address
#[derive(Debug)]
pub struct RegistryEntry {
    pub session_id: u64,
    /// When the connection owning this entry was accepted
    pub last_connect: Instant,
    /// Live view of the running session, `None` once its result was consumed
    status: Option<watch::Receiver<SessionStatus>>,
}

impl RegistryEntry {
    fn new(session_id: u64, now: Instant, status: watch::Receiver<SessionStatus>) -> Self {
        Self {
            session_id,
            last_connect: now,
            status: Some(status),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_some()
    }

    /// Returns true while a new connection from this address must be refused
    pub fn is_throttled(&self, now: Instant, delay: Duration) -> bool {
        now.saturating_duration_since(self.last_connect) < delay
    }
}

/// A running session as seen by observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub addr: IpAddr,
    pub session_id: u64,
    pub name: Option<String>,
    pub prize: Option<i64>,
}

pub struct SessionRegistry {
    entries: HashMap<IpAddr, RegistryEntry>,
    next_session_id: u64,
    delay: Duration,
}

impl SessionRegistry {
    /// Creates an empty registry refusing reconnects closer than `delay`
    pub fn new(delay: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            next_session_id: 1,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides whether a connection from `addr` may start a session.
    ///
    /// A previous entry still inside the delay window rejects the connection.
    /// An expired entry is evicted and replaced by a fresh one bound to
    /// `status`, the watch channel the new session will publish on.
    pub fn admit(
        &mut self,
        addr: IpAddr,
        now: Instant,
        status: watch::Receiver<SessionStatus>,
    ) -> Admission {
        if let Some(entry) = self.entries.get(&addr) {
            if entry.is_throttled(now, self.delay) {
                return Admission::Reject;
            }
            info!(
                "Evicting stale entry for {} (session #{})",
                addr, entry.session_id
            );
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        self.entries
            .insert(addr, RegistryEntry::new(session_id, now, status));

        Admission::Accept { session_id }
    }

    /// Marks the session as finished once its result has been consumed.
    ///
    /// The entry stays behind to keep throttling until its window has
    /// elapsed. Returns false if the entry already belongs to a newer session.
    pub fn finish(&mut self, addr: IpAddr, session_id: u64, now: Instant) -> bool {
        let Some(entry) = self.entries.get_mut(&addr) else {
            return false;
        };

        if entry.session_id != session_id {
            return false;
        }

        if entry.is_throttled(now, self.delay) {
            entry.status = None;
        } else {
            self.entries.remove(&addr);
        }

        true
    }

    /// Drops finished entries whose delay window has elapsed
    pub fn prune(&mut self, now: Instant) -> usize {
        let delay = self.delay;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.is_live() || entry.is_throttled(now, delay));
        before - self.entries.len()
    }

    pub fn get(&self, addr: &IpAddr) -> Option<&RegistryEntry> {
        self.entries.get(addr)
    }

    /// Lists every session that has not reported its result yet
    pub fn active_sessions(&self) -> Vec<ActiveSession> {
        let mut sessions: Vec<ActiveSession> = self
            .entries
            .iter()
            .filter_map(|(addr, entry)| {
                let status = entry.status.as_ref()?.borrow().clone();
                Some(ActiveSession {
                    addr: *addr,
                    session_id: entry.session_id,
                    name: status.name,
                    prize: status.prize,
                })
            })
            .collect();

        sessions.sort_by_key(|s| s.session_id);
        sessions
    }

    /// Number of tracked addresses, live or throttling
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
