use rand::seq::SliceRandom;
use std::fmt;

pub const DOOR_COUNT: usize = 3;
pub const PRIZE_VALUE: i64 = 100;
pub const READ_BUFFER_SIZE: usize = 4096;
pub const DEFAULT_PORT: u16 = 8888;

/// Shortest accepted `PLAY<name>` line, i.e. a name of at least four characters.
const MIN_PLAY_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Guess(usize),
    Open(usize),
    Done,
}

impl Command {
    /// Parses a normalized request line. Returns `None` for anything the
    /// server should answer with `WTF?`.
    pub fn parse(line: &str) -> Option<Command> {
        if line == "DONE" {
            return Some(Command::Done);
        }

        if line.starts_with("PLAY") && line.chars().count() >= MIN_PLAY_LEN {
            return Some(Command::Play(line[4..].to_string()));
        }

        if line.starts_with("GUES") {
            return door_at(line).map(Command::Guess);
        }

        if line.starts_with("OPEN") {
            return door_at(line).map(Command::Open);
        }

        None
    }
}

// Only the fifth character names the door, anything after it is ignored.
fn door_at(line: &str) -> Option<usize> {
    line.chars()
        .nth(4)
        .and_then(|c| c.to_digit(10))
        .map(|d| d as usize)
        .filter(|d| *d < DOOR_COUNT)
}

pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Splits one socket read into request lines.
///
/// A read without any newline is a single request, which is how the
/// reference client talks. A read of pure whitespace still yields one
/// (empty) request so that it gets an answer.
pub fn split_messages(chunk: &str) -> Vec<String> {
    let messages: Vec<String> = chunk.lines().map(normalize).collect();

    if messages.is_empty() {
        vec![normalize(chunk)]
    } else {
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Hello(String),
    /// `None` is sent as `HINT-1` when no door qualifies as a hint.
    Hint(Option<usize>),
    Prize(i64),
    Goodbye,
    Wait,
    Confused,
}

impl Response {
    pub fn parse(line: &str) -> Option<Response> {
        let line = line.trim();

        match line {
            "GOODBYE" => return Some(Response::Goodbye),
            "WAIT" => return Some(Response::Wait),
            "WTF?" => return Some(Response::Confused),
            _ => {}
        }

        let (tag, rest) = (line.get(..4)?, line.get(4..)?);
        match tag {
            "HIHI" => Some(Response::Hello(rest.to_string())),
            "HINT" => {
                let door: i64 = rest.parse().ok()?;
                Some(Response::Hint(usize::try_from(door).ok()))
            }
            "PRIZ" => rest.parse().ok().map(Response::Prize),
            _ => None,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Hello(name) => write!(f, "HIHI{}", name),
            Response::Hint(Some(door)) => write!(f, "HINT{}", door),
            Response::Hint(None) => write!(f, "HINT-1"),
            Response::Prize(value) => write!(f, "PRIZ{}", value),
            Response::Goodbye => write!(f, "GOODBYE"),
            Response::Wait => write!(f, "WAIT"),
            Response::Confused => write!(f, "WTF?"),
        }
    }
}

/// One round of the three door game.
#[derive(Debug, Clone)]
pub struct Game {
    doors: [i64; DOOR_COUNT],
    selected: Option<usize>,
    hint: Option<usize>,
    prize: Option<i64>,
}

impl Game {
    pub fn new() -> Self {
        let mut doors = [0; DOOR_COUNT];
        doors[0] = PRIZE_VALUE;
        doors.shuffle(&mut rand::thread_rng());
        Self::with_doors(doors)
    }

    pub fn with_doors(doors: [i64; DOOR_COUNT]) -> Self {
        Self {
            doors,
            selected: None,
            hint: None,
            prize: None,
        }
    }

    pub fn doors(&self) -> &[i64; DOOR_COUNT] {
        &self.doors
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn prize(&self) -> Option<i64> {
        self.prize
    }

    /// Records the player's first pick. Later picks are ignored and the
    /// original selection is returned.
    pub fn select(&mut self, door: usize) -> usize {
        *self.selected.get_or_insert(door)
    }

    /// Returns a zero-value door other than the selected one, chosen at random
    /// among all candidates. The first hint is remembered so asking again
    /// cannot be used to probe the layout.
    pub fn hint(&mut self) -> Option<usize> {
        if self.hint.is_some() {
            return self.hint;
        }

        let candidates: Vec<usize> = (0..DOOR_COUNT)
            .filter(|i| Some(*i) != self.selected && self.doors[*i] == 0)
            .collect();

        self.hint = candidates.choose(&mut rand::thread_rng()).copied();
        self.hint
    }

    /// Reveals a door. Only the first call reads a door, every later call is
    /// treated as a cheat and escalates the penalty instead.
    pub fn open(&mut self, door: usize) -> i64 {
        match self.prize {
            None => {
                let value = self.doors[door];
                self.prize = Some(value);
                value
            }
            Some(_) => self.penalty(),
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.prize.is_some()
    }

    pub fn penalty(&mut self) -> i64 {
        let next = match self.prize {
            Some(prize) if prize < 0 => prize.saturating_mul(2),
            _ => -self.max_door(),
        };
        self.prize = Some(next);
        next
    }

    fn max_door(&self) -> i64 {
        self.doors.iter().copied().max().unwrap_or(PRIZE_VALUE)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
