//! Wire protocol shared between the grid-claim server and its clients.
//!
//! Every message is a single ASCII line of space-separated tokens:
//!
//! - client → server: `<verb> <row> <col>` where verb is `hold`, `claim`
//!   or `release`
//! - server → client: `accept <id>` / `reject` on admission,
//!   `<verb> <row> <col> <playerId>` for board updates, and
//!   `win <playerId>` (`-1` for a tie) when the game ends
//!
//! [`Action`] and [`ServerEvent`] encode with `Display` and decode with
//! `FromStr`, so a broadcast round-trips exactly through the client decoder.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 65432;
pub const DEFAULT_BOARD_SIZE: usize = 8;
pub const DEFAULT_MIN_PLAYERS: usize = 2;
pub const DEFAULT_MAX_PLAYERS: usize = 4;
/// How long a client holds a cell before claiming it, in milliseconds.
pub const DEFAULT_HOLD_MS: u64 = 1000;

pub type PlayerId = u32;

const COLORS: [&str; 4] = ["red", "green", "blue", "yellow"];

/// Display color for a player id, with a white fallback past the palette.
pub fn player_color(id: PlayerId) -> &'static str {
    COLORS.get(id as usize).copied().unwrap_or("white")
}

/// The three legal board transitions a player can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Hold,
    Claim,
    Release,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Hold => "hold",
            Verb::Claim => "claim",
            Verb::Release => "release",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hold" => Ok(Verb::Hold),
            "claim" => Ok(Verb::Claim),
            "release" => Ok(Verb::Release),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

/// Why a received message could not be decoded.
///
/// Protocol errors are recoverable: the offending message is dropped and
/// the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Wrong number of space-separated tokens for the message kind.
    TokenCount { expected: usize, found: usize },
    /// First token is not a known verb or event name.
    UnknownVerb(String),
    /// A coordinate or player id token is not a valid number.
    InvalidNumber(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::TokenCount { expected, found } => {
                write!(f, "expected {} tokens, found {}", expected, found)
            }
            ProtocolError::UnknownVerb(verb) => write!(f, "unknown verb {:?}", verb),
            ProtocolError::InvalidNumber(token) => write!(f, "invalid number {:?}", token),
        }
    }
}

impl Error for ProtocolError {}

fn parse_number<T: FromStr>(token: &str) -> Result<T, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::InvalidNumber(token.to_string()))
}

/// A client's request to transition one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub row: usize,
    pub col: usize,
}

impl Action {
    pub fn new(verb: Verb, row: usize, col: usize) -> Self {
        Self { verb, row, col }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb, self.row, self.col)
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(ProtocolError::TokenCount {
                expected: 3,
                found: tokens.len(),
            });
        }
        Ok(Action {
            verb: tokens[0].parse()?,
            row: parse_number(tokens[1])?,
            col: parse_number(tokens[2])?,
        })
    }
}

/// A message from the server, either an admission reply or a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// Connection admitted; carries the assigned player id.
    Accept { player_id: PlayerId },
    /// Connection refused (capacity reached or game already started).
    Reject,
    /// A board transition succeeded.
    Update {
        verb: Verb,
        row: usize,
        col: usize,
        player_id: PlayerId,
    },
    /// The game ended; `None` denotes a tie.
    Win { winner: Option<PlayerId> },
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::Accept { player_id } => write!(f, "accept {}", player_id),
            ServerEvent::Reject => f.write_str("reject"),
            ServerEvent::Update {
                verb,
                row,
                col,
                player_id,
            } => write!(f, "{} {} {} {}", verb, row, col, player_id),
            ServerEvent::Win { winner: Some(id) } => write!(f, "win {}", id),
            ServerEvent::Win { winner: None } => f.write_str("win -1"),
        }
    }
}

impl FromStr for ServerEvent {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        match tokens.as_slice() {
            ["reject"] => Ok(ServerEvent::Reject),
            ["accept", id] => Ok(ServerEvent::Accept {
                player_id: parse_number(id)?,
            }),
            ["win", "-1"] => Ok(ServerEvent::Win { winner: None }),
            ["win", id] => Ok(ServerEvent::Win {
                winner: Some(parse_number(id)?),
            }),
            [verb, row, col, id] => Ok(ServerEvent::Update {
                verb: verb.parse()?,
                row: parse_number(row)?,
                col: parse_number(col)?,
                player_id: parse_number(id)?,
            }),
            ["accept"] | ["win"] => Err(ProtocolError::TokenCount {
                expected: 2,
                found: 1,
            }),
            tokens => Err(ProtocolError::TokenCount {
                expected: 4,
                found: tokens.len(),
            }),
        }
    }
}
