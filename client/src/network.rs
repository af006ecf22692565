//! TCP connection to the game server.
//!
//! Wraps one socket in the line protocol: connect, run the accept/reject
//! handshake, then send actions and receive broadcast events. The
//! connection can be split so a reader task and a sender loop can run
//! concurrently.

use log::{debug, info};
use shared::{Action, PlayerId, ServerEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Why connecting to the server failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Server answered `reject` (table full or game already running).
    Rejected,
    /// The server's handshake reply could not be decoded.
    Protocol(String),
    Io(String),
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectError::Rejected => f.write_str("server rejected the connection"),
            ConnectError::Protocol(detail) => write!(f, "handshake protocol error: {}", detail),
            ConnectError::Io(detail) => write!(f, "connection failed: {}", detail),
        }
    }
}

impl std::error::Error for ConnectError {}

/// Receiving half: decodes broadcast lines into events.
pub struct EventReader {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl EventReader {
    /// Next broadcast from the server; `None` on EOF. Undecodable lines are
    /// skipped — the server never sends them, so they can only be noise.
    pub async fn next_event(&mut self) -> std::io::Result<Option<ServerEvent>> {
        loop {
            match self.lines.next_line().await? {
                Some(line) => match line.parse::<ServerEvent>() {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => debug!("skipping undecodable line {:?}: {}", line, e),
                },
                None => return Ok(None),
            }
        }
    }
}

/// Sending half: encodes actions onto the socket.
pub struct ActionWriter {
    writer: OwnedWriteHalf,
}

impl ActionWriter {
    pub async fn send(&mut self, action: Action) -> std::io::Result<()> {
        debug!("sending {}", action);
        self.writer
            .write_all(format!("{}\n", action).as_bytes())
            .await
    }
}

/// An admitted connection: assigned player id plus both socket halves.
pub struct Connection {
    player_id: PlayerId,
    reader: EventReader,
    writer: ActionWriter,
}

impl Connection {
    /// Connects and runs the admission handshake.
    pub async fn connect(addr: &str) -> Result<Self, ConnectError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ConnectError::Io(e.to_string()))?;
        let (reader, writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let reply = lines
            .next_line()
            .await
            .map_err(|e| ConnectError::Io(e.to_string()))?
            .ok_or_else(|| ConnectError::Io("server closed during handshake".to_string()))?;

        match reply.parse::<ServerEvent>() {
            Ok(ServerEvent::Accept { player_id }) => {
                info!("admitted as player {}", player_id);
                Ok(Connection {
                    player_id,
                    reader: EventReader { lines },
                    writer: ActionWriter { writer },
                })
            }
            Ok(ServerEvent::Reject) => Err(ConnectError::Rejected),
            Ok(other) => Err(ConnectError::Protocol(format!(
                "expected admission reply, got {:?}",
                other
            ))),
            Err(e) => Err(ConnectError::Protocol(e.to_string())),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub async fn send(&mut self, action: Action) -> std::io::Result<()> {
        self.writer.send(action).await
    }

    pub async fn next_event(&mut self) -> std::io::Result<Option<ServerEvent>> {
        self.reader.next_event().await
    }

    /// Splits into independently owned halves for concurrent use.
    pub fn into_parts(self) -> (PlayerId, EventReader, ActionWriter) {
        (self.player_id, self.reader, self.writer)
    }
}
