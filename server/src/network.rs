//! TCP listener and per-connection tasks.
//!
//! The listener accepts connections and runs the admission handshake; each
//! admitted player gets a reader task (socket lines → session actions) and a
//! writer task (session broadcasts → socket lines). The reader distinguishes
//! protocol errors, which drop the single offending message and keep the
//! connection, from I/O errors and EOF, which remove the player and close
//! the socket.

use crate::session::Session;
use log::{error, info, warn};
use shared::{Action, PlayerId, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Listening socket bound to a shared session.
pub struct Server {
    listener: TcpListener,
    session: Arc<Session>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        session: Arc<Session>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);
        Ok(Server { listener, session })
    }

    /// Actual bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop: spawns one connection task per incoming socket.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let session = Arc::clone(&self.session);
            tokio::spawn(async move {
                handle_connection(stream, addr, session).await;
            });
        }
    }
}

async fn send_event(writer: &mut OwnedWriteHalf, event: ServerEvent) -> std::io::Result<()> {
    writer.write_all(format!("{}\n", event).as_bytes()).await
}

/// Admission handshake plus the connection's reader loop. Runs until the
/// socket closes or fails, then removes the player from the roster.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, session: Arc<Session>) {
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let player_id = match session.try_admit(tx).await {
        Some(id) => id,
        None => {
            info!("rejecting connection from {}", addr);
            let _ = send_event(&mut writer, ServerEvent::Reject).await;
            return;
        }
    };

    if send_event(&mut writer, ServerEvent::Accept { player_id })
        .await
        .is_err()
    {
        warn!("player {}: connection lost during handshake", player_id);
        session.remove_player(player_id).await;
        return;
    }
    info!("player {} connected from {}", player_id, addr);

    // Writer task drains the broadcast mailbox; it ends when the session
    // drops the sender or the peer stops accepting writes.
    let writer_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if send_event(&mut writer, event).await.is_err() {
                break;
            }
        }
    });

    read_actions(reader, player_id, &session).await;

    session.remove_player(player_id).await;
    writer_task.abort();
}

/// Feeds parsed actions to the session until EOF or an I/O error.
async fn read_actions(
    reader: tokio::net::tcp::OwnedReadHalf,
    player_id: PlayerId,
    session: &Session,
) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Action>() {
                    Ok(action) => session.handle_action(player_id, action).await,
                    // Protocol error: drop the message, keep the connection
                    Err(e) => warn!("player {}: malformed message {:?}: {}", player_id, line, e),
                }
            }
            Ok(None) => {
                info!("player {} disconnected", player_id);
                break;
            }
            Err(e) => {
                error!("player {}: read failed: {}", player_id, e);
                break;
            }
        }
    }
}
