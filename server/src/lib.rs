//! # Grid-Claim Game Server Library
//!
//! Authoritative server for a real-time multiplayer grid-claiming game.
//! Players connect over TCP and contend for cells of a shared N×N board;
//! the server is the single source of truth for who holds, claims, or
//! releases each cell and for when the game ends.
//!
//! ## Architecture
//!
//! One lightweight task per connected player performs line reads from its
//! socket; a listener task performs the accepts. All tasks share a single
//! [`session::Session`], which serializes every board mutation and win
//! evaluation behind one lock. Contention is therefore resolved as "first
//! past the lock wins": whichever action acquires the lock first takes a
//! contested cell, and the loser's action is silently dropped. Under
//! network jitter that can differ from "first sent wins" — accepted
//! behavior, not a bug.
//!
//! ## Module Organization
//!
//! - [`board`] — the per-cell `free → held → claimed` state machine and the
//!   N×N grid that hosts it.
//! - [`win`] — pure win/tie evaluation over the claim distribution.
//! - [`session`] — roster, lifecycle phase, action dispatch, and broadcast.
//! - [`network`] — TCP listener, admission handshake, and the per-connection
//!   reader/writer tasks.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::session::{GameConfig, Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Arc::new(Session::new(GameConfig::default())?);
//!     let server = Server::bind("127.0.0.1:65432", session).await?;
//!     server.run().await
//! }
//! ```

pub mod board;
pub mod network;
pub mod session;
pub mod win;
