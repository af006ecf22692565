//! # Grid-Claim Game Client Library
//!
//! Terminal client for the grid-claiming game server. It speaks the ASCII
//! line protocol from the `shared` crate: it connects, runs the
//! accept/reject handshake, sends hold/claim/release actions, and mirrors
//! the board locally from the server's broadcasts.
//!
//! ## Module Organization
//!
//! - [`network`] — TCP connection: handshake, action sending, event
//!   receiving.
//! - [`game`] — local board view reconstructed purely from broadcasts; the
//!   server stays authoritative, the view only renders and feeds the bot.
//!
//! Graphical rendering is deliberately out of scope; the binary offers an
//! interactive stdin mode and a `--bot` mode that plays on its own.

pub mod game;
pub mod network;
