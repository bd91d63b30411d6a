//! Two-player, turn-based Minesweeper server.
//!
//! Games live in a [`registry::Registry`]. The [`coordinator::Coordinator`] binds live
//! connections to seats and fans every accepted action out to both players, and
//! [`transport`] exposes it over HTTP and WebSocket.

pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod session;
pub mod transport;
