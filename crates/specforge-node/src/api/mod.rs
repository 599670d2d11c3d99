//! HTTP and WebSocket handlers.

pub mod health;
pub mod invoke;
pub mod runs;
pub mod ws;
