//! # SpecForge SDK
//!
//! Client SDK for talking to a SpecForge node over HTTP and WebSocket.

pub mod client;
pub mod error;
pub mod stream;

pub use client::{RunSummary, SpecForgeClient};
pub use error::{ClientError, Result};
pub use stream::EventStream;

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::client::{RunSummary, SpecForgeClient};
    pub use crate::error::ClientError;
    pub use crate::stream::EventStream;
    pub use specforge_core::prelude::*;
}
