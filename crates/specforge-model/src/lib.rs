//! # SpecForge Model
//!
//! Language model invocation behind the [`ModelInvoker`] trait.
//!
//! Adapters:
//! - [`AnthropicInvoker`] - Messages API over HTTP
//! - [`EchoInvoker`] - Offline provider that answers with the prompt
//! - [`ScriptedInvoker`] - Deterministic double for tests

pub mod anthropic;
pub mod echo;
pub mod invoker;
pub mod protocol;
pub mod scripted;

pub use anthropic::AnthropicInvoker;
pub use echo::EchoInvoker;
pub use invoker::{InvocationContext, ModelConfig, ModelInvoker};
pub use scripted::{ScriptedCall, ScriptedInvoker, ScriptedReply};
