//! Tool-call resolution loop.
//!
//! - `core` - the loop itself, its config and hooks
//! - `normalize` - tool result to tool message text

pub mod core;
pub mod normalize;

pub use self::core::{Agent, AgentHooks, AgentLoopConfig, NoopHooks, TurnResult, TurnStats};

use crate::bridge::BridgeError;
use crate::llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model kept requesting tools past the round cap
    #[error("tool loop exceeded {0} model rounds without a final answer")]
    LoopBound(usize),

    #[error(transparent)]
    Model(#[from] LlmError),

    /// Listing tools at session start failed
    #[error("failed to load tool catalog: {0}")]
    Catalog(#[from] BridgeError),
}
