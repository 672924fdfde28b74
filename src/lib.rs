//! Natural-language front end for a meeting scheduling store.
//!
//! - `bridge` - typed HTTP operations against the store, exposed as named tools
//! - `mcp` - tool surface trait, JSON-RPC tool server and client
//! - `catalog` / `session` / `agent` - the model-driven tool-call loop
//! - `cli` - the `schedbridge` command

pub mod agent;
pub mod bridge;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod session;
