//! Valet -- Conversational Tool-Using Agent
//!
//! A personal assistant that turns natural-language requests into tool
//! invocations, gates sensitive tools behind human approval, and keeps
//! the growing conversation bounded with a rolling summary.

pub mod types;
pub mod config;
pub mod agent;
pub mod memory;
pub mod llm;
pub mod state;
pub mod tools;
