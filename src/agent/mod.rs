//! The agent: approval gating and the top-level control loop.

pub mod agent_loop;
pub mod approval;
pub mod system_prompt;

pub use agent_loop::Agent;
