//! Agentforge - assemble AI agent configurations and test them against
//! hosted, free-tier and locally-run chat APIs through one provider gateway.

pub mod agent;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod response;
pub mod server;
