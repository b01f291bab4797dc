//! Tool discovery over the Model Context Protocol.

pub mod adapter;
pub mod client;
pub mod config;
pub mod manager;

pub use adapter::McpToolAdapter;
pub use config::{McpConfig, McpServerConfig, McpSettings, McpTransportConfig};
pub use manager::McpManager;
