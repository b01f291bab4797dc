//! # parley
//!
//! The tool-calling conversation loop.
//!
//! [`Core::generate`] records a user turn, sends the thread to a completion
//! endpoint, runs any tools the model asks for, feeds their results back,
//! and repeats until the model answers or the iteration budget runs out.
//! Threads live in a [`ConversationStore`]; tools come from a
//! [`ToolRegistry`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use parley::{Core, GenerateOptions, OpenAIClient, ToolRegistry};
//! use parley_common::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = OpenAIClient::new(Config::new("http://localhost:8080/v1", "local-model"))?;
//! let core = Core::builder()
//!     .client(client)
//!     .tools(Arc::new(ToolRegistry::new()))
//!     .system_prompt("You are a terse assistant.")
//!     .build();
//!
//! let reply = core
//!     .generate("thread-1", "Hello!", &GenerateOptions::default())
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;
pub mod reply;
pub mod store;

pub use parley_client::{ClientError, LLMClient, OpenAIClient};
pub use parley_tools::{FunctionTool, ToolError, ToolImplementation, ToolRegistry};

pub use core::Core;
pub use error::CoreError;
pub use reply::{Exhaustion, GenerateOptions, Reply};
pub use store::{ConversationStore, InMemoryStore};
