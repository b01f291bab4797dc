//! # parley-server
//!
//! HTTP front-end for the parley conversation loop.
//!
//! | route | |
//! |---|---|
//! | `GET /healthz` | readiness and registered tool names |
//! | `POST /chat` | run one user turn |
//! | `GET /memory/{thread_id}` | stored thread history |
//! | `DELETE /memory/{thread_id}` | forget a thread |

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ParleyConfig;
pub use error::{Result, ServerError};
pub use routes::router;
pub use state::AppState;
