use std::sync::Arc;

use parley::{Core, LLMClient, ToolRegistry};

use crate::config::ChatSettings;

/// The conversation loop behind the HTTP front-end.
pub type SharedCore = Core<Arc<dyn LLMClient>>;

/// Application context handed to every handler.
///
/// Built once at startup; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<SharedCore>,
    pub defaults: Arc<ChatSettings>,
}

impl AppState {
    #[must_use]
    pub fn new(core: SharedCore, defaults: ChatSettings) -> Self {
        Self {
            core: Arc::new(core),
            defaults: Arc::new(defaults),
        }
    }

    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        self.core.tools()
    }
}
