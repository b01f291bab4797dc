use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Value};

use crate::ToolImplementation;
use parley_common::tools::Tool;

type Handler = Box<dyn Fn(Map<String, Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A tool backed by a closure.
///
/// Use [`FunctionTool::new`] for async handlers and [`FunctionTool::sync`]
/// for handlers that compute their result immediately. Both end up behind
/// the same async [`ToolImplementation::execute`].
pub struct FunctionTool {
    definition: Tool,
    handler: Handler,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            definition: Tool::function(name, description, parameters),
            handler: Box::new(move |args| handler(args).boxed()),
        }
    }

    pub fn sync<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, description, parameters, move |args| {
            future::ready(handler(args))
        })
    }
}

#[async_trait]
impl ToolImplementation for FunctionTool {
    fn get_definition(&self) -> Tool {
        self.definition.clone()
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<Value> {
        (self.handler)(args.clone()).await
    }
}
