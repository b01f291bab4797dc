use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;
use typed_builder::TypedBuilder;

use parley_client::LLMClient;
use parley_common::chat::Message;
use parley_common::client::{ChatRequest, ResponseFormat};
use parley_common::tools::ToolCall;
use parley_tools::{ToolError, ToolRegistry};

use crate::error::CoreError;
use crate::reply::{Exhaustion, GenerateOptions, Reply};
use crate::store::{ConversationStore, InMemoryStore};

/// The conversation loop.
///
/// Holds no conversation state of its own: every round-trip re-reads the
/// thread from the store, so external truncation is always observed.
#[derive(TypedBuilder)]
pub struct Core<C: LLMClient> {
    client: C,

    #[builder(default = Arc::new(InMemoryStore::new()) as Arc<dyn ConversationStore>)]
    store: Arc<dyn ConversationStore>,

    #[builder(default)]
    tools: Arc<ToolRegistry>,

    /// Pinned as the first message of every thread.
    #[builder(default, setter(strip_option(fallback = system_prompt_opt), into))]
    system_prompt: Option<String>,
}

impl<C: LLMClient> Core<C> {
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    #[must_use]
    pub const fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Runs one user turn to completion.
    ///
    /// Performs at most `options.max_tool_iterations` gateway calls. Tool
    /// calls are executed in the order the model listed them and each one
    /// leaves exactly one tool message in the thread, whether it succeeded
    /// or not. When a response schema is given, a final answer that is not
    /// valid JSON comes back as [`Reply::Text`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Gateway`] if a completion request fails and
    /// [`CoreError::Store`] if the thread cannot be read or written. Tool
    /// failures are never returned here.
    pub async fn generate(
        &self,
        thread_id: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Reply, CoreError> {
        if let Some(system_prompt) = &self.system_prompt
            && self
                .store
                .ensure_system(thread_id, Message::system(system_prompt.as_str()))
                .await
                .map_err(CoreError::Store)?
        {
            debug!("Pinned system message to thread '{thread_id}'");
        }

        self.append(thread_id, Message::user(prompt)).await?;

        let catalog = self.tools.catalog(&options.enabled_tools);
        let response_format = options
            .response_schema
            .clone()
            .map(ResponseFormat::json_schema);
        let budget = options.max_tool_iterations;

        for iteration in 0..budget {
            info!(
                "Executing chat turn ({}/{budget}) for thread '{thread_id}'",
                iteration + 1
            );

            let history = self.store.get(thread_id).await.map_err(CoreError::Store)?;
            let mut request = ChatRequest::new(history)
                .with_tools(catalog.clone())
                .with_params(options.params.clone());
            if let Some(format) = &response_format {
                request = request.with_response_format(format.clone());
            }

            let response = self.client.chat(&request).await.map_err(|e| {
                error!("Completion request for thread '{thread_id}' failed: {e:#}");
                CoreError::Gateway(e)
            })?;
            let message = response.message;

            if !message.has_tool_calls() {
                let text = message.text().to_string();
                self.append(thread_id, message).await?;
                debug!(
                    "Thread '{thread_id}' completed in {} turns",
                    iteration + 1
                );
                return Ok(final_reply(text, options.response_schema.is_some()));
            }

            let tool_calls = message.tool_calls.clone();
            self.append(thread_id, message).await?;

            if iteration + 1 >= budget {
                warn!(
                    "Thread '{thread_id}' requested {} tool calls on its last allowed turn; not executing them",
                    tool_calls.len()
                );
                return Ok(Reply::Exhausted(Exhaustion::ToolsPending));
            }

            self.run_tool_calls(thread_id, &tool_calls).await?;
        }

        Ok(Reply::Exhausted(Exhaustion::NoCompletion))
    }

    /// The thread as currently stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the store fails.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<Message>, CoreError> {
        self.store.get(thread_id).await.map_err(CoreError::Store)
    }

    /// Forgets the thread entirely.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the store fails.
    pub async fn reset(&self, thread_id: &str) -> Result<(), CoreError> {
        self.store.delete(thread_id).await.map_err(CoreError::Store)
    }

    /// Keeps only the newest `max` messages of the thread.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Store`] if the store fails.
    pub async fn truncate(&self, thread_id: &str, max: i64) -> Result<(), CoreError> {
        self.store
            .truncate(thread_id, max)
            .await
            .map_err(CoreError::Store)
    }

    async fn append(&self, thread_id: &str, message: Message) -> Result<(), CoreError> {
        self.store
            .append(thread_id, message)
            .await
            .map_err(CoreError::Store)
    }

    async fn run_tool_calls(&self, thread_id: &str, calls: &[ToolCall]) -> Result<(), CoreError> {
        for call in calls {
            let name = call.tool_name().unwrap_or(ToolError::UNKNOWN_TOOL);
            debug!("Tool Name: {name} (id: {})", call.id);
            debug!("Tool Arguments: {}", call.function.arguments);

            let content = match self.tools.execute(call).await {
                Ok(output) => {
                    debug!("Tool {name} executed successfully");
                    output
                }
                Err(e) => {
                    debug!("Tool {name} execution failed: {e}");
                    e.to_string()
                }
            };

            let result =
                Message::tool(content, call.id.clone(), name).map_err(CoreError::Message)?;
            self.append(thread_id, result).await?;
        }

        debug!(
            "Completed processing {} tool calls, continuing conversation",
            calls.len()
        );
        Ok(())
    }
}

fn final_reply(text: String, structured: bool) -> Reply {
    if !structured {
        return Reply::Text(text);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Reply::Structured(value),
        Err(e) => {
            warn!("Structured answer is not valid JSON ({e}); returning raw text");
            Reply::Text(text)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use parley_client::ClientError;
    use parley_common::chat::MessageRole;
    use parley_common::client::{ChatResponse, Config};
    use parley_tools::FunctionTool;

    /// Replays canned assistant messages and records every request.
    struct ScriptedClient {
        config: Config,
        script: Mutex<VecDeque<Result<Message>>>,
        /// Served once the script runs dry.
        fallback: Option<Message>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<Message>>) -> Self {
            Self {
                config: Config::new("http://localhost", "scripted"),
                script: Mutex::new(script.into()),
                fallback: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn replying(messages: Vec<Message>) -> Self {
            Self::new(messages.into_iter().map(Ok).collect())
        }

        fn always(message: Message) -> Self {
            let mut client = Self::new(Vec::new());
            client.fallback = Some(message);
            client
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> ChatRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        fn config(&self) -> &Config {
            &self.config
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self.script.lock().unwrap().pop_front();
            let message = match (next, &self.fallback) {
                (Some(reply), _) => reply?,
                (None, Some(fallback)) => fallback.clone(),
                (None, None) => anyhow::bail!("script exhausted"),
            };
            Ok(ChatResponse {
                message,
                model: self.config.model.clone(),
                usage: None,
                finish_reason: None,
                created_at: Utc::now(),
                response_id: None,
            })
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        let mut call = ToolCall::new(name, arguments);
        call.id = id.to_string();
        call
    }

    fn asks_for(calls: Vec<ToolCall>) -> Message {
        Message::assistant_tool_calls(calls)
    }

    fn registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.register_tool(FunctionTool::sync(
            "add",
            "Add two integers",
            json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
            |args| {
                let a = args.get("a").and_then(Value::as_i64).unwrap_or_default();
                let b = args.get("b").and_then(Value::as_i64).unwrap_or_default();
                Ok(json!(a + b))
            },
        ));
        registry.register_tool(FunctionTool::new(
            "lookup",
            "Look up a record",
            json!({"type": "object", "properties": {}}),
            |_| async { Ok(json!({"found": true})) },
        ));
        registry.register_tool(FunctionTool::sync(
            "explode",
            "Always fails",
            json!({"type": "object", "properties": {}}),
            |_| Err(anyhow::anyhow!("boom")),
        ));
        Arc::new(registry)
    }

    fn scripted_core(client: ScriptedClient) -> Core<Arc<ScriptedClient>> {
        Core::builder()
            .client(Arc::new(client))
            .tools(registry())
            .system_prompt("You are a test.")
            .build()
    }

    fn all_tools() -> GenerateOptions {
        GenerateOptions::builder()
            .enabled_tools(vec![
                "add".to_string(),
                "lookup".to_string(),
                "explode".to_string(),
            ])
            .build()
    }

    fn roles(history: &[Message]) -> Vec<MessageRole> {
        history.iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let core = scripted_core(ScriptedClient::replying(vec![Message::assistant("Hello!")]));

        let reply = core
            .generate("t", "Hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, Reply::Text("Hello!".to_string()));

        let history = core.history("t").await.unwrap();
        assert_eq!(
            roles(&history),
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        assert_eq!(history[0].text(), "You are a test.");
        assert_eq!(history[1].text(), "Hi");
    }

    #[tokio::test]
    async fn test_system_message_pinned_once() {
        let core = scripted_core(ScriptedClient::replying(vec![
            Message::assistant("one"),
            Message::assistant("two"),
        ]));

        for prompt in ["first", "second"] {
            core.generate("t", prompt, &GenerateOptions::default())
                .await
                .unwrap();
        }

        let history = core.history("t").await.unwrap();
        let systems = history
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(history[0].role, MessageRole::System);
        assert_eq!(history.len(), 5);
    }

    #[tokio::test]
    async fn test_system_message_repinned_after_truncate() {
        let core = scripted_core(ScriptedClient::replying(vec![
            Message::assistant("one"),
            Message::assistant("two"),
        ]));

        core.generate("t", "first", &GenerateOptions::default())
            .await
            .unwrap();
        core.truncate("t", 1).await.unwrap();
        assert_eq!(roles(&core.history("t").await.unwrap()), vec![MessageRole::Assistant]);

        core.generate("t", "second", &GenerateOptions::default())
            .await
            .unwrap();
        let history = core.history("t").await.unwrap();
        assert_eq!(history[0].role, MessageRole::System);
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_no_system_prompt() {
        let core = Core::builder()
            .client(ScriptedClient::replying(vec![Message::assistant("ok")]))
            .build();

        core.generate("t", "Hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(
            roles(&core.history("t").await.unwrap()),
            vec![MessageRole::User, MessageRole::Assistant]
        );
    }

    #[tokio::test]
    async fn test_tool_results_follow_call_order() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![
                call("call_a", "add", r#"{"a": 2, "b": 3}"#),
                call("call_b", "lookup", ""),
                call("call_c", "add", r#"{"a": 10, "b": -4}"#),
            ]),
            Message::assistant("done"),
        ]);
        let core = scripted_core(client);

        let reply = core.generate("t", "compute", &all_tools()).await.unwrap();
        assert_eq!(reply, Reply::Text("done".to_string()));

        let history = core.history("t").await.unwrap();
        assert_eq!(
            roles(&history),
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::Tool,
                MessageRole::Tool,
                MessageRole::Tool,
                MessageRole::Assistant,
            ]
        );

        let results: Vec<(&str, &str, &str)> = history[3..6]
            .iter()
            .map(|m| {
                (
                    m.tool_call_id.as_deref().unwrap(),
                    m.name.as_deref().unwrap(),
                    m.text(),
                )
            })
            .collect();
        assert_eq!(
            results,
            vec![
                ("call_a", "add", "5"),
                ("call_b", "lookup", r#"{"found":true}"#),
                ("call_c", "add", "6"),
            ]
        );
    }

    #[tokio::test]
    async fn test_each_turn_rereads_history() {
        let client = Arc::new(ScriptedClient::replying(vec![
            asks_for(vec![call("call_1", "lookup", "{}")]),
            Message::assistant("done"),
        ]));
        let core = Core::builder()
            .client(Arc::clone(&client))
            .tools(registry())
            .build();

        core.generate("t", "go", &all_tools()).await.unwrap();

        assert_eq!(client.calls(), 2);
        assert_eq!(client.request(0).messages.len(), 1);
        let second = client.request(1);
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[2].role, MessageRole::Tool);
    }

    #[tokio::test]
    async fn test_catalog_only_offers_enabled_registered_tools() {
        let client = Arc::new(ScriptedClient::replying(vec![Message::assistant("ok")]));
        let core = Core::builder()
            .client(Arc::clone(&client))
            .tools(registry())
            .build();

        let options = GenerateOptions::builder()
            .enabled_tools(vec!["lookup".to_string(), "missing".to_string()])
            .build();
        core.generate("t", "hi", &options).await.unwrap();

        let names: Vec<String> = client
            .request(0)
            .tools
            .unwrap()
            .into_iter()
            .map(|t| t.function.name)
            .collect();
        assert_eq!(names, vec!["lookup"]);
    }

    #[tokio::test]
    async fn test_no_enabled_tools_sends_no_catalog() {
        let client = Arc::new(ScriptedClient::replying(vec![Message::assistant("ok")]));
        let core = Core::builder()
            .client(Arc::clone(&client))
            .tools(registry())
            .build();

        core.generate("t", "hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert!(!client.request(0).has_tools());
    }

    #[tokio::test]
    async fn test_budget_always_tool_calls() {
        let client = Arc::new(ScriptedClient::always(asks_for(vec![call(
            "call_x", "lookup", "{}",
        )])));
        let executions = Arc::new(AtomicUsize::new(0));
        let registry = ToolRegistry::new();
        let counter = Arc::clone(&executions);
        registry.register_tool(FunctionTool::sync(
            "lookup",
            "Counted lookup",
            json!({"type": "object", "properties": {}}),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("again"))
            },
        ));
        let core = Core::builder()
            .client(Arc::clone(&client))
            .tools(Arc::new(registry))
            .build();

        let options = GenerateOptions::builder()
            .enabled_tools(vec!["lookup".to_string()])
            .max_tool_iterations(3)
            .build();
        let reply = core.generate("t", "loop", &options).await.unwrap();

        assert_eq!(reply, Reply::Exhausted(Exhaustion::ToolsPending));
        assert_eq!(
            reply.to_string(),
            "Max tool iterations reached before executing requested tools."
        );
        assert_eq!(client.calls(), 3);
        assert_eq!(executions.load(Ordering::SeqCst), 2);

        let history = core.history("t").await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.has_tool_calls());
    }

    #[tokio::test]
    async fn test_single_iteration_never_runs_tools() {
        let client = ScriptedClient::replying(vec![asks_for(vec![call(
            "call_1", "explode", "{}",
        )])]);
        let core = scripted_core(client);

        let options = GenerateOptions::builder()
            .enabled_tools(vec!["explode".to_string()])
            .max_tool_iterations(1)
            .build();
        let reply = core.generate("t", "go", &options).await.unwrap();

        assert_eq!(reply, Reply::Exhausted(Exhaustion::ToolsPending));
        let history = core.history("t").await.unwrap();
        assert!(history.iter().all(|m| m.role != MessageRole::Tool));
    }

    #[tokio::test]
    async fn test_zero_budget() {
        let client = Arc::new(ScriptedClient::replying(Vec::new()));
        let core = Core::builder().client(Arc::clone(&client)).build();

        let options = GenerateOptions::builder().max_tool_iterations(0).build();
        let reply = core.generate("t", "hi", &options).await.unwrap();

        assert_eq!(reply, Reply::Exhausted(Exhaustion::NoCompletion));
        assert_eq!(
            reply.to_string(),
            "Max tool iterations exhausted without completion."
        );
        assert_eq!(client.calls(), 0);
        assert_eq!(
            roles(&core.history("t").await.unwrap()),
            vec![MessageRole::User]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![call("call_1", "teleport", r#"{"to": "mars"}"#)]),
            Message::assistant("Sorry, I cannot do that."),
        ]);
        let core = scripted_core(client);

        let reply = core.generate("t", "go", &all_tools()).await.unwrap();
        assert_eq!(reply, Reply::Text("Sorry, I cannot do that.".to_string()));

        let history = core.history("t").await.unwrap();
        let result = &history[3];
        assert_eq!(result.role, MessageRole::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(result.name.as_deref(), Some("teleport"));
        assert_eq!(
            result.text(),
            "Error: Requested tool 'teleport' is not registered."
        );
    }

    #[tokio::test]
    async fn test_tool_result_keeps_missing_call_id() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![call("", "add", r#"{"a": 2, "b": 3}"#)]),
            Message::assistant("5"),
        ]);
        let core = scripted_core(client);

        core.generate("t", "go", &all_tools()).await.unwrap();
        let result = &core.history("t").await.unwrap()[3];
        assert_eq!(result.role, MessageRole::Tool);
        assert_eq!(result.tool_call_id.as_deref(), Some(""));
        assert_eq!(result.name.as_deref(), Some("add"));
        assert_eq!(result.text(), "5");
    }

    #[tokio::test]
    async fn test_disabled_tool_still_dispatched_if_registered() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![call("call_1", "add", r#"{"a": 1, "b": 1}"#)]),
            Message::assistant("2"),
        ]);
        let core = scripted_core(client);

        core.generate("t", "go", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(core.history("t").await.unwrap()[3].text(), "2");
    }

    #[tokio::test]
    async fn test_nameless_call_uses_unknown() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![call("call_1", "", "{}")]),
            Message::assistant("ok"),
        ]);
        let core = scripted_core(client);

        core.generate("t", "go", &all_tools()).await.unwrap();
        let result = &core.history("t").await.unwrap()[3];
        assert_eq!(result.name.as_deref(), Some("unknown"));
        assert_eq!(
            result.text(),
            "Error: Requested tool 'unknown' is not registered."
        );
    }

    #[tokio::test]
    async fn test_bad_arguments_and_failing_tool_recovered() {
        let client = ScriptedClient::replying(vec![
            asks_for(vec![
                call("call_1", "add", r#"{"a": 1,"#),
                call("call_2", "explode", "{}"),
                call("call_3", "add", r#"{"a": 1, "b": 2}"#),
            ]),
            Message::assistant("recovered"),
        ]);
        let core = scripted_core(client);

        let reply = core.generate("t", "go", &all_tools()).await.unwrap();
        assert_eq!(reply, Reply::Text("recovered".to_string()));

        let history = core.history("t").await.unwrap();
        assert!(
            history[3]
                .text()
                .starts_with("Error: invalid JSON for tool 'add': ")
        );
        assert_eq!(history[4].text(), "Error executing tool 'explode': boom");
        assert_eq!(history[5].text(), "3");
    }

    #[tokio::test]
    async fn test_structured_answer() {
        let client = Arc::new(ScriptedClient::replying(vec![Message::assistant(
            r#"{"city": "Oslo", "temp": 3}"#,
        )]));
        let core = Core::builder().client(Arc::clone(&client)).build();

        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}, "temp": {"type": "number"}}
        });
        let options = GenerateOptions::builder()
            .response_schema(schema.clone())
            .build();
        let reply = core.generate("t", "weather?", &options).await.unwrap();

        assert_eq!(reply, Reply::Structured(json!({"city": "Oslo", "temp": 3})));
        assert_eq!(
            client.request(0).response_format,
            Some(ResponseFormat::json_schema(schema))
        );
    }

    #[tokio::test]
    async fn test_structured_fallback_to_text() {
        let core = scripted_core(ScriptedClient::replying(vec![Message::assistant(
            "It is cold in Oslo.",
        )]));

        let options = GenerateOptions::builder()
            .response_schema(json!({"type": "object"}))
            .build();
        let reply = core.generate("t", "weather?", &options).await.unwrap();
        assert_eq!(reply, Reply::Text("It is cold in Oslo.".to_string()));
    }

    #[tokio::test]
    async fn test_params_forwarded() {
        let client = Arc::new(ScriptedClient::replying(vec![Message::assistant("ok")]));
        let core = Core::builder().client(Arc::clone(&client)).build();

        let mut params = serde_json::Map::new();
        params.insert("temperature".to_string(), json!(0.2));
        let options = GenerateOptions::builder().params(params).build();
        core.generate("t", "hi", &options).await.unwrap();

        assert_eq!(client.request(0).params["temperature"], json!(0.2));
    }

    #[tokio::test]
    async fn test_gateway_error_propagates() {
        let client = ScriptedClient::new(vec![Err(ClientError::InvalidResponse(
            "API returned no choices in response".to_string(),
        )
        .into())]);
        let core = scripted_core(client);

        let err = core
            .generate("t", "hi", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_gateway());
        assert!(err.to_string().contains("no choices"));

        let history = core.history("t").await.unwrap();
        assert_eq!(
            roles(&history),
            vec![MessageRole::System, MessageRole::User]
        );
    }

    #[tokio::test]
    async fn test_gateway_error_mid_loop_keeps_tool_results() {
        let client = ScriptedClient::new(vec![
            Ok(asks_for(vec![call("call_1", "lookup", "{}")])),
            Err(anyhow::anyhow!("connection reset")),
        ]);
        let core = scripted_core(client);

        let err = core.generate("t", "go", &all_tools()).await.unwrap_err();
        assert!(err.is_gateway());
        let history = core.history("t").await.unwrap();
        assert_eq!(history.last().unwrap().role, MessageRole::Tool);
    }

    #[tokio::test]
    async fn test_assistant_extras_stored_as_is() {
        let mut answer = Message::assistant("hi");
        answer.extra.insert("refusal".to_string(), Value::Null);
        let core = scripted_core(ScriptedClient::replying(vec![answer.clone()]));

        core.generate("t", "hi", &GenerateOptions::default())
            .await
            .unwrap();
        assert_eq!(core.history("t").await.unwrap().last(), Some(&answer));
    }

    #[tokio::test]
    async fn test_reset() {
        let core = scripted_core(ScriptedClient::replying(vec![Message::assistant("ok")]));
        core.generate("t", "hi", &GenerateOptions::default())
            .await
            .unwrap();

        core.reset("t").await.unwrap();
        assert!(core.history("t").await.unwrap().is_empty());
        core.reset("t").await.unwrap();
    }

    #[tokio::test]
    async fn test_threads_are_independent() {
        let core = scripted_core(ScriptedClient::replying(vec![
            Message::assistant("for a"),
            Message::assistant("for b"),
        ]));

        core.generate("a", "hi", &GenerateOptions::default())
            .await
            .unwrap();
        core.generate("b", "hi", &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(core.history("a").await.unwrap()[2].text(), "for a");
        assert_eq!(core.history("b").await.unwrap()[2].text(), "for b");
    }
}
