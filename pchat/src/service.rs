//! Conversation orchestration: the two-pass tool protocol over a provider registry.
//!
//! A turn appends the user message, asks the active provider for a reply with the
//! conversation's tool catalog, runs every requested tool in order, and, when any
//! ran, makes exactly one follow-up call without tools. Turns on one conversation
//! are serialized; different conversations proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use pcommon::{ConversationId, MetadataMap, TraceId};
use pprovider::{ChatChunk, Message, ModelResponse, ProviderRegistry, Role, ToolCall};
use ptooling::{ToolErrorKind, ToolExecutionContext, ToolRegistry, ToolResult, parse_arguments};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    ChatError, ChatEvent, ChatEventStream, Conversation, ConversationStore,
    InMemoryConversationStore, NoopTurnHooks, OrchestratorStats, ToolCallTrace, TurnHooks,
    TurnResult, TurnState,
};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. When a request needs live \
information or an action, call one of the provided tools and base your answer on its result.";

type TurnLock = Arc<tokio::sync::Mutex<()>>;

pub struct ConversationOrchestrator {
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    hooks: Arc<dyn TurnHooks>,
    system_prompt: String,
    turn_locks: Mutex<HashMap<ConversationId, TurnLock>>,
}

pub struct ConversationOrchestratorBuilder {
    providers: Arc<ProviderRegistry>,
    tools: Option<Arc<ToolRegistry>>,
    store: Option<Arc<dyn ConversationStore>>,
    hooks: Option<Arc<dyn TurnHooks>>,
    system_prompt: Option<String>,
}

impl ConversationOrchestratorBuilder {
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            providers,
            tools: None,
            store: None,
            hooks: None,
            system_prompt: None,
        }
    }

    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn build(self) -> ConversationOrchestrator {
        ConversationOrchestrator {
            providers: self.providers,
            tools: self.tools.unwrap_or_else(|| Arc::new(ToolRegistry::new())),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryConversationStore::new())),
            hooks: self.hooks.unwrap_or_else(|| Arc::new(NoopTurnHooks)),
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }
}

impl ConversationOrchestrator {
    pub fn new(providers: Arc<ProviderRegistry>, tools: Arc<ToolRegistry>) -> Self {
        Self::builder(providers).tools(tools).build()
    }

    pub fn builder(providers: Arc<ProviderRegistry>) -> ConversationOrchestratorBuilder {
        ConversationOrchestratorBuilder::new(providers)
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_str()
    }

    pub async fn create(&self) -> Result<ConversationId, ChatError> {
        self.create_with_metadata(MetadataMap::new()).await
    }

    /// Starts a conversation seeded with the system prompt and a snapshot of the
    /// tool catalog as it is now.
    pub async fn create_with_metadata(
        &self,
        metadata: MetadataMap,
    ) -> Result<ConversationId, ChatError> {
        let id = ConversationId::new(Uuid::new_v4().to_string());
        let tools = self.tools.definitions()?;
        let tool_count = tools.len();

        self.store
            .insert(
                Conversation::new(id.clone(), self.system_prompt.clone())
                    .with_tools(tools)
                    .with_metadata(metadata),
            )
            .await?;

        tracing::debug!(conversation_id = %id, tools = tool_count, "conversation created");
        Ok(id)
    }

    pub async fn get(&self, id: &ConversationId) -> Result<Conversation, ChatError> {
        self.require(id).await
    }

    pub async fn delete(&self, id: &ConversationId) -> Result<(), ChatError> {
        if !self.store.remove(id).await? {
            return Err(not_found(id));
        }

        self.locks()?.remove(id);
        tracing::debug!(conversation_id = %id, "conversation deleted");
        Ok(())
    }

    pub async fn stats(&self) -> Result<OrchestratorStats, ChatError> {
        let (conversations, total_messages) = self.store.totals().await?;
        Ok(OrchestratorStats {
            conversations,
            total_messages,
            available_tools: self.tools.stats()?.tools,
        })
    }

    /// Runs one turn and returns the final reply with the tools that ran.
    ///
    /// On error the turn stops; messages appended so far stay in the transcript.
    pub async fn send(&self, id: &ConversationId, text: &str) -> Result<TurnResult, ChatError> {
        let started = Instant::now();
        let result = self.run_turn(id, text).await;

        match &result {
            Ok(turn) => {
                tracing::debug!(
                    conversation_id = %id,
                    tool_calls = turn.tool_calls.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn complete"
                );
                self.hooks.on_turn_complete(id, turn, started.elapsed());
            }
            Err(error) => {
                tracing::warn!(conversation_id = %id, error = %error, "turn failed");
                self.hooks.on_turn_failure(id, error, started.elapsed());
            }
        }

        result
    }

    pub async fn send_text(&self, id: &ConversationId, text: &str) -> Result<String, ChatError> {
        Ok(self.send(id, text).await?.reply)
    }

    /// Streaming form of [`ConversationOrchestrator::send`].
    ///
    /// Emits text deltas of each provider pass, one event per executed tool call,
    /// and finally `TurnComplete`. Errors end the stream.
    pub fn stream<'a>(&'a self, id: &'a ConversationId, text: &'a str) -> ChatEventStream<'a> {
        let started = Instant::now();
        let hooks = Arc::clone(&self.hooks);

        Box::pin(self.stream_turn(id, text).inspect(move |item| match item {
            Ok(ChatEvent::TurnComplete(turn)) => {
                hooks.on_turn_complete(id, turn, started.elapsed())
            }
            Err(error) => hooks.on_turn_failure(id, error, started.elapsed()),
            Ok(_) => {}
        }))
    }

    async fn run_turn(&self, id: &ConversationId, text: &str) -> Result<TurnResult, ChatError> {
        validate_text(text)?;
        let _guard = self.acquire(id).await?;
        let conversation = self.require(id).await?;
        let trace_id = TraceId::new(Uuid::new_v4().to_string());
        let mut transcript = conversation.messages;

        self.enter(id, TurnState::Received);
        self.append(id, &mut transcript, Message::new(Role::User, text))
            .await?;

        self.enter(id, TurnState::ProviderCallPending);
        let first = self
            .providers
            .chat(transcript.clone(), conversation.tools.clone())
            .await?;
        let calls = first.tool_calls();
        let mut usage = first.usage;
        self.append_reply(id, &mut transcript, &first).await?;

        if calls.is_empty() {
            self.enter(id, TurnState::Complete);
            return Ok(TurnResult {
                conversation_id: id.clone(),
                reply: first.text(),
                tool_calls: Vec::new(),
                usage,
            });
        }

        self.enter(id, TurnState::ToolCallsRequested);
        let traces = self
            .execute_tool_calls(id, &trace_id, &calls, &mut transcript)
            .await?;

        self.enter(id, TurnState::FollowupPending);
        let followup = self.providers.chat(transcript.clone(), Vec::new()).await?;
        usage.accumulate(followup.usage);
        self.append_reply(id, &mut transcript, &followup).await?;

        self.enter(id, TurnState::Complete);
        Ok(TurnResult {
            conversation_id: id.clone(),
            reply: followup.text(),
            tool_calls: traces,
            usage,
        })
    }

    fn stream_turn<'a>(
        &'a self,
        id: &'a ConversationId,
        text: &'a str,
    ) -> impl Stream<Item = Result<ChatEvent, ChatError>> + Send + 'a {
        try_stream! {
            validate_text(text)?;
            let _guard = self.acquire(id).await?;
            let conversation = self.require(id).await?;
            let trace_id = TraceId::new(Uuid::new_v4().to_string());
            let mut transcript = conversation.messages;

            self.enter(id, TurnState::Received);
            self.append(id, &mut transcript, Message::new(Role::User, text)).await?;

            self.enter(id, TurnState::ProviderCallPending);
            let mut chunks = self
                .providers
                .stream_chat(transcript.clone(), conversation.tools.clone())?;
            let mut first = None;
            while let Some(chunk) = chunks.next().await {
                match chunk? {
                    ChatChunk::Delta(delta) if delta.is_empty() => {}
                    ChatChunk::Delta(delta) => {
                        yield ChatEvent::TextDelta(delta);
                    }
                    ChatChunk::Done(response) => first = Some(response),
                }
            }
            let first = first.ok_or_else(incomplete_stream)?;
            let calls = first.tool_calls();
            let mut usage = first.usage;
            self.append_reply(id, &mut transcript, &first).await?;

            let mut traces = Vec::new();
            let mut reply = first.text();
            if !calls.is_empty() {
                self.enter(id, TurnState::ToolCallsRequested);
                traces = self
                    .execute_tool_calls(id, &trace_id, &calls, &mut transcript)
                    .await?;
                for trace in &traces {
                    yield ChatEvent::ToolCall(trace.clone());
                }

                self.enter(id, TurnState::FollowupPending);
                let mut chunks = self.providers.stream_chat(transcript.clone(), Vec::new())?;
                let mut followup = None;
                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        ChatChunk::Delta(delta) if delta.is_empty() => {}
                        ChatChunk::Delta(delta) => {
                            yield ChatEvent::TextDelta(delta);
                        }
                        ChatChunk::Done(response) => followup = Some(response),
                    }
                }
                let followup = followup.ok_or_else(incomplete_stream)?;
                usage.accumulate(followup.usage);
                reply = followup.text();
                self.append_reply(id, &mut transcript, &followup).await?;
            }

            self.enter(id, TurnState::Complete);
            yield ChatEvent::TurnComplete(TurnResult {
                conversation_id: id.clone(),
                reply,
                tool_calls: traces,
                usage,
            });
        }
    }

    async fn execute_tool_calls(
        &self,
        id: &ConversationId,
        trace_id: &TraceId,
        calls: &[ToolCall],
        transcript: &mut Vec<Message>,
    ) -> Result<Vec<ToolCallTrace>, ChatError> {
        self.enter(id, TurnState::ExecutingTools);

        let mut traces = Vec::with_capacity(calls.len());
        for call in calls {
            let trace = self.run_tool_call(id, trace_id, call).await?;
            self.append(
                id,
                transcript,
                Message::tool_result(call.id.clone(), trace.output.to_string()),
            )
            .await?;
            self.hooks.on_tool_call(id, &trace);
            traces.push(trace);
        }

        Ok(traces)
    }

    async fn run_tool_call(
        &self,
        id: &ConversationId,
        trace_id: &TraceId,
        call: &ToolCall,
    ) -> Result<ToolCallTrace, ChatError> {
        let context = ToolExecutionContext::new(id)
            .with_tool_call_id(call.id.clone())
            .with_trace_id(trace_id);

        let result = match parse_arguments(&call.arguments) {
            Err(error) => ToolResult::failure(error.message, Duration::ZERO),
            Ok(params) => match self.tools.dispatch(&call.name, params, &context).await {
                Ok(result) => result,
                Err(error) if error.kind == ToolErrorKind::NotFound => {
                    ToolResult::failure(error.message, Duration::ZERO)
                }
                Err(error) => return Err(error.into()),
            },
        };

        tracing::debug!(
            conversation_id = %id,
            tool_call_id = %call.id,
            tool = %call.name,
            success = result.is_success(),
            elapsed_ms = result.execution_time.as_millis() as u64,
            "tool call finished"
        );

        Ok(ToolCallTrace {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            success: result.is_success(),
            output: result.to_payload(),
            execution_time: result.execution_time,
        })
    }

    async fn append_reply(
        &self,
        id: &ConversationId,
        transcript: &mut Vec<Message>,
        response: &ModelResponse,
    ) -> Result<(), ChatError> {
        let message =
            Message::new(Role::Assistant, response.text()).with_tool_calls(response.tool_calls());
        self.append(id, transcript, message).await
    }

    async fn append(
        &self,
        id: &ConversationId,
        transcript: &mut Vec<Message>,
        message: Message,
    ) -> Result<(), ChatError> {
        let message = message.stamped();
        self.store
            .append_messages(id, vec![message.clone()])
            .await?;
        transcript.push(message);
        Ok(())
    }

    fn enter(&self, id: &ConversationId, state: TurnState) {
        tracing::trace!(conversation_id = %id, state = state.as_str(), "turn state");
        self.hooks.on_state_change(id, state);
    }

    async fn require(&self, id: &ConversationId) -> Result<Conversation, ChatError> {
        self.store.load(id).await?.ok_or_else(|| not_found(id))
    }

    /// Waits for exclusive access to a known conversation.
    async fn acquire(&self, id: &ConversationId) -> Result<OwnedMutexGuard<()>, ChatError> {
        self.require(id).await?;
        let lock = Arc::clone(self.locks()?.entry(id.clone()).or_default());
        Ok(lock.lock_owned().await)
    }

    fn locks(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ConversationId, TurnLock>>, ChatError> {
        self.turn_locks
            .lock()
            .map_err(|_| ChatError::store("turn lock table poisoned"))
    }
}

fn validate_text(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::invalid_request("message text must not be empty"));
    }
    Ok(())
}

fn not_found(id: &ConversationId) -> ChatError {
    ChatError::not_found(format!("conversation '{id}' does not exist"))
}

fn incomplete_stream() -> ChatError {
    ChatError::provider("provider stream ended without a final response")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use pprovider::{
        ModelConfig, ModelProvider, ModelRequest, OutputItem, ProviderDescriptor, ProviderError,
        ProviderFuture, ProviderId, StopReason, TokenUsage, ToolDefinition, ToolSchema,
    };
    use ptooling::StaticBundle;
    use serde_json::{Value, json};

    use super::*;
    use crate::ChatErrorKind;

    struct ScriptedProvider {
        replies: StdMutex<Vec<ModelResponse>>,
        requests: Arc<StdMutex<Vec<ModelRequest>>>,
    }

    impl ModelProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("scripted")
        }

        fn complete<'a>(
            &'a self,
            request: ModelRequest,
        ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
            Box::pin(async move {
                self.requests
                    .lock()
                    .expect("requests lock")
                    .push(request);
                let mut replies = self.replies.lock().expect("replies lock");
                if replies.is_empty() {
                    return Err(ProviderError::upstream(500, "script exhausted"));
                }
                Ok(replies.remove(0))
            })
        }
    }

    fn response(output: Vec<OutputItem>) -> ModelResponse {
        ModelResponse {
            provider: ProviderId::new("scripted"),
            model: "script-1".to_string(),
            output,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: 3,
                output_tokens: 2,
                total_tokens: 5,
            },
        }
    }

    fn text(content: &str) -> ModelResponse {
        response(vec![OutputItem::Message(Message::new(
            Role::Assistant,
            content,
        ))])
    }

    fn call(id: &str, name: &str, arguments: &str) -> ModelResponse {
        response(vec![OutputItem::ToolCall(ToolCall::new(id, name, arguments))])
    }

    fn orchestrator(
        replies: Vec<ModelResponse>,
    ) -> (ConversationOrchestrator, Arc<StdMutex<Vec<ModelRequest>>>) {
        let requests = Arc::new(StdMutex::new(Vec::new()));
        let script = Arc::new(ScriptedProvider {
            replies: StdMutex::new(replies),
            requests: Arc::clone(&requests),
        });

        let providers = Arc::new(ProviderRegistry::new());
        providers
            .register(ProviderDescriptor::new("scripted", "Scripted", move |_config| {
                Ok(Arc::clone(&script) as Arc<dyn ModelProvider>)
            }))
            .expect("register provider");
        providers
            .set_active(ModelConfig::new("scripted", "script-1"))
            .expect("activate provider");

        let tools = Arc::new(ToolRegistry::new());
        tools
            .register(StaticBundle::new("echo").with_sync_fn(
                ToolDefinition::new(
                    "echo_tool",
                    "Echoes text",
                    ToolSchema::new().required_property("text", json!({"type": "string"})),
                ),
                |params, _ctx| Ok(json!({"echo": params["text"].clone()})),
            ))
            .expect("register tools");

        (ConversationOrchestrator::new(providers, tools), requests)
    }

    #[tokio::test]
    async fn plain_reply_adds_two_messages() {
        let (orchestrator, requests) = orchestrator(vec![text("hello there")]);
        let id = orchestrator.create().await.expect("create");

        let turn = orchestrator.send(&id, "hello").await.expect("send");
        assert!(turn.reply.contains("hello"));
        assert!(turn.tool_calls.is_empty());

        let conversation = orchestrator.get(&id).await.expect("get");
        assert_eq!(conversation.messages.len(), 3);
        assert_eq!(conversation.messages[1].role, Role::User);
        assert_eq!(conversation.messages[2].role, Role::Assistant);

        let sent = requests.lock().expect("requests lock");
        assert_eq!(sent[0].tools.len(), 1);
        assert_eq!(sent[0].messages[0].role, Role::System);
    }

    #[tokio::test]
    async fn tool_call_round_trip_records_result_before_final_reply() {
        let (orchestrator, requests) = orchestrator(vec![
            call("c1", "echo_tool", r#"{"text":"ping"}"#),
            text("the tool said ping"),
        ]);
        let id = orchestrator.create().await.expect("create");

        let turn = orchestrator.send(&id, "use the tool").await.expect("send");
        assert_eq!(turn.reply, "the tool said ping");
        assert_eq!(turn.tool_calls.len(), 1);
        assert!(turn.tool_calls[0].success);
        assert_eq!(turn.usage.total_tokens, 10);

        let messages = orchestrator.get(&id).await.expect("get").messages;
        let roles = messages.iter().map(|m| m.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(messages[2].tool_calls[0].id, "c1");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("c1"));
        let payload: Value = serde_json::from_str(&messages[3].content).expect("payload json");
        assert_eq!(payload, json!({"success": true, "data": {"echo": "ping"}}));

        let sent = requests.lock().expect("requests lock");
        assert_eq!(sent.len(), 2);
        assert!(sent[1].tools.is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_become_failure_payloads() {
        let (orchestrator, _requests) = orchestrator(vec![
            response(vec![
                OutputItem::ToolCall(ToolCall::new("c1", "missing_tool", "{}")),
                OutputItem::ToolCall(ToolCall::new("c2", "echo_tool", "not json")),
            ]),
            text("sorry"),
        ]);
        let id = orchestrator.create().await.expect("create");

        let turn = orchestrator.send(&id, "try tools").await.expect("send");
        assert_eq!(turn.tool_calls.len(), 2);
        assert!(turn.tool_calls.iter().all(|trace| !trace.success));
        assert!(
            turn.tool_calls[0].output["error"]
                .as_str()
                .is_some_and(|error| error.contains("missing_tool"))
        );
    }

    #[tokio::test]
    async fn validation_errors_come_before_provider_calls() {
        let (orchestrator, requests) = orchestrator(vec![text("unused")]);
        let id = orchestrator.create().await.expect("create");

        let empty = orchestrator.send(&id, "  ").await.expect_err("empty text");
        assert_eq!(empty.kind, ChatErrorKind::InvalidRequest);

        let missing = orchestrator
            .send(&ConversationId::new("nope"), "hi")
            .await
            .expect_err("unknown conversation");
        assert_eq!(missing.kind, ChatErrorKind::NotFound);
        assert!(requests.lock().expect("requests lock").is_empty());
    }

    #[tokio::test]
    async fn provider_failure_keeps_partial_transcript() {
        let (orchestrator, _requests) = orchestrator(Vec::new());
        let id = orchestrator.create().await.expect("create");

        let error = orchestrator.send(&id, "hi").await.expect_err("upstream fails");
        assert_eq!(error.kind, ChatErrorKind::Provider);
        assert_eq!(error.status, Some(500));
        assert_eq!(orchestrator.get(&id).await.expect("get").messages.len(), 2);
    }

    #[tokio::test]
    async fn delete_and_stats_track_conversations() {
        let (orchestrator, _requests) = orchestrator(vec![text("one")]);
        let first = orchestrator.create().await.expect("create");
        let second = orchestrator.create().await.expect("create");
        orchestrator.send(&first, "hi").await.expect("send");

        let stats = orchestrator.stats().await.expect("stats");
        assert_eq!(
            stats,
            OrchestratorStats {
                conversations: 2,
                total_messages: 4,
                available_tools: 1
            }
        );

        orchestrator.delete(&second).await.expect("delete");
        let error = orchestrator.delete(&second).await.expect_err("already gone");
        assert_eq!(error.kind, ChatErrorKind::NotFound);
    }

    #[tokio::test]
    async fn stream_emits_deltas_tool_events_and_completion() {
        let (orchestrator, _requests) = orchestrator(vec![
            call("c1", "echo_tool", r#"{"text":"pong"}"#),
            text("done"),
        ]);
        let id = orchestrator.create().await.expect("create");

        let events = orchestrator
            .stream(&id, "stream it")
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("stream should succeed");

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], ChatEvent::ToolCall(trace) if trace.id == "c1"));
        assert_eq!(events[1], ChatEvent::TextDelta("done".to_string()));
        assert!(matches!(&events[2], ChatEvent::TurnComplete(turn) if turn.reply == "done"));
    }
}
