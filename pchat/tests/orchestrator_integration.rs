use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pchat::prelude::*;
use pprovider::{
    Message, ModelConfig, ModelProvider, ModelRequest, ModelResponse, OutputItem,
    ProviderDescriptor, ProviderError, ProviderFuture, ProviderId, ProviderRegistry, Role,
    StopReason, TokenUsage, ToolCall,
};
use ptooling::builtins::builtin_source;

/// Echoes the latest user message, or summarizes the latest tool result.
struct EchoProvider {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl EchoProvider {
    fn new(delay: Duration) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        }
    }
}

impl ModelProvider for EchoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("echo")
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let last = request.messages.last().cloned().unwrap_or_else(|| {
                Message::new(Role::User, "")
            });
            let output = match last.role {
                Role::User if last.content.contains("time") => {
                    vec![OutputItem::ToolCall(ToolCall::new("c1", "get_time", ""))]
                }
                Role::Tool => vec![OutputItem::Message(Message::new(
                    Role::Assistant,
                    format!("tool replied {}", last.content),
                ))],
                _ => vec![OutputItem::Message(Message::new(
                    Role::Assistant,
                    format!("you said: {}", last.content),
                ))],
            };

            Ok(ModelResponse {
                provider: self.id(),
                model: request.model,
                output,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage::default(),
            })
        })
    }
}

#[derive(Default)]
struct StateRecorder {
    states: Mutex<Vec<TurnState>>,
    failures: AtomicUsize,
}

impl TurnHooks for StateRecorder {
    fn on_state_change(&self, _conversation_id: &ConversationId, state: TurnState) {
        self.states.lock().expect("states lock").push(state);
    }

    fn on_turn_failure(
        &self,
        _conversation_id: &ConversationId,
        _error: &ChatError,
        _elapsed: Duration,
    ) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }
}

async fn gateway(
    provider: Arc<EchoProvider>,
    hooks: Arc<StateRecorder>,
) -> Arc<ConversationOrchestrator> {
    let providers = Arc::new(ProviderRegistry::new());
    providers
        .register(ProviderDescriptor::new("echo", "Echo", move |_config| {
            Ok(Arc::clone(&provider) as Arc<dyn ModelProvider>)
        }))
        .expect("register");
    providers
        .set_active(ModelConfig::new("echo", "echo-1"))
        .expect("activate");

    let tools = Arc::new(ToolRegistry::new());
    tools
        .load(Arc::new(builtin_source()))
        .await
        .expect("load builtins");

    Arc::new(
        ConversationOrchestrator::builder(providers)
            .tools(tools)
            .hooks(hooks)
            .system_prompt("test assistant")
            .build(),
    )
}

#[tokio::test]
async fn get_time_tool_flows_through_a_turn() {
    let hooks = Arc::new(StateRecorder::default());
    let orchestrator = gateway(Arc::new(EchoProvider::new(Duration::ZERO)), hooks.clone()).await;
    let id = orchestrator.create().await.expect("create");

    let turn = orchestrator
        .send(&id, "what time is it?")
        .await
        .expect("turn succeeds");

    assert_eq!(turn.tool_calls.len(), 1);
    assert_eq!(turn.tool_calls[0].name, "get_time");
    assert!(turn.tool_calls[0].success);
    assert!(turn.reply.starts_with("tool replied"));
    assert!(turn.reply.contains("\"now\""));

    assert_eq!(
        *hooks.states.lock().expect("states lock"),
        vec![
            TurnState::Received,
            TurnState::ProviderCallPending,
            TurnState::ToolCallsRequested,
            TurnState::ExecutingTools,
            TurnState::FollowupPending,
            TurnState::Complete,
        ]
    );
}

#[tokio::test]
async fn interleaved_conversations_do_not_leak() {
    let hooks = Arc::new(StateRecorder::default());
    let orchestrator = gateway(
        Arc::new(EchoProvider::new(Duration::from_millis(5))),
        hooks,
    )
    .await;

    let alpha = orchestrator.create().await.expect("create alpha");
    let beta = orchestrator.create().await.expect("create beta");

    let mut tasks = Vec::new();
    for round in 0..3 {
        for (id, label) in [(alpha.clone(), "alpha"), (beta.clone(), "beta")] {
            let orchestrator = Arc::clone(&orchestrator);
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .send(&id, &format!("{label}-{round}"))
                    .await
                    .expect("send")
            }));
        }
    }
    for task in tasks {
        task.await.expect("task");
    }

    for (id, label, other) in [(&alpha, "alpha", "beta"), (&beta, "beta", "alpha")] {
        let conversation = orchestrator.get(id).await.expect("get");
        assert_eq!(conversation.messages.len(), 7);
        assert!(
            conversation
                .messages
                .iter()
                .skip(1)
                .all(|message| message.content.contains(label) && !message.content.contains(other))
        );
    }
}

#[tokio::test]
async fn turns_on_one_conversation_are_serialized() {
    let provider = Arc::new(EchoProvider::new(Duration::from_millis(10)));
    let orchestrator = gateway(Arc::clone(&provider), Arc::new(StateRecorder::default())).await;
    let id = orchestrator.create().await.expect("create");

    let mut tasks = Vec::new();
    for index in 0..4 {
        let orchestrator = Arc::clone(&orchestrator);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            orchestrator
                .send(&id, &format!("message {index}"))
                .await
                .expect("send")
        }));
    }
    for task in tasks {
        task.await.expect("task");
    }

    assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 1);
    let messages = orchestrator.get(&id).await.expect("get").messages;
    assert_eq!(messages.len(), 9);
    for pair in messages[1..].chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].content, format!("you said: {}", pair[0].content));
    }
}

#[tokio::test]
async fn missing_active_provider_fails_the_turn() {
    let hooks = Arc::new(StateRecorder::default());
    let orchestrator = gateway(Arc::new(EchoProvider::new(Duration::ZERO)), hooks.clone()).await;
    orchestrator
        .providers()
        .clear_active()
        .expect("clear active");
    let id = orchestrator.create().await.expect("create");

    let error = orchestrator.send(&id, "hello").await.expect_err("no provider");
    assert_eq!(error.kind, ChatErrorKind::Provider);
    assert_eq!(hooks.failures.load(Ordering::SeqCst), 1);
}
