/// Creates a single chat [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use parley::{Role, parley_msg};
///
/// let message = parley_msg!(assistant => "Done.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Done.");
/// ```
#[macro_export]
macro_rules! parley_msg {
    (system => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::System, $content)
    };
    (user => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::User, $content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::new($crate::Role::Assistant, $content)
    };
    (tool [$call_id:expr] => $content:expr $(,)?) => {
        $crate::Message::tool_result($call_id, $content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use system, user, assistant, or tool [call_id]");
    };
}

/// Creates a `Vec<Message>` from role/content pairs.
///
/// ```rust
/// use parley::{Role, parley_messages};
///
/// let messages = parley_messages![
///     system => "You are concise.",
///     user => "What time is it?",
/// ];
///
/// assert_eq!(messages.len(), 2);
/// assert_eq!(messages[0].role, Role::System);
/// assert_eq!(messages[1].role, Role::User);
/// ```
#[macro_export]
macro_rules! parley_messages {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::parley_msg!($role => $content)),+]
    };
}

/// Creates a [`GatewayRequest`](crate::GatewayRequest) with provider shorthand support.
///
/// ```rust
/// use parley::parley_request;
///
/// let request = parley_request!("hello", claude, "claude-3-5-haiku-latest");
/// assert_eq!(request.provider.as_deref(), Some("anthropic"));
/// assert_eq!(request.model.as_deref(), Some("claude-3-5-haiku-latest"));
/// ```
#[macro_export]
macro_rules! parley_request {
    ($message:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
    };
    ($message:expr, openai $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider("openai")
    };
    ($message:expr, anthropic $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider("anthropic")
    };
    ($message:expr, claude $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider("anthropic")
    };
    ($message:expr, ollama $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider("ollama")
    };
    ($message:expr, local $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider("ollama")
    };
    ($message:expr, $provider:expr $(,)?) => {
        $crate::GatewayRequest::new($message).with_provider($provider)
    };
    ($message:expr, openai, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider("openai")
            .with_model($model)
    };
    ($message:expr, anthropic, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider("anthropic")
            .with_model($model)
    };
    ($message:expr, claude, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider("anthropic")
            .with_model($model)
    };
    ($message:expr, ollama, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider("ollama")
            .with_model($model)
    };
    ($message:expr, local, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider("ollama")
            .with_model($model)
    };
    ($message:expr, $provider:expr, $model:expr $(,)?) => {
        $crate::GatewayRequest::new($message)
            .with_provider($provider)
            .with_model($model)
    };
}
