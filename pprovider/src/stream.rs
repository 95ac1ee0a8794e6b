//! Streaming event contracts and the cancellable chat stream.
//!
//! ```rust
//! use pprovider::{BoxedEventStream, StreamEvent, VecEventStream};
//!
//! let stream = VecEventStream::new(vec![Ok(StreamEvent::TextDelta("hello".into()))]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::stream::{AbortHandle, Abortable};

use crate::{Message, ModelResponse, ProviderError, ToolCall};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ToolCallDelta(ToolCall),
    MessageComplete(Message),
    ResponseComplete(ModelResponse),
}

/// Provider stream contract.
///
/// Invariants for consumers:
/// - Events are emitted in source order.
/// - `TextDelta` and `ToolCallDelta` may appear zero or more times.
/// - `ResponseComplete`, when present, is the last event.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait ModelEventStream: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

impl<T> ModelEventStream for T where T: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

pub type BoxedEventStream<'a> = Pin<Box<dyn ModelEventStream + 'a>>;

#[derive(Debug)]
pub struct VecEventStream {
    events: VecDeque<Result<StreamEvent, ProviderError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<StreamEvent, ProviderError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecEventStream {
    type Item = Result<StreamEvent, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamEvent, ProviderError>>> {
        Poll::Ready(self.events.pop_front())
    }
}

/// Item of a [`ChatStream`]: text deltas followed by exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatChunk {
    Delta(String),
    Done(ModelResponse),
}

type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, ProviderError>> + Send>>;

/// Finite, cancellable stream returned by `ProviderRegistry::stream_chat`.
///
/// Aborting through [`ChatStream::abort_handle`] ends the stream at the next poll.
pub struct ChatStream {
    inner: Abortable<ChunkStream>,
    handle: AbortHandle,
}

impl ChatStream {
    pub(crate) fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<ChatChunk, ProviderError>> + Send + 'static,
    {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            inner: Abortable::new(Box::pin(stream), registration),
            handle,
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.is_aborted()
    }
}

impl Stream for ChatStream {
    type Item = Result<ChatChunk, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("aborted", &self.inner.is_aborted())
            .finish()
    }
}
