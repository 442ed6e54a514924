//! Streaming callback contract.
//!
//! A streaming invocation reports progress through [`StreamCallbacks`]:
//! `on_start` at most once, `on_token` zero or more times in arrival order,
//! then exactly one of `on_complete` / `on_error`. Adapters never talk to the
//! caller's callbacks directly; they go through a [`StreamRelay`], which keeps
//! those guarantees even when an adapter hits an unexpected code path.

use crate::error::GatewayError;
use crate::provider::ModelProvider;
use crate::request::ModelInvocationRequest;
use crate::response::UsageReport;
use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;

/// Observer for a streaming invocation
pub trait StreamCallbacks: Send {
    /// Generation started
    fn on_start(&mut self) {}

    /// A new chunk of text arrived
    fn on_token(&mut self, _token: &str) {}

    /// Generation finished; `full_text` is the concatenation of all tokens
    fn on_complete(&mut self, full_text: String, usage: UsageReport);

    /// Generation failed
    fn on_error(&mut self, error: GatewayError);
}

/// Streaming progress as a value
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Generation started
    Start,
    /// Text delta
    Token(String),
    /// Terminal success
    Complete {
        /// Full generated text
        content: String,
        /// Usage, if any chunk reported it
        usage: UsageReport,
    },
    /// Terminal failure
    Error(GatewayError),
}

impl StreamEvent {
    /// Whether this event ends the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error(_))
    }
}

/// Records every event; handy for buffering a whole stream
impl StreamCallbacks for Vec<StreamEvent> {
    fn on_start(&mut self) {
        self.push(StreamEvent::Start);
    }

    fn on_token(&mut self, token: &str) {
        self.push(StreamEvent::Token(token.to_string()));
    }

    fn on_complete(&mut self, full_text: String, usage: UsageReport) {
        self.push(StreamEvent::Complete {
            content: full_text,
            usage,
        });
    }

    fn on_error(&mut self, error: GatewayError) {
        self.push(StreamEvent::Error(error));
    }
}

/// Forwards events into an unbounded channel.
///
/// Dropping the receiving side is how a caller stops consuming a stream;
/// events sent after that are discarded.
#[derive(Debug, Clone)]
pub struct ChannelCallbacks {
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelCallbacks {
    /// Create callbacks and the matching receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, event: StreamEvent) {
        // Receiver gone means the caller stopped listening.
        let _ = self.sender.unbounded_send(event);
    }
}

impl StreamCallbacks for ChannelCallbacks {
    fn on_start(&mut self) {
        self.send(StreamEvent::Start);
    }

    fn on_token(&mut self, token: &str) {
        self.send(StreamEvent::Token(token.to_string()));
    }

    fn on_complete(&mut self, full_text: String, usage: UsageReport) {
        self.send(StreamEvent::Complete {
            content: full_text,
            usage,
        });
    }

    fn on_error(&mut self, error: GatewayError) {
        self.send(StreamEvent::Error(error));
    }
}

/// Run a streaming invocation on a background task and expose it as a stream
/// of events. The stream ends after the terminal event.
pub fn stream_events(
    provider: Arc<dyn ModelProvider>,
    request: ModelInvocationRequest,
) -> BoxStream<'static, StreamEvent> {
    let (mut callbacks, receiver) = ChannelCallbacks::channel();
    tokio::spawn(async move {
        provider.invoke_streaming(&request, &mut callbacks).await;
    });
    receiver.boxed()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Idle,
    Streaming,
    Finished,
}

/// Ordering guard between an adapter and the caller's callbacks.
///
/// The relay accumulates the full text, swallows anything emitted after the
/// terminal event and, if dropped before finishing, reports a streaming error
/// so the caller always sees exactly one terminal callback.
pub struct StreamRelay<'a> {
    callbacks: &'a mut dyn StreamCallbacks,
    state: RelayState,
    text: String,
}

impl<'a> StreamRelay<'a> {
    /// Wrap caller callbacks
    pub fn new(callbacks: &'a mut dyn StreamCallbacks) -> Self {
        Self {
            callbacks,
            state: RelayState::Idle,
            text: String::new(),
        }
    }

    /// Signal start; ignored after the first token or a second call
    pub fn start(&mut self) {
        if self.state == RelayState::Idle {
            self.state = RelayState::Streaming;
            self.callbacks.on_start();
        }
    }

    /// Forward a token; empty tokens are dropped
    pub fn token(&mut self, token: &str) {
        if self.state == RelayState::Finished || token.is_empty() {
            return;
        }
        self.state = RelayState::Streaming;
        self.text.push_str(token);
        self.callbacks.on_token(token);
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether a terminal event was sent
    pub fn is_finished(&self) -> bool {
        self.state == RelayState::Finished
    }

    /// Finish successfully with the accumulated text
    pub fn complete(&mut self, usage: UsageReport) {
        if self.state == RelayState::Finished {
            return;
        }
        self.state = RelayState::Finished;
        let text = std::mem::take(&mut self.text);
        self.callbacks.on_complete(text, usage);
    }

    /// Finish with an error
    pub fn error(&mut self, error: GatewayError) {
        if self.state == RelayState::Finished {
            return;
        }
        self.state = RelayState::Finished;
        self.callbacks.on_error(error);
    }
}

impl Drop for StreamRelay<'_> {
    fn drop(&mut self) {
        if self.state != RelayState::Finished {
            self.error(GatewayError::streaming("stream ended without completion"));
        }
    }
}
