use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{ChatError, TransportError};
use crate::event::StreamEvent;
use crate::render::{ReasoningSource, RenderPort, STOPPED_ANNOTATION, SidebarRegistry};
use crate::request::ChatRequest;
use crate::response::AccumulatedResponse;
use crate::sse::event_stream;
use crate::transport::ChatTransport;

/// Handle used to stop a running turn.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation.
    ///
    /// The consume loop observes it at its next await on the transport and
    /// ends the turn as `TurnOutcome::Stopped`. Calling it again, or after
    /// the turn has ended, does nothing.
    pub fn cancel(&self) {
        let changed = self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
        if changed {
            debug!("turn cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// `[DONE]` arrived or the stream ended.
    Completed,
    /// The user cancelled the turn.
    Stopped,
    /// The transport failed; the turn shows an error instead of an answer.
    Failed(TransportError),
}

/// Result of a consumed turn.
#[derive(Clone, Debug)]
pub struct TurnSummary {
    pub turn_id: uuid::Uuid,
    pub outcome: TurnOutcome,
    /// Final state; not mutated after the turn ends.
    pub response: AccumulatedResponse,
}

/// Entry point for starting turns against a transport.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn ChatTransport>,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Validates the request and prepares a turn.
    ///
    /// Nothing is sent until `Turn::consume` runs, so a cancel issued at any
    /// point after this call, including while connecting, is honored.
    pub fn start(&self, mut request: ChatRequest) -> Result<Turn, ChatError> {
        request.validate()?;
        let (tx, rx) = watch::channel(false);
        let turn_id = uuid::Uuid::new_v4();
        debug!(%turn_id, model = %request.model, images = request.images_data.len(), "turn started");
        Ok(Turn {
            turn_id,
            transport: self.transport.clone(),
            response: AccumulatedResponse::new(request.conversation_id.clone()),
            request,
            cancel: CancelHandle { tx: Arc::new(tx) },
            cancel_rx: rx,
        })
    }
}

/// One submitted user message and the assistant response being assembled
/// for it.
pub struct Turn {
    turn_id: uuid::Uuid,
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    response: AccumulatedResponse,
    cancel: CancelHandle,
    cancel_rx: watch::Receiver<bool>,
}

enum Flow {
    Continue,
    Done,
}

impl Turn {
    pub fn turn_id(&self) -> uuid::Uuid {
        self.turn_id
    }

    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    /// Returns a handle that can stop this turn.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Opens the transport and drives the turn to its end, rendering after
    /// every event.
    ///
    /// Always returns; transport failures and cancellation are reported
    /// through the outcome and the render port, and `turn_finished` runs
    /// exactly once whichever way the turn ends.
    pub async fn consume(
        mut self,
        render: &mut dyn RenderPort,
        sidebar: &mut dyn SidebarRegistry,
    ) -> TurnSummary {
        let outcome = self.drive(render, sidebar).await;
        match &outcome {
            TurnOutcome::Completed => render.turn_completed(&self.response),
            TurnOutcome::Stopped => render.display_annotated(STOPPED_ANNOTATION),
            TurnOutcome::Failed(err) => render.error_turn(&format!("Error: {}", err.message())),
        }
        render.turn_finished(&outcome);
        info!(
            turn_id = %self.turn_id,
            outcome = ?outcome,
            display_len = self.response.display_text().len(),
            "turn finished"
        );
        TurnSummary {
            turn_id: self.turn_id,
            outcome,
            response: self.response,
        }
    }

    async fn drive(
        &mut self,
        render: &mut dyn RenderPort,
        sidebar: &mut dyn SidebarRegistry,
    ) -> TurnOutcome {
        let turn_id = self.turn_id;
        if *self.cancel_rx.borrow_and_update() {
            return TurnOutcome::Stopped;
        }

        let opened = tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel_rx) => return TurnOutcome::Stopped,
            opened = self.transport.open(&self.request) => opened,
        };
        let bytes = match opened {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%turn_id, error = %err, "chat transport failed before streaming");
                return TurnOutcome::Failed(err);
            }
        };

        let mut events = std::pin::pin!(event_stream(bytes));
        let mut seq = 0_u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel_rx) => {
                    debug!(%turn_id, seq, "stream stopped by user");
                    return TurnOutcome::Stopped;
                }
                next = events.next() => next,
            };
            match next {
                Some(Ok(event)) => {
                    debug!(%turn_id, seq, kind = event.kind(), "stream event");
                    seq = seq.saturating_add(1);
                    if let Flow::Done = self.apply(event, render, sidebar) {
                        return TurnOutcome::Completed;
                    }
                }
                Some(Err(err)) => {
                    warn!(%turn_id, seq, error = %err, "chat stream failed");
                    return TurnOutcome::Failed(err);
                }
                None => {
                    debug!(%turn_id, seq, "stream ended without [DONE]");
                    return TurnOutcome::Completed;
                }
            }
        }
    }

    fn apply(
        &mut self,
        event: StreamEvent,
        render: &mut dyn RenderPort,
        sidebar: &mut dyn SidebarRegistry,
    ) -> Flow {
        let response = &mut self.response;
        match event {
            StreamEvent::NewConversation { id, title } => {
                info!(turn_id = %self.turn_id, conversation = %id, "conversation created");
                sidebar.conversation_started(&id, &title);
                response.set_conversation(id);
            }
            StreamEvent::Sources(sources) => {
                if response.attach_sources(sources) {
                    let sources = response.sources();
                    if !sources.is_empty() {
                        render.sources_received(sources);
                    }
                } else {
                    debug!(turn_id = %self.turn_id, "ignoring repeated sources event");
                }
            }
            StreamEvent::ReasoningDelta { text } => {
                response.push_reasoning(&text);
                render.reasoning_updated(ReasoningSource::OutOfBand, response.combined_reasoning());
            }
            StreamEvent::ContentDelta { text } => {
                response.push_content(&text);
                render.display_updated(response.display_text());
                if !response.reasoning_text().is_empty() {
                    render.reasoning_updated(ReasoningSource::Inline, response.reasoning_text());
                }
            }
            StreamEvent::Done => return Flow::Done,
        }
        Flow::Continue
    }
}

/// Resolves once cancellation has been requested.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
