//! Streaming chat client for a `/chat` endpoint that answers with
//! Server-Sent-Events-style frames.
//!
//! A turn validates the request locally, opens the transport, frames the
//! response body into events, and separates inline `<think>` reasoning
//! from the visible answer while rendering after every event through
//! injected ports.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chat_stream::prelude::*;
//!
//! struct Stdout;
//!
//! impl RenderPort for Stdout {
//!     fn display_updated(&mut self, text: &str) {
//!         println!("{text}");
//!     }
//!     fn reasoning_updated(&mut self, _source: ReasoningSource, _text: &str) {}
//!     fn display_annotated(&mut self, note: &str) {
//!         println!("{note}");
//!     }
//!     fn error_turn(&mut self, message: &str) {
//!         eprintln!("{message}");
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ChatError> {
//! let transport = HttpTransport::new(ClientConfig::default())?;
//! let model = transport.config().model.clone();
//! let client = ChatClient::new(Arc::new(transport));
//!
//! let turn = client.start(ChatRequest::new(model, "Say hello"))?;
//! let summary = turn.consume(&mut Stdout, &mut NoSidebar).await;
//! println!("{:?}", summary.outcome);
//! # Ok(())
//! # }
//! ```

/// Image attachments and their local validation.
pub mod attachment;
/// Backend connection settings.
pub mod config;
/// Conversation identifiers.
pub mod conversation;
/// Public error types.
pub mod errors;
/// Typed stream events.
pub mod event;
/// Process-wide tracing setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Render and sidebar ports driven by a turn.
pub mod render;
/// Chat request model and submission checks.
pub mod request;
/// Per-turn accumulated state.
pub mod response;
/// Response body framing.
pub mod sse;
/// Inline reasoning marker splitting.
pub mod think;
/// Transport boundary and the HTTP implementation.
pub mod transport;
/// Turn lifecycle: start, consume, cancel.
pub mod turn;

pub use attachment::ImageAttachment;
pub use config::ClientConfig;
pub use conversation::ConversationId;
pub use errors::{ChatError, FrameError, TransportError};
pub use event::{Source, StreamEvent};
pub use render::{NoSidebar, ReasoningSource, RenderPort, STOPPED_ANNOTATION, SidebarRegistry};
pub use request::{ChatRequest, HistoryEntry, Role};
pub use response::{AccumulatedResponse, REASONING_SEPARATOR};
pub use think::{Channels, ThinkSplitter, partial_marker_len, split_markers};
pub use transport::{ByteStream, ChatTransport, HttpTransport};
pub use turn::{CancelHandle, ChatClient, Turn, TurnOutcome, TurnSummary};
