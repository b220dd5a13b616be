//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used request,
//! turn, and render types so applications need fewer import lines.
pub use crate::{
    AccumulatedResponse, CancelHandle, ChatClient, ChatError, ChatRequest, ClientConfig,
    ConversationId, HistoryEntry, HttpTransport, ImageAttachment, NoSidebar, ReasoningSource,
    RenderPort, SidebarRegistry, Source, Turn, TurnOutcome, TurnSummary,
};
