use crate::conversation::ConversationId;
use crate::event::Source;
use crate::response::AccumulatedResponse;
use crate::turn::TurnOutcome;

/// Text appended to the display channel when the user stops a turn.
pub const STOPPED_ANNOTATION: &str = "You stopped this response.";

/// Which reasoning channel an update belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasoningSource {
    /// Text between `<think>` markers in the content stream.
    Inline,
    /// Text delivered through `reasoning` events.
    OutOfBand,
}

/// Output side of a turn. The assembler never touches a UI directly; it
/// calls these hooks in event order.
///
/// Every update carries the full accumulated text of its channel, not a
/// delta.
pub trait RenderPort {
    /// Display channel changed.
    fn display_updated(&mut self, text: &str);

    /// One of the reasoning channels changed.
    fn reasoning_updated(&mut self, source: ReasoningSource, text: &str);

    /// Sources arrived for the turn. Never called with an empty list.
    fn sources_received(&mut self, _sources: &[Source]) {}

    /// Terminal note after the last rendered content (user stop).
    fn display_annotated(&mut self, note: &str);

    /// The turn failed before or while streaming.
    fn error_turn(&mut self, message: &str);

    /// Final render once the stream is done.
    fn turn_completed(&mut self, _response: &AccumulatedResponse) {}

    /// Cleanup hook, called exactly once on every exit path.
    fn turn_finished(&mut self, _outcome: &TurnOutcome) {}
}

/// Receives conversations the backend created during a turn.
pub trait SidebarRegistry {
    fn conversation_started(&mut self, id: &ConversationId, title: &str);
}

/// Registry for callers that do not list conversations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSidebar;

impl SidebarRegistry for NoSidebar {
    fn conversation_started(&mut self, _id: &ConversationId, _title: &str) {}
}
