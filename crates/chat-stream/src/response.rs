use crate::conversation::ConversationId;
use crate::event::Source;
use crate::think::ThinkSplitter;

/// Separator placed between successive out-of-band reasoning deltas.
pub const REASONING_SEPARATOR: &str = "\n\n---\n\n";

/// Everything received for one assistant turn.
///
/// Only the consume loop mutates it; once the turn ends it is handed back
/// by value inside `TurnSummary`.
#[derive(Clone, Debug, Default)]
pub struct AccumulatedResponse {
    raw_text: String,
    splitter: ThinkSplitter,
    display_text: String,
    reasoning_text: String,
    sources: Option<Vec<Source>>,
    combined_reasoning: String,
    conversation: Option<ConversationId>,
}

impl AccumulatedResponse {
    pub(crate) fn new(conversation: Option<ConversationId>) -> Self {
        Self {
            conversation,
            ..Self::default()
        }
    }

    /// Appends a content fragment and re-derives both channels.
    pub(crate) fn push_content(&mut self, fragment: &str) {
        self.raw_text.push_str(fragment);
        self.splitter.push(fragment);
        self.display_text = self.splitter.display();
        self.reasoning_text = self.splitter.reasoning();
    }

    /// Appends an out-of-band reasoning fragment.
    pub(crate) fn push_reasoning(&mut self, fragment: &str) {
        if !self.combined_reasoning.is_empty() {
            self.combined_reasoning.push_str(REASONING_SEPARATOR);
        }
        self.combined_reasoning.push_str(fragment);
    }

    /// Records sources; returns `false` when sources were already attached.
    pub(crate) fn attach_sources(&mut self, sources: Vec<Source>) -> bool {
        if self.sources.is_some() {
            return false;
        }
        self.sources = Some(sources);
        true
    }

    pub(crate) fn set_conversation(&mut self, id: ConversationId) {
        self.conversation = Some(id);
    }

    /// Concatenation of every content fragment in arrival order.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Content outside `<think>` spans.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// Content inside `<think>` spans.
    pub fn reasoning_text(&self) -> &str {
        &self.reasoning_text
    }

    /// Out-of-band reasoning joined with `REASONING_SEPARATOR`.
    pub fn combined_reasoning(&self) -> &str {
        &self.combined_reasoning
    }

    pub fn sources(&self) -> &[Source] {
        self.sources.as_deref().unwrap_or_default()
    }

    /// Conversation the turn belongs to, once known.
    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_deltas_join_with_separator() {
        let mut response = AccumulatedResponse::default();
        response.push_reasoning("step1");
        response.push_reasoning("step2");
        assert_eq!(response.combined_reasoning(), "step1\n\n---\n\nstep2");
        assert_eq!(response.display_text(), "");
    }

    #[test]
    fn content_tracks_raw_and_derived_channels() {
        let mut response = AccumulatedResponse::default();
        response.push_content("A<thi");
        response.push_content("nk>B</think>C");
        assert_eq!(response.raw_text(), "A<think>B</think>C");
        assert_eq!(response.display_text(), "AC");
        assert_eq!(response.reasoning_text(), "B");
    }

    #[test]
    fn sources_attach_once() {
        let mut response = AccumulatedResponse::default();
        let first = vec![Source {
            url: "https://a.example".into(),
            title: "A".into(),
        }];
        assert!(response.attach_sources(first.clone()));
        assert!(!response.attach_sources(Vec::new()));
        assert_eq!(response.sources(), first.as_slice());
    }
}
