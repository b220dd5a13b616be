use chat_stream::prelude::*;
use tracing::debug;

/// Per-turn switches forwarded to the backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurnFlags {
    pub web_search: bool,
    pub think: bool,
}

/// Conversation state carried across REPL turns.
pub struct Session {
    client: ChatClient,
    model: String,
    flags: TurnFlags,
    conversation: Option<ConversationId>,
    history: Vec<HistoryEntry>,
}

impl Session {
    pub fn new(
        client: ChatClient,
        model: impl Into<String>,
        flags: TurnFlags,
        conversation: Option<ConversationId>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            flags,
            conversation,
            history: Vec::new(),
        }
    }

    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Forgets history and detaches from the current conversation.
    pub fn reset(&mut self) {
        self.conversation = None;
        self.history.clear();
    }

    /// Builds the request for the next turn from the session state.
    pub fn request(&self, message: &str, images: Vec<ImageAttachment>) -> ChatRequest {
        let mut request = ChatRequest::new(self.model.clone(), message)
            .history(self.history.clone())
            .conversation(self.conversation.clone())
            .force_web_search(self.flags.web_search)
            .images(images);
        if self.flags.think {
            request = request.force_thinking(true);
        }
        request
    }

    /// Starts a turn; the caller drives it and hands the summary back to
    /// `record`.
    pub fn start(&self, message: &str, images: Vec<ImageAttachment>) -> Result<Turn, ChatError> {
        self.client.start(self.request(message, images))
    }

    /// Folds a finished turn into the session.
    ///
    /// A conversation assigned by the backend sticks even when the turn
    /// failed later. Only answered or stopped turns join the history.
    pub fn record(&mut self, message: &str, summary: &TurnSummary) {
        if let Some(id) = summary.response.conversation() {
            self.conversation = Some(id.clone());
        }
        match summary.outcome {
            TurnOutcome::Completed | TurnOutcome::Stopped => {
                self.history.push(HistoryEntry::user(message.trim()));
                let answer = summary.response.display_text();
                if !answer.is_empty() {
                    self.history.push(HistoryEntry::assistant(answer));
                }
            }
            TurnOutcome::Failed(_) => {}
        }
        debug!(
            turn_id = %summary.turn_id,
            history = self.history.len(),
            "session updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chat_stream::{ByteStream, ChatTransport, Role, TransportError};
    use futures::stream;

    use super::*;
    use crate::terminal::TerminalRenderer;

    struct ScriptedTransport {
        body: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open(&self, _request: &ChatRequest) -> Result<ByteStream, TransportError> {
            match self.body {
                Some(body) => Ok(Box::pin(stream::iter(vec![Ok(bytes::Bytes::from_static(
                    body.as_bytes(),
                ))]))),
                None => Err(TransportError::status(500, "Something went wrong")),
            }
        }
    }

    fn session(body: Option<&'static str>) -> Session {
        let client = ChatClient::new(Arc::new(ScriptedTransport { body }));
        Session::new(client, "m", TurnFlags::default(), None)
    }

    async fn run(session: &mut Session, message: &str) -> TurnSummary {
        let turn = session.start(message, Vec::new()).expect("valid request");
        let mut render = TerminalRenderer::new(Vec::new(), Vec::new(), false);
        let mut sidebar = NoSidebar;
        let summary = turn.consume(&mut render, &mut sidebar).await;
        session.record(message, &summary);
        summary
    }

    #[tokio::test]
    async fn completed_turn_extends_history_and_adopts_conversation() {
        let body = concat!(
            "event: new_conversation\n",
            "data: {\"id\":\"0c4f2a9e-1b3d-4c5e-9f70-123456789abc\",\"title\":\"Hi\"}\n\n",
            "data: \"<think>hmm</think>Hello\"\n\n",
            "data: [DONE]\n\n",
        );
        let mut session = session(Some(body));
        let summary = run(&mut session, "  hi  ").await;
        assert_eq!(summary.outcome, TurnOutcome::Completed);
        assert_eq!(
            session.conversation().map(|id| id.as_str()),
            Some("0c4f2a9e-1b3d-4c5e-9f70-123456789abc")
        );
        let roles: Vec<_> = session.history().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(session.history()[0].content, "hi");
        assert_eq!(session.history()[1].content, "Hello");

        let next = session.request("again", Vec::new());
        assert_eq!(next.history.len(), 2);
        assert!(next.conversation_id.is_some());
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_untouched() {
        let mut session = session(None);
        let summary = run(&mut session, "hi").await;
        assert!(matches!(summary.outcome, TurnOutcome::Failed(_)));
        assert!(session.history().is_empty());
    }

    #[test]
    fn flags_map_onto_request() {
        let client = ChatClient::new(Arc::new(ScriptedTransport { body: None }));
        let session = Session::new(
            client,
            "m",
            TurnFlags {
                web_search: true,
                think: true,
            },
            None,
        );
        let request = session.request("q", Vec::new());
        assert!(request.force_web_search);
        assert_eq!(request.force_thinking, Some(true));
    }

    #[test]
    fn reset_clears_state() {
        let mut s = session(None);
        s.history.push(HistoryEntry::user("x"));
        s.conversation = ConversationId::parse("0c4f2a9e-1b3d-4c5e-9f70-123456789abc");
        s.reset();
        assert!(s.history().is_empty());
        assert!(s.conversation().is_none());
    }
}
