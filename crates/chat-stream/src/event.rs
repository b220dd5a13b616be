use crate::conversation::ConversationId;

/// Web source the backend consulted for the current turn.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub title: String,
}

/// Events framed out of the `/chat` response body, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// Backend created a conversation for this turn.
    NewConversation { id: ConversationId, title: String },
    /// Sources used to answer the turn.
    Sources(Vec<Source>),
    /// Reasoning delivered out-of-band, already separated from content.
    ReasoningDelta { text: String },
    /// One raw fragment of the interleaved content stream. May start or end
    /// in the middle of a `<think>` marker.
    ContentDelta { text: String },
    /// Terminal marker; nothing after it is processed.
    Done,
}

impl StreamEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewConversation { .. } => "new_conversation",
            Self::Sources(_) => "sources",
            Self::ReasoningDelta { .. } => "reasoning",
            Self::ContentDelta { .. } => "content",
            Self::Done => "done",
        }
    }
}
