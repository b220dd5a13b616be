use crate::attachment::ImageAttachment;
use crate::conversation::ConversationId;
use crate::errors::ChatError;

/// Author of a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn sent back to the backend as context.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body posted to the `/chat` endpoint.
///
/// Built with chained setters, then checked by `validate` before any
/// network call is made.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    pub conversation_id: Option<ConversationId>,
    pub model: String,
    pub force_web_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_thinking: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images_data: Vec<ImageAttachment>,
}

impl ChatRequest {
    /// Creates a request for `model` carrying `message`.
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            conversation_id: None,
            model: model.into(),
            force_web_search: false,
            force_thinking: None,
            images_data: Vec::new(),
        }
    }

    /// Replaces the prior turns sent as context.
    pub fn history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Targets an existing conversation (`None` starts a new one).
    pub fn conversation(mut self, id: Option<ConversationId>) -> Self {
        self.conversation_id = id;
        self
    }

    pub fn force_web_search(mut self, enabled: bool) -> Self {
        self.force_web_search = enabled;
        self
    }

    pub fn force_thinking(mut self, enabled: bool) -> Self {
        self.force_thinking = Some(enabled);
        self
    }

    /// Appends an image attachment.
    pub fn image(mut self, image: ImageAttachment) -> Self {
        self.images_data.push(image);
        self
    }

    /// Appends several image attachments.
    pub fn images(mut self, images: impl IntoIterator<Item = ImageAttachment>) -> Self {
        self.images_data.extend(images);
        self
    }

    /// Local checks performed before a turn is allowed to start.
    ///
    /// The message is trimmed in place, mirroring what the user actually
    /// submits.
    pub fn validate(&mut self) -> Result<(), ChatError> {
        let trimmed = self.message.trim();
        if trimmed.len() != self.message.len() {
            self.message = trimmed.to_string();
        }
        if self.message.is_empty() && self.images_data.is_empty() {
            return Err(ChatError::validation(
                "message text or at least one image is required",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::validation("model must not be empty"));
        }
        for image in &self.images_data {
            image.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_submission() {
        let mut req = ChatRequest::new("m", "   \n ");
        let err = req.validate().expect_err("empty submission");
        assert!(matches!(err, ChatError::Validation(msg) if msg.contains("message text")));
    }

    #[test]
    fn validate_accepts_image_only_submission() {
        let mut req = ChatRequest::new("m", "")
            .image(ImageAttachment::from_bytes("a.png", "image/png", b"\x89PNG"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validate_trims_message_and_requires_model() {
        let mut req = ChatRequest::new("m", "  hi  ");
        req.validate().expect("valid");
        assert_eq!(req.message, "hi");

        let mut no_model = ChatRequest::new(" ", "hi");
        assert!(matches!(no_model.validate(), Err(ChatError::Validation(msg)) if msg.contains("model")));
    }

    #[test]
    fn serializes_wire_shape_and_omits_optional_fields() {
        let req = ChatRequest::new("z-ai/glm-4.5-air:free", "hello")
            .history(vec![HistoryEntry::user("hi"), HistoryEntry::assistant("hey")]);
        let body = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "message": "hello",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hey"}
                ],
                "conversation_id": null,
                "model": "z-ai/glm-4.5-air:free",
                "force_web_search": false
            })
        );

        let with_flags = serde_json::to_value(
            req.force_thinking(true)
                .image(ImageAttachment::from_bytes("a.png", "image/png", b"x")),
        )
        .expect("serialize");
        assert_eq!(with_flags["force_thinking"], serde_json::json!(true));
        assert_eq!(with_flags["images_data"][0]["filename"], serde_json::json!("a.png"));
    }
}
