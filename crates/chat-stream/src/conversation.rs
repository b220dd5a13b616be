use std::fmt;

const CONVERSATION_ID_LEN: usize = 36;

/// Server-issued conversation identifier.
///
/// A valid id is exactly 36 characters, each an ASCII hex digit or `-`
/// (the hyphenated UUID shape the chat backend hands out).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Parses an id, returning `None` when the value is not id-shaped.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let well_formed = value.len() == CONVERSATION_ID_LEN
            && value.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
        well_formed.then(|| Self(value.to_string()))
    }

    /// Extracts the id from the trailing segment of a route or URL such as
    /// `/conversation/<id>`.
    ///
    /// Any other trailing segment means there is no conversation yet.
    pub fn from_route(route: &str) -> Option<Self> {
        let path = route.split(['?', '#']).next().unwrap_or_default();
        let last = path.trim_end_matches('/').rsplit('/').next()?;
        Self::parse(last)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Route the front end associates with this conversation.
    pub fn route(&self) -> String {
        format!("/conversation/{}", self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid conversation id `{value}`"))
    }
}

impl From<ConversationId> for String {
    fn from(value: ConversationId) -> Self {
        value.0
    }
}
