use std::time::Duration;

use crate::errors::ChatError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MODEL: &str = "z-ai/glm-4.5-air:free";

/// Connection settings for the chat backend.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Origin serving `/chat` and `/upload_images`.
    pub base_url: String,
    /// Model requested when a turn does not pick one.
    pub model: String,
    /// Connect timeout, also the whole-request timeout for uploads.
    ///
    /// Streaming reads are not time-limited; a turn ends on `[DONE]`, stream
    /// end, or cancellation.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ClientConfig {
    /// Loads `.env` (if present) and reads overrides from the environment.
    ///
    /// - `CHAT_STREAM_BASE_URL`
    /// - `CHAT_STREAM_MODEL`
    /// - `CHAT_STREAM_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ChatError> {
        load_dotenv();
        let mut config = Self::default();
        if let Some(base_url) = env_value("CHAT_STREAM_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = env_value("CHAT_STREAM_MODEL") {
            config.model = model;
        }
        if let Some(raw) = env_value("CHAT_STREAM_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                ChatError::Config(format!("CHAT_STREAM_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the backend origin.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the connect/upload timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ChatError::Config(format!(
                "base url must start with http:// or https://, got `{base}`"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::Config("model must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn chat_url(&self) -> String {
        self.endpoint("chat")
    }

    pub(crate) fn upload_url(&self) -> String {
        self.endpoint("upload_images")
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim().trim_end_matches('/'))
    }
}

/// Loads `.env` from the working directory, ignoring a missing file.
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        tracing::warn!(error = %err, "failed to load .env");
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slash() {
        let config = ClientConfig::default().base_url("https://chat.example/");
        assert_eq!(config.chat_url(), "https://chat.example/chat");
        assert_eq!(config.upload_url(), "https://chat.example/upload_images");
    }

    #[test]
    fn validate_rejects_non_http_urls_and_empty_model() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(matches!(
            ClientConfig::default().base_url("ftp://x").validate(),
            Err(ChatError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::default().model("  ").validate(),
            Err(ChatError::Config(_))
        ));
    }
}
