use std::path::Path;
use std::pin::Pin;

use futures::StreamExt as _;
use tracing::debug;

use crate::attachment::{ImageAttachment, MAX_IMAGE_BYTES, mime_for_filename};
use crate::config::ClientConfig;
use crate::errors::{ChatError, TransportError};
use crate::request::ChatRequest;

/// Raw response body of a chat turn.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

const GENERIC_FAILURE: &str = "Something went wrong";
const UPLOAD_FAILURE: &str = "Failed to upload images";

/// Boundary to the chat backend: accepts a request, returns the framed
/// response body.
///
/// Implementations fail with `TransportError::Status` or `Connect` when the
/// endpoint rejects the request before streaming begins. Cancellation is
/// handled by the caller dropping the stream.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError>;
}

/// `reqwest`-backed transport for the `/chat` and `/upload_images`
/// endpoints.
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport from `ClientConfig::from_env`.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends image files through the backend's upload endpoint, which
    /// resizes and re-encodes them, and returns the processed attachments.
    ///
    /// Files are checked locally first (image type, 16MB limit).
    pub async fn upload_images(
        &self,
        paths: &[impl AsRef<Path>],
    ) -> Result<Vec<ImageAttachment>, ChatError> {
        if paths.is_empty() {
            return Err(ChatError::Validation("No images provided".into()));
        }
        let mut form = reqwest::multipart::Form::new();
        for path in paths {
            let path = path.as_ref();
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let mime = mime_for_filename(&filename).ok_or_else(|| {
                ChatError::Validation(format!("{filename} is not a valid image file."))
            })?;
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ChatError::Validation(format!("cannot read {filename}: {e}")))?;
            if bytes.len() > MAX_IMAGE_BYTES {
                return Err(ChatError::Validation(format!(
                    "{filename} is too large. Please select files smaller than 16MB."
                )));
            }
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(filename)
                .mime_str(mime)
                .map_err(|e| ChatError::Config(format!("invalid mime type {mime}: {e}")))?;
            form = form.part("images", part);
        }

        debug!(count = paths.len(), "uploading images");
        let response = self
            .client
            .post(self.config.upload_url())
            .timeout(self.config.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::connect(format!("image upload failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UploadResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UPLOAD_FAILURE.to_string());
            return Err(TransportError::status(status.as_u16(), message).into());
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| TransportError::decode(format!("invalid upload response: {e}")))?;
        match body.images {
            Some(images) if !images.is_empty() => Ok(images),
            _ => Err(TransportError::status(
                status.as_u16(),
                body.error.unwrap_or_else(|| UPLOAD_FAILURE.to_string()),
            )
            .into()),
        }
    }
}

#[derive(serde::Deserialize)]
struct UploadResponse {
    #[serde(default)]
    images: Option<Vec<ImageAttachment>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        debug!(
            model = %request.model,
            conversation = ?request.conversation_id.as_ref().map(|id| id.as_str()),
            history = request.history.len(),
            images = request.images_data.len(),
            "opening chat stream"
        );
        let response = self
            .client
            .post(self.config.chat_url())
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            return Err(TransportError::status(status.as_u16(), message));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::read(e.to_string())));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::event_stream;
    use crate::event::StreamEvent;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(ClientConfig::default().base_url(server.uri())).expect("transport")
    }

    #[tokio::test]
    async fn open_posts_request_and_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_partial_json(serde_json::json!({
                "message": "hello",
                "model": "m",
                "force_web_search": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: \"Hi\"\n\ndata: [DONE]\n\n"),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let request = ChatRequest::new("m", "hello").force_web_search(true);
        let bytes = transport.open(&request).await.expect("open");
        let events: Vec<_> = event_stream(bytes)
            .map(|e| e.expect("event"))
            .collect()
            .await;
        assert_eq!(
            events,
            vec![
                StreamEvent::ContentDelta { text: "Hi".into() },
                StreamEvent::Done
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_uses_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "Unauthorized"})),
            )
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let err = match transport.open(&ChatRequest::new("m", "hello")).await {
            Ok(_) => panic!("401 should fail"),
            Err(err) => err,
        };
        assert_eq!(err, TransportError::status(401, "Unauthorized"));
    }

    #[tokio::test]
    async fn non_success_status_without_json_falls_back_to_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let transport = transport_for(&server).await;
        let err = match transport.open(&ChatRequest::new("m", "hello")).await {
            Ok(_) => panic!("500 should fail"),
            Err(err) => err,
        };
        assert_eq!(err, TransportError::status(500, GENERIC_FAILURE));
    }

    #[tokio::test]
    async fn upload_images_returns_processed_attachments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload_images"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "images": [{"image_data": "AAAA", "mime_type": "image/png", "filename": "a.png"}]
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"\x89PNG").expect("write");

        let transport = transport_for(&server).await;
        let images = transport.upload_images(&[file]).await.expect("upload");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, "a.png");
    }

    #[tokio::test]
    async fn upload_images_surfaces_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload_images"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "No valid images processed"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"\x89PNG").expect("write");

        let transport = transport_for(&server).await;
        let err = transport.upload_images(&[file]).await.expect_err("should fail");
        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Status { status_code: 400, ref message })
                if message == "No valid images processed"
        ));
    }

    #[tokio::test]
    async fn upload_images_keeps_status_when_error_body_is_not_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload_images"))
            .respond_with(ResponseTemplate::new(413).set_body_string("<html>Too Large</html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("a.png");
        std::fs::write(&file, b"\x89PNG").expect("write");

        let transport = transport_for(&server).await;
        let err = transport.upload_images(&[file]).await.expect_err("should fail");
        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Status { status_code: 413, ref message })
                if message == UPLOAD_FAILURE
        ));
    }

    #[tokio::test]
    async fn upload_images_rejects_non_images_locally() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"hi").expect("write");

        let transport =
            HttpTransport::new(ClientConfig::default()).expect("transport");
        let err = transport.upload_images(&[file]).await.expect_err("should fail");
        assert!(matches!(err, ChatError::Validation(msg) if msg.contains("not a valid image")));
    }
}
