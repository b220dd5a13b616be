use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::errors::ChatError;

/// Largest decoded image accepted for a single attachment.
pub const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

/// File extensions the chat backend accepts for images.
pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Image attached to a chat turn, carried inline as base64.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) image bytes.
    pub image_data: String,
    pub filename: String,
}

impl ImageAttachment {
    /// Builds an attachment from raw bytes.
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            mime_type: mime_type.into(),
            image_data: STANDARD.encode(bytes),
            filename: filename.into(),
        }
    }

    /// Reads and validates an image file, guessing its mime type from the
    /// extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ChatError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ChatError::validation(format!("{} is not a valid image file.", path.display()))
            })?
            .to_string();
        let mime_type = mime_for_filename(&filename).ok_or_else(|| {
            ChatError::validation(format!("{filename} is not a valid image file."))
        })?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ChatError::validation(format!("cannot read {filename}: {e}")))?;
        if metadata.len() > MAX_IMAGE_BYTES as u64 {
            return Err(too_large(&filename));
        }
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ChatError::validation(format!("cannot read {filename}: {e}")))?;
        let attachment = Self::from_bytes(filename, mime_type, &bytes);
        attachment.validate()?;
        Ok(attachment)
    }

    /// Checks mime type, extension, payload encoding and decoded size.
    pub fn validate(&self) -> Result<(), ChatError> {
        if !self.mime_type.starts_with("image/") {
            return Err(ChatError::validation(format!(
                "{} is not a valid image file.",
                self.filename
            )));
        }
        if extension_of(&self.filename).is_some_and(|ext| !is_allowed_extension(&ext)) {
            return Err(ChatError::validation(format!(
                "{} has an unsupported image extension.",
                self.filename
            )));
        }
        let decoded = STANDARD.decode(self.image_data.as_bytes()).map_err(|e| {
            ChatError::validation(format!("{} has invalid image data: {e}", self.filename))
        })?;
        if decoded.is_empty() {
            return Err(ChatError::validation(format!("{} is empty.", self.filename)));
        }
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(too_large(&self.filename));
        }
        Ok(())
    }
}

fn too_large(filename: &str) -> ChatError {
    ChatError::validation(format!("{filename} is too large. Maximum size is 16MB."))
}

fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

fn is_allowed_extension(ext: &str) -> bool {
    ALLOWED_EXTENSIONS.contains(&ext)
}

/// Mime type for an allowed image filename.
pub fn mime_for_filename(filename: &str) -> Option<&'static str> {
    match extension_of(filename)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn mime_guess_covers_allowed_extensions() {
        assert_eq!(mime_for_filename("cat.PNG"), Some("image/png"));
        assert_eq!(mime_for_filename("cat.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_for_filename("notes.txt"), None);
        assert_eq!(mime_for_filename("no_extension"), None);
    }

    #[test]
    fn validate_rejects_non_image_mime() {
        let attachment = ImageAttachment::from_bytes("a.png", "text/plain", b"abc");
        let err = attachment.validate().expect_err("should reject");
        assert!(matches!(err, ChatError::Validation(msg) if msg.contains("not a valid image")));
    }

    #[test]
    fn validate_rejects_bad_base64_and_empty_payloads() {
        let mut attachment = ImageAttachment::from_bytes("a.png", "image/png", b"abc");
        attachment.image_data = "@@not base64@@".into();
        assert!(attachment.validate().is_err());

        let empty = ImageAttachment::from_bytes("a.png", "image/png", b"");
        assert!(matches!(empty.validate(), Err(ChatError::Validation(msg)) if msg.contains("empty")));
    }

    #[test]
    fn validate_rejects_oversized_payload() {
        let big = vec![0_u8; MAX_IMAGE_BYTES + 1];
        let attachment = ImageAttachment::from_bytes("big.png", "image/png", &big);
        assert!(
            matches!(attachment.validate(), Err(ChatError::Validation(msg)) if msg.contains("too large"))
        );
    }

    #[tokio::test]
    async fn from_path_encodes_file_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pixel.gif");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"GIF89a").expect("write");
        drop(file);

        let attachment = ImageAttachment::from_path(&path).await.expect("attachment");
        assert_eq!(attachment.filename, "pixel.gif");
        assert_eq!(attachment.mime_type, "image/gif");
        assert_eq!(STANDARD.decode(&attachment.image_data).expect("b64"), b"GIF89a");
    }

    #[tokio::test]
    async fn from_path_rejects_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").expect("write");
        assert!(ImageAttachment::from_path(&path).await.is_err());
    }
}
