//! Streaming ingestion of a multipart image upload.
//!
//! The file part is read chunk by chunk so the size ceiling and the MIME
//! allowlist are enforced while the body is still arriving. On a violation
//! the function returns straight away; the rest of the body is never read.

use axum::extract::Multipart;
use std::collections::HashSet;
use thiserror::Error;

/// Name of the text field carrying the edit instruction.
pub const INSTRUCTION_FIELD: &str = "instruction";

/// MIME type assumed for a file part that does not declare one.
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IngestError {
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    #[error("File exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Malformed multipart body: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct MultipartLimits {
    pub max_bytes: u64,
    /// `None` accepts any declared type.
    pub allowed_mime_types: Option<HashSet<String>>,
}

impl MultipartLimits {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            allowed_mime_types: None,
        }
    }

    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_mime_types = Some(types.into_iter().map(|t| essence(t.as_ref())).collect());
        self
    }

    pub fn allows(&self, mime_type: &str) -> bool {
        match &self.allowed_mime_types {
            Some(allowed) => allowed.contains(&essence(mime_type)),
            None => true,
        }
    }
}

/// `image/PNG; name=x` -> `image/png`
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// What was collected from the form. Empty values are left for the caller
/// to reject.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestedUpload {
    pub file: Vec<u8>,
    pub mime_type: String,
    pub file_name: Option<String>,
    pub instruction: String,
}

pub async fn ingest(
    mut multipart: Multipart,
    limits: &MultipartLimits,
) -> Result<IngestedUpload, IngestError> {
    let mut upload = IngestedUpload::default();
    let mut seen_file = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Malformed(e.to_string()))?
    {
        if field.file_name().is_some() {
            if seen_file {
                // Drained by the next `next_field` call; only the route's
                // body limit bounds it.
                tracing::debug!(
                    field = ?field.name(),
                    "Ignoring additional file part"
                );
                continue;
            }
            seen_file = true;

            let mime_type = field
                .content_type()
                .unwrap_or(DEFAULT_FILE_MIME_TYPE)
                .to_string();

            if !limits.allows(&mime_type) {
                tracing::info!(mime_type = %mime_type, "Rejecting upload with unsupported type");
                return Err(IngestError::UnsupportedMediaType(mime_type));
            }

            upload.file_name = field.file_name().map(str::to_string);
            upload.mime_type = mime_type;

            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| IngestError::Malformed(e.to_string()))?
            {
                if (upload.file.len() + chunk.len()) as u64 > limits.max_bytes {
                    tracing::info!(
                        limit = limits.max_bytes,
                        received = upload.file.len() + chunk.len(),
                        "Rejecting oversized upload"
                    );
                    return Err(IngestError::PayloadTooLarge {
                        limit: limits.max_bytes,
                    });
                }
                upload.file.extend_from_slice(&chunk);
            }
        } else if field.name() == Some(INSTRUCTION_FIELD) {
            upload.instruction = field
                .text()
                .await
                .map_err(|e| IngestError::Malformed(e.to_string()))?;
        }
    }

    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, Bytes},
        extract::FromRequest,
        http::Request,
    };
    use futures::StreamExt;
    use std::time::Duration;

    const BOUNDARY: &str = "relay-test-boundary";

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_head(name: &str, file_name: &str, mime: Option<&str>) -> String {
        let mut head = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n"
        );
        if let Some(mime) = mime {
            head.push_str(&format!("Content-Type: {mime}\r\n"));
        }
        head.push_str("\r\n");
        head
    }

    fn closing() -> String {
        format!("--{BOUNDARY}--\r\n")
    }

    async fn multipart_from_body(body: Body) -> Multipart {
        let request = Request::builder()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap();
        Multipart::from_request(request, &()).await.unwrap()
    }

    fn png_limits(max_bytes: u64) -> MultipartLimits {
        MultipartLimits::new(max_bytes).with_allowed_mime_types(["image/png", "image/jpeg"])
    }

    /// Body that yields `chunks` and then never completes, so reading past
    /// them stalls instead of returning.
    fn body_then_stall(chunks: Vec<Vec<u8>>) -> Body {
        let items: Vec<Result<Bytes, std::io::Error>> =
            chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
        Body::from_stream(futures::stream::iter(items).chain(futures::stream::pending::<Result<Bytes, std::io::Error>>()))
    }

    async fn ingest_stalled(
        body: Body,
        limits: &MultipartLimits,
    ) -> Result<IngestedUpload, IngestError> {
        tokio::time::timeout(
            Duration::from_secs(2),
            ingest(multipart_from_body(body).await, limits),
        )
        .await
        .expect("ingest kept reading after the violation")
    }

    #[tokio::test]
    async fn collects_file_and_instruction() {
        let mut body = text_part("instruction", "make it pop").into_bytes();
        body.extend(file_head("image", "cat.png", Some("image/png")).into_bytes());
        body.extend_from_slice(&[137, 80, 78, 71]);
        body.extend_from_slice(b"\r\n");
        body.extend(closing().into_bytes());

        let upload = ingest(multipart_from_body(Body::from(body)).await, &png_limits(1024))
            .await
            .unwrap();

        assert_eq!(upload.file, vec![137, 80, 78, 71]);
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.file_name.as_deref(), Some("cat.png"));
        assert_eq!(upload.instruction, "make it pop");
    }

    #[tokio::test]
    async fn last_instruction_wins() {
        let body = format!(
            "{}{}{}",
            text_part("instruction", "first"),
            text_part("instruction", "second"),
            closing()
        );

        let upload = ingest(multipart_from_body(Body::from(body)).await, &png_limits(1024))
            .await
            .unwrap();

        assert_eq!(upload.instruction, "second");
        assert!(upload.file.is_empty());
    }

    #[tokio::test]
    async fn absent_fields_yield_empty_upload() {
        let body = format!("{}{}", text_part("other", "ignored"), closing());

        let upload = ingest(multipart_from_body(Body::from(body)).await, &png_limits(1024))
            .await
            .unwrap();

        assert_eq!(upload, IngestedUpload::default());
    }

    #[tokio::test]
    async fn unsupported_type_stops_before_reading_file_bytes() {
        let head = file_head("image", "notes.txt", Some("text/plain")).into_bytes();
        let body = body_then_stall(vec![head, b"plain text".to_vec()]);

        let err = ingest_stalled(body, &png_limits(1024)).await.unwrap_err();

        assert_eq!(err, IngestError::UnsupportedMediaType("text/plain".into()));
    }

    #[tokio::test]
    async fn missing_content_type_is_checked_as_octet_stream() {
        let head = file_head("image", "blob", None).into_bytes();
        let body = body_then_stall(vec![head]);

        let err = ingest_stalled(body, &png_limits(1024)).await.unwrap_err();

        assert_eq!(
            err,
            IngestError::UnsupportedMediaType(DEFAULT_FILE_MIME_TYPE.into())
        );
    }

    #[tokio::test]
    async fn oversized_file_fails_while_streaming() {
        let mut chunks = vec![file_head("image", "big.png", Some("image/png")).into_bytes()];
        chunks.extend((0..10).map(|_| vec![0u8; 64]));
        let body = body_then_stall(chunks);

        let err = ingest_stalled(body, &png_limits(100)).await.unwrap_err();

        assert_eq!(err, IngestError::PayloadTooLarge { limit: 100 });
    }

    #[tokio::test]
    async fn file_at_the_limit_is_accepted() {
        let mut body = file_head("image", "exact.png", Some("image/png")).into_bytes();
        body.extend_from_slice(&[5u8; 16]);
        body.extend_from_slice(b"\r\n");
        body.extend(closing().into_bytes());

        let upload = ingest(multipart_from_body(Body::from(body)).await, &png_limits(16))
            .await
            .unwrap();

        assert_eq!(upload.file.len(), 16);
    }

    #[tokio::test]
    async fn truncated_body_is_malformed() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"instruction\"\r\n\r\nunfinished"
        );

        let err = ingest(multipart_from_body(Body::from(body)).await, &png_limits(1024))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[tokio::test]
    async fn only_the_first_file_part_is_kept() {
        let mut body = file_head("image", "a.png", Some("image/png")).into_bytes();
        body.extend_from_slice(&[1, 1]);
        body.extend_from_slice(b"\r\n");
        body.extend(file_head("image", "b.txt", Some("text/plain")).into_bytes());
        body.extend_from_slice(&[2, 2]);
        body.extend_from_slice(b"\r\n");
        body.extend(closing().into_bytes());

        let upload = ingest(multipart_from_body(Body::from(body)).await, &png_limits(1024))
            .await
            .unwrap();

        assert_eq!(upload.file, vec![1, 1]);
        assert_eq!(upload.mime_type, "image/png");
    }

    #[test]
    fn allowlist_compares_type_essence() {
        let limits = png_limits(1);
        assert!(limits.allows("IMAGE/PNG; foo=bar"));
        assert!(!limits.allows("image/gif"));
        assert!(MultipartLimits::new(1).allows("anything/else"));
    }
}
