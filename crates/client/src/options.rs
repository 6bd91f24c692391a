//! Typed request options and body shapes.

use bytes::Bytes;
use huddle_types::{HuddleError, traits::Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;

/// Per-request options beyond method, endpoint, and body.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers, merged over the pipeline defaults.
    pub headers: HeaderMap,
}

impl RequestOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header, replacing any previous value for the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// The body of one logical request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON payload, sent with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Multipart upload; `Content-Type` is left to the form's boundary
    /// negotiation and never forced to JSON.
    Multipart(FileUpload),
}

/// A rebuildable multipart payload: one file part plus optional text fields.
///
/// Kept as a descriptor rather than a prebuilt form because the single
/// retry after a token refresh must reconstruct the identical request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    field: String,
    file_name: String,
    mime: String,
    bytes: Bytes,
    fields: Vec<(String, String)>,
}

impl FileUpload {
    /// Creates a file payload for the given form field.
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
            fields: Vec::new(),
        }
    }

    /// Attaches an additional plain-text form field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Builds a fresh multipart form for one attempt.
    pub(crate) fn to_form(&self) -> Result<multipart::Form> {
        let part = multipart::Part::bytes(self.bytes.to_vec())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)
            .map_err(|e| {
                HuddleError::InvalidRequest(format!("invalid MIME type {:?}: {e}", self.mime))
            })?;
        let mut form = multipart::Form::new().part(self.field.clone(), part);
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header;

    #[test]
    fn test_options_header_replaces() {
        let opts = RequestOptions::new()
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert_eq!(
            opts.headers.get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
    }

    #[test]
    fn test_upload_builds_form() {
        let upload = FileUpload::new("file", "avatar.png", "image/png", vec![1u8, 2, 3])
            .with_field("caption", "team photo");
        assert!(upload.to_form().is_ok());
    }

    #[test]
    fn test_upload_rejects_bad_mime() {
        let upload = FileUpload::new("file", "a.bin", "not a mime", vec![0u8]);
        let err = upload.to_form().unwrap_err();
        assert!(matches!(err, HuddleError::InvalidRequest(_)));
    }

    #[test]
    fn test_upload_form_is_rebuildable() {
        let upload = FileUpload::new("file", "a.png", "image/png", vec![0u8; 16]);
        // One descriptor must be able to produce a form per attempt.
        assert!(upload.to_form().is_ok());
        assert!(upload.to_form().is_ok());
    }
}
