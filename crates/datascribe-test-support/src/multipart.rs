//! `multipart/form-data` request bodies for router-level tests.

/// Fixed boundary used by every generated body.
pub const TEST_BOUNDARY: &str = "datascribe-test-boundary";

/// Builder assembling a `multipart/form-data` body byte-for-byte.
#[derive(Debug, Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    /// Start an empty body.
    #[must_use]
    pub const fn new() -> Self {
        Self { body: Vec::new() }
    }

    /// Append a plain text field.
    #[must_use]
    pub fn text_field(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{TEST_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Append a file field with the given filename and content type.
    #[must_use]
    pub fn file_field(
        mut self,
        name: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{TEST_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Close the body, returning the `Content-Type` header value and the
    /// full payload.
    #[must_use]
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{TEST_BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
            self.body,
        )
    }
}

/// Convenience for the common single-file case.
#[must_use]
pub fn csv_upload(field: &str, filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    MultipartBuilder::new()
        .file_field(field, filename, "text/csv", bytes)
        .finish()
}
