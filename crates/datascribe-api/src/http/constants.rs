//! Shared wire constants for the HTTP surface.

/// Hard ceiling on request body size (50 MiB), enforced before the body is
/// fully buffered.
pub(crate) const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Multipart field the upload must arrive under; other fields are ignored.
pub(crate) const UPLOAD_FIELD_NAME: &str = "file";

/// Content type of the streamed artifact.
pub(crate) const REPORT_CONTENT_TYPE: &str = "application/pdf";

/// Download disposition with the fixed artifact filename, independent of the
/// uploaded file's name.
pub(crate) const REPORT_DISPOSITION: &str = "attachment; filename=\"report.pdf\"";

/// Cache policy for artifact responses.
pub(crate) const REPORT_CACHE_CONTROL: &str = "no-store";

/// Guidance returned for any method or path outside the wire contract.
pub(crate) const METHOD_GUIDANCE: &str =
    "Use POST /predict with multipart/form-data (field name: file); GET /healthz answers liveness probes";
