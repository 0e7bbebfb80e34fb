use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type for calls into an underlying integration operation.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Failure raised by an underlying integration operation.
///
/// Carries the HTTP-style status code used for the unauthorized
/// classification plus the optional structured payload fields that feed
/// the normalized failure message.
#[derive(Debug, Clone, Error)]
#[error("upstream error: {detail}")]
pub struct UpstreamError {
    status: Option<StatusCode>,
    message: Option<String>,
    data: Option<Value>,
    detail: String,
}

impl UpstreamError {
    /// Creates an upstream error from a generic detail message.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            message: None,
            data: None,
            detail: detail.into(),
        }
    }

    /// Creates an unauthorized (401) upstream error.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(detail).with_status(StatusCode::UNAUTHORIZED)
    }

    /// Attaches an HTTP-style status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the upstream response message field.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the upstream response data payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the HTTP-style status code when one was observed.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns whether the failure was an unauthorized (401) response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED)
    }

    /// Normalizes the failure into a single human-readable message.
    ///
    /// Priority order: the `message` field, the `data` payload when it
    /// is a plain string, the `data.errorDetails` field, the generic
    /// detail, and finally the provided fallback.
    #[must_use]
    pub fn failure_message(&self, fallback: &str) -> String {
        if let Some(message) = self.message.as_deref()
            && !message.trim().is_empty()
        {
            return message.to_owned();
        }

        if let Some(data) = self.data.as_ref() {
            if let Some(text) = data.as_str()
                && !text.trim().is_empty()
            {
                return text.to_owned();
            }

            if let Some(details) = data.get("errorDetails") {
                if let Some(text) = details.as_str() {
                    if !text.trim().is_empty() {
                        return text.to_owned();
                    }
                } else if !details.is_null() {
                    return details.to_string();
                }
            }
        }

        if !self.detail.trim().is_empty() {
            return self.detail.clone();
        }

        fallback.to_owned()
    }
}
