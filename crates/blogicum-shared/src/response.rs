//! Error page payload, modelled on RFC 7807 problem details.

use serde::{Deserialize, Serialize};

/// What an error page shows.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// The path that produced the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status,
            detail: None,
            instance: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn forbidden() -> Self {
        Self::new(403, "Forbidden")
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Page Not Found").with_detail(detail)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }

    /// Pick the payload for a bare status code.
    pub fn for_status(status: u16) -> Self {
        match status {
            400 => Self::new(400, "Bad Request"),
            403 => Self::forbidden(),
            404 => Self::new(404, "Page Not Found"),
            405 => Self::new(405, "Method Not Allowed"),
            _ if status >= 500 => Self::new(status, "Internal Server Error"),
            _ => Self::new(status, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_omitted_when_absent() {
        let json = serde_json::to_value(ErrorResponse::forbidden()).unwrap();

        assert_eq!(json["status"], 403);
        assert!(json.get("detail").is_none());
    }

    #[test]
    fn test_for_status_maps_server_errors() {
        assert_eq!(ErrorResponse::for_status(502).title, "Internal Server Error");
        assert_eq!(ErrorResponse::for_status(404).title, "Page Not Found");
    }
}
