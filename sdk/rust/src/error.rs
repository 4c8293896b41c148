use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// The gateway answered with a non-2xx envelope.
    #[error("gateway returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        body: Value,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl SdkError {
    /// Envelope error code, or `NETWORK_ERROR`.
    pub fn code(&self) -> &str {
        match self {
            SdkError::Api { code, .. } => code,
            SdkError::Network(_) => "NETWORK_ERROR",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } => Some(*status),
            SdkError::Network(_) => None,
        }
    }

    pub(crate) fn from_envelope(status: u16, body: Value) -> Self {
        let error = body.get("error");
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN_ERROR")
            .to_string();
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Request failed")
            .to_string();
        SdkError::Api {
            status,
            code,
            message,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_envelope() {
        let err = SdkError::from_envelope(
            401,
            json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "no"}}),
        );
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "gateway returned 401 UNAUTHORIZED: no");
    }

    #[test]
    fn test_from_unstructured_envelope() {
        let err = SdkError::from_envelope(502, json!({"raw": "bad gateway"}));
        assert_eq!(err.code(), "UNKNOWN_ERROR");
    }
}
