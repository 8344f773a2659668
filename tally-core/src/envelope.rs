use serde::{Deserialize, Serialize};

/// Stable error body carried inside a [`ResponseEnvelope`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Response shape shared by every caller-facing surface:
/// `{ error, data, message, status }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    pub error: Option<ErrorBody>,
    pub data: Option<T>,
    pub message: String,
    pub status: u16,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            error: None,
            data: Some(data),
            message: "ok".into(),
            status: 200,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            error: None,
            data: Some(data),
            message: "created".into(),
            status: 201,
        }
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        let message = message.into();
        Self {
            error: Some(ErrorBody {
                code: code.into(),
                message: message.clone(),
            }),
            data: None,
            message,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_mirrors_message_into_error_body() {
        let envelope: ResponseEnvelope<()> =
            ResponseEnvelope::failure("not_found", "customer missing", 404);
        assert_eq!(envelope.status, 404);
        assert!(envelope.data.is_none());
        let body = envelope.error.expect("error body");
        assert_eq!(body.code, "not_found");
        assert_eq!(body.message, "customer missing");
    }
}
