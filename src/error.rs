use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    #[error("text must not be empty")]
    EmptyInput,

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("episode not found: {0}")]
    NotFound(String),

    #[error("invalid audio filename: {0}")]
    InvalidAudioFilename(String),

    #[error("failed to read episode entry {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("episode storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal: the renderer substitutes the current time.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unparseable timestamp {0:?}, using current time")]
    DateParseFallback(String),
}

/// Request-boundary error.
///
/// Always rendered as `200 OK` with `{"error": message}`; clients of this service
/// detect failures by the presence of the `error` key, not by status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        warn!(error = %message, "request failed");
        (StatusCode::OK, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let e = ApiError::from(SpeechError::UnknownVoice("robot".into()));
        assert_eq!(e.to_string(), "unknown voice: robot");

        let e = ApiError::from(StoreError::NotFound("deadbeef".into()));
        assert!(e.to_string().contains("deadbeef"));
    }

    #[test]
    fn errors_are_reported_with_ok_status() {
        let resp = ApiError::from(SpeechError::EmptyInput).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn body_rejections_name_the_missing_field() {
        use axum::body::Body;
        use axum::extract::FromRequest;
        use axum::http::Request;

        #[derive(Debug, serde::Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            content: String,
        }

        let req = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"only"}"#))
            .unwrap();
        let rejection = Json::<Needs>::from_request(req, &()).await.unwrap_err();
        let err = ApiError::from(rejection);
        assert!(err.to_string().contains("content"), "{}", err);
        assert_eq!(err.into_response().status(), StatusCode::OK);
    }
}
