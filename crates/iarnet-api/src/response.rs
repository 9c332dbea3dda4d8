//! Standard response envelope: `{code, message, data?, error?}` where
//! `code` mirrors the HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn success<T: Serialize>(data: T) -> Envelope<T> {
    Envelope {
        code: StatusCode::OK.as_u16(),
        message: "success",
        data: Some(data),
        error: None,
    }
}

/// 200 with no payload (updates and deletes).
pub fn success_empty() -> Envelope<()> {
    Envelope {
        code: StatusCode::OK.as_u16(),
        message: "success",
        data: None,
        error: None,
    }
}

pub fn created<T: Serialize>(data: T) -> Envelope<T> {
    Envelope {
        code: StatusCode::CREATED.as_u16(),
        message: "created",
        data: Some(data),
        error: None,
    }
}

pub fn bad_request(error: impl Into<String>) -> Envelope<()> {
    failure(StatusCode::BAD_REQUEST, "bad request", error)
}

pub fn not_found(error: impl Into<String>) -> Envelope<()> {
    failure(StatusCode::NOT_FOUND, "not found", error)
}

pub fn internal_error(error: impl Into<String>) -> Envelope<()> {
    failure(StatusCode::INTERNAL_SERVER_ERROR, "internal server error", error)
}

fn failure(status: StatusCode, message: &'static str, error: impl Into<String>) -> Envelope<()> {
    Envelope {
        code: status.as_u16(),
        message,
        data: None,
        error: Some(error.into()),
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let body = serde_json::to_value(success(42)).unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], 42);
        assert!(body.get("error").is_none());

        let body = serde_json::to_value(not_found("domain not found")).unwrap();
        assert_eq!(body["code"], 404);
        assert_eq!(body["error"], "domain not found");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn status_follows_code() {
        assert_eq!(success_empty().into_response().status(), StatusCode::OK);
        assert_eq!(created(1).into_response().status(), StatusCode::CREATED);
        assert_eq!(bad_request("x").into_response().status(), StatusCode::BAD_REQUEST);
    }
}
