//! Request-side helpers: request IDs and JSON body extraction.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{HeaderName, HeaderValue, StatusCode},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::validation::JsonObject;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const BODY_REQUIRED: &str = "Request body is required";

/// Generates a UUID v4 for requests that arrive without `x-request-id`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// A non-empty JSON object body.
///
/// Missing, unparsable, non-object and empty-object bodies are all rejected
/// with 400 `Request body is required`.
#[derive(Debug, Clone)]
pub struct JsonBody(pub JsonObject);

impl<S: Send + Sync> FromRequest<S> for JsonBody {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::PayloadTooLarge
            } else {
                ApiError::validation(BODY_REQUIRED)
            }
        })?;
        parse_object(&bytes).map(JsonBody)
    }
}

pub fn parse_object(bytes: &[u8]) -> Result<JsonObject, ApiError> {
    match serde_json::from_slice(bytes) {
        Ok(serde_json::Value::Object(map)) if !map.is_empty() => Ok(map),
        _ => Err(ApiError::validation(BODY_REQUIRED)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_rejections() {
        for body in [&b""[..], b"null", b"[]", b"{}", b"{not json", b"\"text\""] {
            let err = parse_object(body).unwrap_err();
            assert_eq!(err.public_message(), BODY_REQUIRED);
        }
        let map = parse_object(br#"{"name":"Finance"}"#).unwrap();
        assert_eq!(map["name"], "Finance");
    }

    #[test]
    fn test_request_ids_are_unique() {
        let req = axum::http::Request::new(());
        let mut maker = MakeRequestUuid;
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
