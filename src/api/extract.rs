//! Request extractors.
//!
//! Bodies are parsed from raw bytes so a missing `Content-Type` header does not
//! turn into a plain-text rejection. Every failure becomes an [`ApiError`] and
//! is rendered through the JSON envelope.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::api::error::ApiError;

/// Typed JSON body. Unknown or missing fields are a 400.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::BadRequest("Request body is required".to_string()));
        }

        Ok(JsonBody(serde_json::from_slice(&bytes)?))
    }
}

/// `{"id": "..."}` body shared by the id-only endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdRequest {
    pub id: String,
}

/// `?id=` query parameter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Take the target id from the query string, falling back to a JSON body.
pub fn resolve_id(query: IdQuery, body: &Bytes) -> Result<String, ApiError> {
    if let Some(id) = query.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) {
        return Ok(id);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("Invalid or missing 'id'".to_string()));
    }

    let request: IdRequest = serde_json::from_slice(body)?;
    non_empty_id(request.id)
}

/// Reject blank ids.
pub fn non_empty_id(id: String) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::BadRequest("Invalid or missing 'id'".to_string()));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_id_wins() {
        let query = IdQuery {
            id: Some("abc".to_string()),
        };
        let body = Bytes::from_static(br#"{"id":"def"}"#);
        assert_eq!(resolve_id(query, &body).unwrap(), "abc");
    }

    #[test]
    fn test_body_id_fallback() {
        let body = Bytes::from_static(br#"{"id":"def"}"#);
        assert_eq!(resolve_id(IdQuery::default(), &body).unwrap(), "def");
    }

    #[test]
    fn test_missing_id() {
        assert!(matches!(
            resolve_id(IdQuery::default(), &Bytes::new()),
            Err(ApiError::BadRequest(_))
        ));
        let blank = Bytes::from_static(br#"{"id":"  "}"#);
        assert!(resolve_id(IdQuery::default(), &blank).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let body = Bytes::from_static(br#"{"id":"x","force":true}"#);
        assert!(matches!(
            resolve_id(IdQuery::default(), &body),
            Err(ApiError::BadRequest(_))
        ));
    }
}
