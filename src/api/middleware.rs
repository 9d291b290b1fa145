//! Middleware Components
//!
//! CORS, request tracking and the per-request context extractor.

use super::errors::ApiError;
use crate::common::types::RequestContext;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer, ExposeHeaders};
use uuid::Uuid;

/// Request ID header key
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Authenticated caller, set by the fronting UI
pub const USER_ID_HEADER: &str = "x-user-id";

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Create CORS middleware with configurable origins
pub fn create_cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let expose = ExposeHeaders::list([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        // Development mode: allow all origins
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(expose)
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .into_iter()
                    .filter_map(|o| o.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(Any)
            .expose_headers(expose)
    }
}

/// Middleware to add request ID to all requests
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    // Keep a client-supplied id when it is a valid header value
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Request ID wrapper for extracting in handlers
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

impl RequestId {
    fn from_parts(parts: &Parts) -> Self {
        parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestId::from_parts(parts))
    }
}

/// Builds the service-level context from `x-user-id`, the request id and an
/// optional `idempotency-key`
#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let RequestId(request_id) = RequestId::from_parts(parts);

        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ApiError::bad_request(
                    request_id.clone(),
                    format!("Missing or invalid {} header", USER_ID_HEADER),
                )
            })?;

        let mut ctx = RequestContext::new(user_id).with_request_id(request_id.clone());

        if let Some(raw) = parts.headers.get(IDEMPOTENCY_KEY_HEADER) {
            let key = raw
                .to_str()
                .ok()
                .map(str::trim)
                .filter(|k| !k.is_empty() && k.len() <= MAX_IDEMPOTENCY_KEY_LEN)
                .ok_or_else(|| {
                    ApiError::bad_request(
                        request_id,
                        format!(
                            "{} must be 1-{} visible characters",
                            IDEMPOTENCY_KEY_HEADER, MAX_IDEMPOTENCY_KEY_LEN
                        ),
                    )
                })?;
            ctx = ctx.with_idempotency_key(key);
        }

        Ok(ctx)
    }
}

/// JSON body extractor whose rejections use the API error body
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::bad_request(request_id, rejection.body_text())),
        }
    }
}

/// Path parameter extractor whose rejections use the API error body
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                let RequestId(request_id) = RequestId::from_parts(parts);
                Err(ApiError::bad_request(request_id, rejection.body_text()))
            }
        }
    }
}

/// Query string extractor whose rejections use the API error body
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => {
                let RequestId(request_id) = RequestId::from_parts(parts);
                Err(ApiError::bad_request(request_id, rejection.body_text()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;
    use axum::http::Request as HttpRequest;

    async fn extract(request: HttpRequest<()>) -> Result<RequestContext, ApiError> {
        let (mut parts, _) = request.into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_context_from_headers() {
        let mut request = HttpRequest::builder()
            .header(USER_ID_HEADER, "7")
            .header(IDEMPOTENCY_KEY_HEADER, "abc")
            .body(())
            .unwrap();
        request.extensions_mut().insert(RequestId("req-9".to_string()));

        let ctx = extract(request).await.unwrap();
        assert_eq!(ctx.user_id, 7);
        assert_eq!(ctx.request_id, "req-9");
        assert_eq!(ctx.idempotency_key.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_missing_user_header_is_validation_error() {
        let request = HttpRequest::builder().body(()).unwrap();
        let err = extract(request).await.unwrap_err();
        assert!(matches!(err.error, CasinoError::Validation(_)));

        let request = HttpRequest::builder().header(USER_ID_HEADER, "abc").body(()).unwrap();
        assert!(extract(request).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_validation_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Body {
            #[allow(dead_code)]
            tokens: i64,
        }

        let mut request = HttpRequest::builder()
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{\"tokens\": \"lots\"}"))
            .unwrap();
        request.extensions_mut().insert(RequestId("req-json".to_string()));

        let err = ApiJson::<Body>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.request_id, "req-json");
        assert!(matches!(err.error, CasinoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_idempotency_key_rejected() {
        let request = HttpRequest::builder()
            .header(USER_ID_HEADER, "1")
            .header(IDEMPOTENCY_KEY_HEADER, "  ")
            .body(())
            .unwrap();
        assert!(extract(request).await.is_err());
    }
}
