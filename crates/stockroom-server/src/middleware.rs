use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request id stored in request extensions for spans and handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub HeaderValue);

impl RequestId {
    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap_or_default()
    }
}

/// Preserves an incoming `x-request-id` or generates one, and echoes it on
/// the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(X_REQUEST_ID);

    let req_id_value = match req.headers().get(&header_name) {
        Some(value) => value.clone(),
        None => {
            // A hyphenated UUID is always a valid header value.
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
        }
    };

    req.extensions_mut().insert(RequestId(req_id_value.clone()));

    let mut res = next.run(req).await;
    res.headers_mut().insert(header_name, req_id_value);
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware::from_fn, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|axum::Extension(id): axum::Extension<RequestId>| async move {
                    id.as_str().to_string()
                }),
            )
            .layer(from_fn(request_id))
    }

    #[tokio::test]
    async fn generates_and_echoes_an_id() {
        let res = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let header = res.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, header.as_bytes());
    }

    #[tokio::test]
    async fn preserves_incoming_id() {
        let res = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers().get(X_REQUEST_ID).unwrap(), "abc-123");
    }
}
