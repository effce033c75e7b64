//! Success envelopes: `{status, message, data?, pagination?}`.

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Header reporting whether a read was served from the cache.
pub const X_CACHE: &str = "x-cache";

/// Outcome of a cache lookup on a read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    pub fn is_hit(self) -> bool {
        self == CacheStatus::Hit
    }

    pub fn header_value(self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

/// Pagination metadata for list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub items_per_page: u64,
    pub total_items: u64,
}

impl Pagination {
    /// `total_pages` is `ceil(total / limit)`, and 0 for an empty result.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            current_page: page,
            total_pages,
            items_per_page: limit,
            total_items: total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Envelope<'a, T> {
    status: u16,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<&'a Pagination>,
}

/// A success response with optional payload and extra headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: StatusCode,
    pub message: String,
    pub data: Option<T>,
    pub pagination: Option<Pagination>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

/// A paginated list response.
pub type Paginated<T> = ApiResponse<Vec<T>>;

impl<T> ApiResponse<T> {
    fn new(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status,
            message: message.into(),
            data,
            pagination: None,
            headers: Vec::new(),
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, Some(data))
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, Some(data))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn with_cache_status(self, status: CacheStatus) -> Self {
        self.with_header(HeaderName::from_static(X_CACHE), status.header_value())
    }
}

impl ApiResponse<()> {
    /// 200 with only `{status, message}`.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message, None)
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn paginated(message: impl Into<String>, items: Vec<T>, pagination: Pagination) -> Self {
        let mut response = Self::new(StatusCode::OK, message, Some(items));
        response.pagination = Some(pagination);
        response
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let envelope = Envelope {
            status: self.status.as_u16(),
            message: &self.message,
            data: self.data.as_ref(),
            pagination: self.pagination.as_ref(),
        };

        let (status, body) = match serde_json::to_vec(&envelope) {
            Ok(body) => (self.status, body),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"status":500,"message":"Error processing response"}"#.to_vec(),
            ),
        };

        let mut response = (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )],
            body,
        )
            .into_response();
        for (name, value) in self.headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}
