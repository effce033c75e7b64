//! HTTP API shaping for Stockroom: the error taxonomy, success and error
//! envelopes, pagination and request validation.

mod error;
mod pagination;
mod response;
mod validation;

pub use error::{ApiError, ErrorBody, VALIDATION_FAILED};
pub use pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, PageParams};
pub use response::{ApiResponse, CacheStatus, Paginated, Pagination, X_CACHE};
pub use validation::{FieldError, Validator, is_valid_email, is_valid_phone};

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
