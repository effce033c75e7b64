use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
/// Upper bound on `limit`; larger values are clamped.
pub const MAX_LIMIT: u64 = 100;

/// Page and page size parsed from query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageParams {
    /// Parses raw query values. Missing, non-numeric and non-positive values
    /// fall back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(limit)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        Self { page, limit }
    }

    /// Number of items before this page.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
