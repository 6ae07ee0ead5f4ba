use axum::http::header::{HeaderName, HeaderValue, ACCESS_CONTROL_EXPOSE_HEADERS};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiResponse;

/// Hard upper bound on page size; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: u64 = 50;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

pub static PAGINATION_HEADER: HeaderName = HeaderName::from_static("pagination");

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 { 1 }
fn default_page_size() -> u64 { DEFAULT_PAGE_SIZE }

impl PaginationParams {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self { page, page_size }
    }

    /// 1-based page number; page 0 is read as the first page.
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip; saturates for absurd page numbers so the window is simply empty.
    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let page_size = params.limit();
        let total_pages = total.div_ceil(page_size);
        Self {
            items,
            current_page: params.page(),
            page_size,
            total_count: total,
            total_pages,
        }
    }

    pub fn header(&self) -> PaginationHeader {
        PaginationHeader {
            current_page: self.current_page,
            items_per_page: self.page_size,
            total_items: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// Response-side pagination descriptor, emitted as JSON in the `Pagination` header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationHeader {
    pub current_page: u64,
    pub items_per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// JSON body plus `Pagination` header for list endpoints.
pub struct PagedJson<T: Serialize>(pub Paginated<T>);

impl<T: Serialize> IntoResponse for PagedJson<T> {
    fn into_response(self) -> Response {
        let header = serde_json::to_string(&self.0.header())
            .ok()
            .and_then(|h| HeaderValue::from_str(&h).ok());

        let mut response = Json(ApiResponse::ok(self.0)).into_response();
        if let Some(value) = header {
            let headers = response.headers_mut();
            headers.insert(PAGINATION_HEADER.clone(), value);
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_static("Pagination"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped_to_fifty() {
        let params = PaginationParams::new(1, 1000);
        assert_eq!(params.limit(), 50);
        assert_eq!(params.offset(), 0);

        let params = PaginationParams::new(3, 1000);
        assert_eq!(params.offset(), 100);
    }

    #[test]
    fn page_zero_reads_as_first_page() {
        let params = PaginationParams::new(0, 10);
        assert_eq!(params.page(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn huge_page_number_saturates_offset() {
        let params = PaginationParams::new(u64::MAX, 10);
        assert_eq!(params.offset(), u64::MAX);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams::new(1, 10);
        let page: Paginated<u32> = Paginated::new(vec![], 21, &params);
        assert_eq!(page.total_pages, 3);

        let empty: Paginated<u32> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn header_uses_camel_case() {
        let params = PaginationParams::new(2, 5);
        let page: Paginated<u32> = Paginated::new(vec![6, 7], 7, &params);
        let json = serde_json::to_value(page.header()).unwrap();

        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["itemsPerPage"], 5);
        assert_eq!(json["totalItems"], 7);
        assert_eq!(json["totalPages"], 2);
    }

    #[test]
    fn paged_json_sets_pagination_header() {
        let params = PaginationParams::default();
        let response = PagedJson(Paginated::new(vec!["a"], 1, &params)).into_response();

        let header = response.headers().get("pagination").unwrap().to_str().unwrap();
        let parsed: PaginationHeader = serde_json::from_str(header).unwrap();
        assert_eq!(parsed.total_items, 1);
        assert_eq!(parsed.items_per_page, DEFAULT_PAGE_SIZE);
    }
}
