use rocket::FromForm;
use serde::Serialize;

/// Which page of a listing the client wants. Pages are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromForm)]
pub struct PaginationRequest {
    #[field(default = 1, validate = range(1..))]
    pub page_num: u32,
    #[field(default = 50, validate = range(1..=500))]
    pub page_size: u32,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page_num: 1,
            page_size: 50,
        }
    }
}

impl PaginationRequest {
    pub fn skip(&self) -> u64 {
        u64::from(self.page_num - 1) * u64::from(self.page_size)
    }

    pub fn page_size(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// Wrap one page of items together with its position in the listing.
    pub fn to_paginated<T>(self, total: u64, items: Vec<T>) -> Paginated<T> {
        Paginated {
            items,
            pagination: PaginationResult {
                page_num: self.page_num,
                page_size: self.page_size,
                total,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationResult {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_counts_whole_pages() {
        let first = PaginationRequest::default();
        assert_eq!(first.skip(), 0);

        let third = PaginationRequest {
            page_num: 3,
            page_size: 20,
        };
        assert_eq!(third.skip(), 40);

        let page = third.to_paginated(45, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(page.pagination.total, 45);
        assert_eq!(page.items.len(), 5);
    }
}
