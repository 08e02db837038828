//! Fixed-size, 1-based page slicing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// Page number and size after boundary input has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

/// Defaults used when a request leaves paging out or sends nonsense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl PageLimits {
    /// `page <= 0` becomes page 1, `page_size <= 0` becomes the default size,
    /// and sizes above the maximum are capped.
    pub fn normalize(&self, page: Option<i64>, page_size: Option<i64>) -> PageRequest {
        let max = self.max_page_size.max(1);
        let default_size = self.default_page_size.clamp(1, max);

        let page = match page {
            Some(p) if p > 0 => usize::try_from(p).unwrap_or(usize::MAX),
            _ => DEFAULT_PAGE,
        };
        let page_size = match page_size {
            Some(s) if s > 0 => usize::try_from(s).unwrap_or(max).min(max),
            _ => default_size,
        };

        PageRequest { page, page_size }
    }
}

/// Returns `items[(page - 1) * page_size .. page * page_size]`, clipped to the
/// collection. Pages past the end are empty. `page` and `page_size` of zero
/// are treated as 1 and [`DEFAULT_PAGE_SIZE`].
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let page = page.max(1);
    let page_size = if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    };

    let Some(start) = (page - 1).checked_mul(page_size) else {
        return &[];
    };
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}
