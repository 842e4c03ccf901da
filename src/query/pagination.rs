use serde::Serialize;

use crate::utils::num::window_end;

/// A page window a client can request next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_previous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageWindow>,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageWindow>,
}

/// Maps `(total, page, page_size)` to the neighbouring windows.
///
/// A page past the end is not an error: it has no next window, and still reports a
/// previous one whenever `page > 1`, even for an empty collection.
#[must_use]
pub fn paginate(total: u64, page: u64, page_size: u64) -> PageInfo {
    let has_next = window_end(page, page_size) < total;
    let has_previous = page > 1;
    PageInfo {
        has_previous,
        previous: has_previous.then_some(PageWindow { page: page.saturating_sub(1), limit: page_size }),
        has_next,
        next: has_next.then_some(PageWindow { page: page.saturating_add(1), limit: page_size }),
    }
}
