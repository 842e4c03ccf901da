//! Numeric conversions kept in one place so call sites stay searchable.

#[inline]
#[must_use]
pub fn u64_to_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn millis_u64(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// `page * page_size` without overflow; saturates instead.
#[inline]
#[must_use]
pub fn window_end(page: u64, page_size: u64) -> u64 {
    page.saturating_mul(page_size)
}
