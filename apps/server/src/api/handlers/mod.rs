//! Request handlers for API endpoints
//!
//! Handlers extract and check request parameters, call the terminology
//! service or the allocator, and shape the JSON response.

pub mod codes;
pub mod rid;
pub mod valuesets;

/// Page size from a caller value; zero or negative selects `default`.
pub(crate) fn page_size(take: Option<i64>, default: usize) -> usize {
    match take {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
        _ => default,
    }
}

/// Offset from a caller value; negative offsets start at the beginning.
pub(crate) fn offset(skip: Option<i64>) -> usize {
    skip.and_then(|n| usize::try_from(n).ok()).unwrap_or(0)
}
