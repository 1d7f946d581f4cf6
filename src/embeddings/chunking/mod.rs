
use tracing::debug;

use crate::{DocqaError, Result};

/// Default page size in characters for raw text ingestion
pub const DEFAULT_SLICE_SIZE: usize = 1600;

/// One fixed-size slice of a document's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice {
    /// 1-based page number
    pub page: u32,
    /// Slice text, at most `slice_size` characters
    pub text: String,
}

/// Slice text into contiguous, non-overlapping pages of `slice_size` characters
///
/// Slicing counts Unicode scalar values, so a code point is never split.
/// The final page may be shorter; empty text yields no pages.
#[inline]
pub fn slice_pages(text: &str, slice_size: usize) -> Result<Vec<PageSlice>> {
    if slice_size == 0 {
        return Err(DocqaError::Validation(
            "slice size must be at least 1".to_string(),
        ));
    }

    let mut pages = Vec::with_capacity(text.len() / slice_size + 1);
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;

        if count == slice_size {
            pages.push(PageSlice {
                page: next_page(pages.len()),
                text: std::mem::take(&mut current),
            });
            count = 0;
        }
    }

    if !current.is_empty() {
        pages.push(PageSlice {
            page: next_page(pages.len()),
            text: current,
        });
    }

    debug!(
        "Sliced {} characters into {} pages of up to {} characters",
        text.chars().count(),
        pages.len(),
        slice_size
    );

    Ok(pages)
}

fn next_page(existing: usize) -> u32 {
    u32::try_from(existing + 1).unwrap_or(u32::MAX)
}
