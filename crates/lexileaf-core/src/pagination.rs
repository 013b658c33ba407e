//! Pagination utilities.
//!
//! Pages are fixed-size windows over the token sequence; every token counts
//! toward the window, words and punctuation alike, so boundaries only depend
//! on the token index. Learner-facing progress uses a separate counter based
//! on distinct words. The two are deliberately kept apart.

use std::ops::Range;

/// Minimum allowed page size (tokens).
pub const MIN_PAGE_SIZE: usize = 10;
/// Maximum allowed page size (tokens).
pub const MAX_PAGE_SIZE: usize = 5000;
/// Page size used when the learner has not chosen one.
pub const DEFAULT_PAGE_SIZE: usize = 250;

pub fn clamp_page_size(page_size: usize) -> usize {
    page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

pub fn page_of(token_index: usize, page_size: usize) -> usize {
    token_index / page_size.max(1)
}

/// Half-open token range of `page`, clipped to `total_tokens`.
pub fn range_of(page: usize, page_size: usize, total_tokens: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let start = page.saturating_mul(page_size).min(total_tokens);
    let end = start.saturating_add(page_size).min(total_tokens);
    start..end
}

pub fn total_pages(total_units: usize, page_size: usize) -> usize {
    total_units.div_ceil(page_size.max(1))
}

/// Token-volume and vocabulary-size page counts for one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCounters {
    /// Pages used to slice the token window shown on screen.
    pub token_pages: usize,
    /// Pages over distinct normalized words; denominator of the progress bar.
    pub vocabulary_pages: usize,
}

impl PageCounters {
    pub fn new(token_count: usize, distinct_words: usize, page_size: usize) -> Self {
        Self {
            token_pages: total_pages(token_count, page_size),
            vocabulary_pages: total_pages(distinct_words, page_size),
        }
    }

    /// Last valid page index for navigation.
    pub fn last_page(&self) -> usize {
        self.token_pages.saturating_sub(1)
    }

    pub fn progress_pct(&self, current_page: usize) -> f64 {
        if self.vocabulary_pages == 0 {
            return 0.0;
        }
        let pct = (current_page + 1) as f64 / self.vocabulary_pages as f64 * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seven_tokens_in_pages_of_two() {
        assert_eq!(total_pages(7, 2), 4);
        assert_eq!(range_of(3, 2, 7), 6..7);
        assert_eq!(range_of(3, 2, 7).len(), 1);
        assert_eq!(range_of(9, 2, 7), 7..7);
    }

    #[test]
    fn range_start_lies_on_its_own_page() {
        for size in 1..12 {
            for page in 0..total_pages(50, size) {
                let range = range_of(page, size, 50);
                assert_eq!(page_of(range.start, size), page);
            }
        }
    }

    #[test]
    fn zero_page_size_is_treated_as_one() {
        assert_eq!(page_of(5, 0), 5);
        assert_eq!(total_pages(3, 0), 3);
        assert_eq!(range_of(1, 0, 3), 1..2);
    }

    #[test]
    fn counters_keep_token_and_vocabulary_totals_apart() {
        let counters = PageCounters::new(700, 120, 250);
        assert_eq!(counters.token_pages, 3);
        assert_eq!(counters.vocabulary_pages, 1);
        assert_eq!(counters.last_page(), 2);
        assert!((counters.progress_pct(0) - 100.0).abs() < f64::EPSILON);

        let counters = PageCounters::new(700, 600, 250);
        assert!((counters.progress_pct(0) - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(PageCounters::new(0, 0, 250).progress_pct(0), 0.0);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_page_size(1), MIN_PAGE_SIZE);
        assert_eq!(clamp_page_size(1_000_000), MAX_PAGE_SIZE);
        assert_eq!(clamp_page_size(300), 300);
    }
}
