//! Page plan: which logical pages are emitted, in which order
//!
//! Applies page ranges, the even/odd page set, reverse order and copies
//! (collated or not). The position of a page in the plan is what the N-up
//! break rules of the surface work on.

use shared::{PageSet, PrintSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pages: Vec<usize>,
}

impl PagePlan {
    pub fn new(page_count: usize, settings: &PrintSettings) -> Self {
        let mut selected: Vec<usize> = if settings.page_ranges.is_empty() {
            (0..page_count).collect()
        } else {
            let mut pages = Vec::new();
            for range in &settings.page_ranges {
                let end = range.end.min(page_count.saturating_sub(1));
                if page_count == 0 || range.start > end {
                    continue;
                }
                pages.extend(range.start..=end);
            }
            pages
        };

        // Even/odd refer to 1-based page numbers
        match settings.page_set {
            PageSet::All => {}
            PageSet::Even => selected.retain(|page| (page + 1) % 2 == 0),
            PageSet::Odd => selected.retain(|page| (page + 1) % 2 == 1),
        }

        if settings.reverse {
            selected.reverse();
        }

        let copies = settings.copies() as usize;
        let pages = if copies == 1 {
            selected
        } else if settings.collate {
            selected.repeat(copies)
        } else {
            selected
                .iter()
                .flat_map(|&page| std::iter::repeat_n(page, copies))
                .collect()
        };

        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Logical page index at each position
    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    /// `(position, page)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pages.iter().copied().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PageRange;

    #[test]
    fn test_all_pages_in_order() {
        let plan = PagePlan::new(3, &PrintSettings::default());
        assert_eq!(plan.pages(), &[0, 1, 2]);
    }

    #[test]
    fn test_ranges_clamped_to_document() {
        let settings = PrintSettings {
            page_ranges: vec![PageRange::new(1, 2), PageRange::new(4, 10), PageRange::single(20)],
            ..Default::default()
        };
        assert_eq!(PagePlan::new(6, &settings).pages(), &[1, 2, 4, 5]);
    }

    #[test]
    fn test_even_and_odd_use_page_numbers() {
        let even = PrintSettings {
            page_set: PageSet::Even,
            ..Default::default()
        };
        let odd = PrintSettings {
            page_set: PageSet::Odd,
            ..Default::default()
        };
        assert_eq!(PagePlan::new(5, &even).pages(), &[1, 3]);
        assert_eq!(PagePlan::new(5, &odd).pages(), &[0, 2, 4]);
    }

    #[test]
    fn test_collated_copies() {
        let settings = PrintSettings::default().with_copies(2, true);
        assert_eq!(PagePlan::new(3, &settings).pages(), &[0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_uncollated_reverse_copies() {
        let settings = PrintSettings {
            reverse: true,
            ..PrintSettings::default().with_copies(2, false)
        };
        assert_eq!(PagePlan::new(3, &settings).pages(), &[2, 2, 1, 1, 0, 0]);
    }

    #[test]
    fn test_empty_document() {
        let settings = PrintSettings {
            page_ranges: vec![PageRange::new(0, 3)],
            ..Default::default()
        };
        assert!(PagePlan::new(0, &settings).is_empty());
    }
}
