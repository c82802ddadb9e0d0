use std::num::NonZeroUsize;
use std::ops::Range;

/// A contiguous half-open range `[start, end)` of dataset indices assigned to one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Section {
    pub start: usize,
    pub end: usize,
}

impl Section {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "section start {start} past end {end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Splits `len` items into `workers` contiguous sections.
///
/// The first `len % workers` sections hold one extra item, so sizes never differ
/// by more than one. With more workers than items the tail sections are empty.
pub fn partition(len: usize, workers: NonZeroUsize) -> Vec<Section> {
    let workers = workers.get();
    let chunk_size = len / workers;
    let remainder = len % workers;

    let mut sections = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 0..workers {
        let end = start + chunk_size + usize::from(i < remainder);
        sections.push(Section::new(start, end));
        start = end;
    }

    debug_assert_eq!(start, len);
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn assert_well_formed(len: usize, sections: &[Section]) {
        assert!(!sections.is_empty());
        assert_eq!(sections[0].start, 0);
        assert_eq!(sections.last().unwrap().end, len);
        for pair in sections.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap in {:?}", sections);
        }
        let max = sections.iter().map(Section::len).max().unwrap();
        let min = sections.iter().map(Section::len).min().unwrap();
        assert!(max - min <= 1, "uneven sections {:?}", sections);
        assert_eq!(sections.iter().map(Section::len).sum::<usize>(), len);
    }

    #[test]
    fn test_even_split() {
        let sections = partition(9, nz(3));
        assert_eq!(
            sections,
            vec![Section::new(0, 3), Section::new(3, 6), Section::new(6, 9)]
        );
    }

    #[test]
    fn test_remainder_goes_to_leading_sections() {
        let sections = partition(5, nz(2));
        assert_eq!(sections, vec![Section::new(0, 3), Section::new(3, 5)]);

        let sections = partition(11, nz(4));
        let sizes: Vec<usize> = sections.iter().map(Section::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
    }

    #[test]
    fn test_more_workers_than_items() {
        let sections = partition(5, nz(10));
        assert_eq!(sections.len(), 10);
        assert!(sections[..5].iter().all(|s| s.len() == 1));
        assert!(sections[5..].iter().all(Section::is_empty));
        assert!(sections[5..].iter().all(|s| s.start == 5));
    }

    #[test]
    fn test_empty_input() {
        let sections = partition(0, nz(3));
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(Section::is_empty));
    }

    #[test]
    fn test_single_worker_takes_everything() {
        assert_eq!(partition(42, nz(1)), vec![Section::new(0, 42)]);
    }

    #[test]
    fn test_coverage_across_shapes() {
        for len in 0..64 {
            for workers in 1..20 {
                let sections = partition(len, nz(workers));
                assert_eq!(sections.len(), workers);
                assert_well_formed(len, &sections);
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Section::new(3, 5).to_string(), "[3, 5)");
    }
}
