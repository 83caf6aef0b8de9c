use std::fmt::{self, Display, Formatter};

/// A contiguous, half-open range `[start, end)` of source sentence positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "invalid span [{}, {})", start, end);
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Checks whether `children` and `terminals` further source positions
    /// cover `self` exactly: children are sorted, pairwise disjoint, inside
    /// `self`, and the remaining positions are exactly the terminals.
    pub fn is_tiled_by(&self, children: &[Span], terminals: usize) -> bool {
        let mut covered = 0;
        let mut last_end = self.start;
        for child in children {
            if !self.contains(child) || child.start < last_end {
                return false;
            }
            covered += child.len();
            last_end = child.end;
        }
        covered + terminals == self.len()
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiling() {
        let parent = Span::new(0, 5);
        assert!(parent.is_tiled_by(&[Span::new(0, 2), Span::new(3, 5)], 1));
        assert!(parent.is_tiled_by(&[], 5));
        assert!(!parent.is_tiled_by(&[Span::new(0, 2), Span::new(3, 5)], 0));
        assert!(!parent.is_tiled_by(&[Span::new(3, 5), Span::new(0, 2)], 1));
        assert!(!parent.is_tiled_by(&[Span::new(0, 3), Span::new(2, 5)], 0));
        assert!(!parent.is_tiled_by(&[Span::new(4, 6)], 3));
    }

    #[test]
    fn ordering_and_overlap() {
        assert!(Span::new(0, 2) < Span::new(0, 3));
        assert!(Span::new(0, 3) < Span::new(1, 2));
        assert!(Span::new(0, 3).overlaps(&Span::new(2, 4)));
        assert!(!Span::new(0, 2).overlaps(&Span::new(2, 4)));
        assert_eq!(format!("{}", Span::new(1, 4)), "[1, 4)");
    }
}
