use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::ops::{Add, Range, Sub};

/// A totally ordered log-domain score; greater is better.
#[derive(Debug, Default, Clone, Copy)]
pub struct Score(pub f64);

impl Score {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// `NaN` scores are ordered below everything else so they never win a
/// recombination or a k-best slot.
impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl Add for Score {
    type Output = Score;
    fn add(self, other: Score) -> Score {
        Score(self.0 + other.0)
    }
}

impl Sub for Score {
    type Output = Score;
    fn sub(self, other: Score) -> Score {
        Score(self.0 - other.0)
    }
}

impl Zero for Score {
    fn zero() -> Self {
        Score(0.0)
    }
    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// The position of one feature's scores inside a `ScoreBreakdown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSlot {
    pub name: String,
    pub offset: usize,
    pub len: usize,
}

impl ScoreSlot {
    pub fn range(&self) -> Range<usize> {
        self.offset..(self.offset + self.len)
    }
}

/// Assigns each registered feature a disjoint range of score components.
#[derive(Debug, Clone, Default)]
pub struct ScoreLayout {
    slots: Vec<ScoreSlot>,
    size: usize,
}

impl ScoreLayout {
    pub fn push(&mut self, name: &str, len: usize) -> usize {
        self.slots.push(ScoreSlot {
            name: name.to_string(),
            offset: self.size,
            len,
        });
        self.size += len;
        self.slots.len() - 1
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn slot(&self, index: usize) -> &ScoreSlot {
        &self.slots[index]
    }

    pub fn slots(&self) -> &[ScoreSlot] {
        &self.slots
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    pub fn zeros(&self) -> ScoreBreakdown {
        ScoreBreakdown(vec![0.0; self.size])
    }
}

/// Dense collection of all feature scores of a hypothesis or rule, laid out
/// according to a `ScoreLayout`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreBreakdown(Vec<f64>);

impl ScoreBreakdown {
    pub fn from_vec(values: Vec<f64>) -> Self {
        ScoreBreakdown(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, slot: &ScoreSlot) -> &[f64] {
        &self.0[slot.range()]
    }

    pub fn get_mut(&mut self, slot: &ScoreSlot) -> &mut [f64] {
        &mut self.0[slot.range()]
    }

    /// Zeroes all components, resizing to `size` without giving back memory.
    pub fn reset(&mut self, size: usize) {
        self.0.clear();
        self.0.resize(size, 0.0);
    }

    pub fn plus_equals(&mut self, other: &ScoreBreakdown) {
        assert_eq!(
            self.0.len(),
            other.0.len(),
            "score breakdowns with different layouts"
        );
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a += *b;
        }
    }

    pub fn inner_product(&self, weights: &Weights) -> Score {
        assert_eq!(self.0.len(), weights.0.len(), "weights do not fit the layout");
        Score(self.0.iter().zip(&weights.0).map(|(s, w)| s * w).sum())
    }
}

/// One weight per score component.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights(Vec<f64>);

impl Weights {
    pub fn from_vec(values: Vec<f64>) -> Self {
        Weights(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, slot: &ScoreSlot) -> &[f64] {
        &self.0[slot.range()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_inner_product() {
        let mut layout = ScoreLayout::default();
        let a = layout.push("a", 2);
        let b = layout.push("b", 1);
        assert_eq!(layout.size(), 3);
        assert_eq!(layout.slot(b).offset, 2);
        assert_eq!(layout.position("b"), Some(b));

        let mut scores = layout.zeros();
        scores.get_mut(layout.slot(a)).copy_from_slice(&[1.0, 2.0]);
        scores.get_mut(layout.slot(b))[0] = -1.0;

        let mut other = layout.zeros();
        other.get_mut(layout.slot(b))[0] = -1.0;
        scores.plus_equals(&other);
        assert_eq!(scores.as_slice(), &[1.0, 2.0, -2.0]);

        let weights = Weights::from_vec(vec![1.0, 0.5, 2.0]);
        assert_eq!(scores.inner_product(&weights), Score(-2.0));
    }

    #[test]
    fn nan_is_worst() {
        assert!(Score(std::f64::NAN) < Score(-1e300));
        assert_eq!(Score(std::f64::NAN), Score(std::f64::NAN));
        assert!(Score(0.3) > Score(0.2));
        assert!(Score::zero().is_zero());
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut scores = ScoreBreakdown::from_vec(vec![1.0; 16]);
        scores.reset(4);
        assert_eq!(scores.as_slice(), &[0.0; 4]);
        assert!(scores.0.capacity() >= 16);
    }
}
