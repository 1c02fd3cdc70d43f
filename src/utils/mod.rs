use std::fmt::Debug;
use std::iter::Sum;
use std::ops::AddAssign;

use num_traits::{Float, FromPrimitive, NumCast, ToPrimitive};

/// Floating point element type accepted by every table, projection and ranking in the crate.
pub trait FloatOps:
    Float + FromPrimitive + ToPrimitive + AddAssign + Sum + Send + Sync + Debug + Default + 'static
{
    /// Converts a count to the float type. Counts beyond the representable range saturate.
    fn from_count(n: usize) -> Self {
        <Self as NumCast>::from(n).unwrap_or_else(Self::max_value)
    }

    fn from_f64_lossy(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::nan)
    }
}

impl FloatOps for f32 {}
impl FloatOps for f64 {}

/// Which end of a rank scale marks the most explanatory dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankOrder {
    /// Lower rank is better.
    Ascending,
    /// Higher rank is better.
    Descending,
}

impl RankOrder {
    /// `true` if `candidate` ranks strictly better than `current`. NaN never wins.
    pub fn is_better<T: PartialOrd>(&self, candidate: T, current: T) -> bool {
        match self {
            RankOrder::Ascending => candidate < current,
            RankOrder::Descending => candidate > current,
        }
    }

    pub fn is_lower_better(&self) -> bool {
        matches!(self, RankOrder::Ascending)
    }
}

/// Replaces a zero denominator by one so that a ratio against it stays finite.
#[inline]
pub(crate) fn nonzero_or_one<T: FloatOps>(value: T) -> T {
    if value == T::zero() || !value.is_finite() {
        T::one()
    } else {
        value
    }
}

/// Min-max normalizes in place. When every value is equal the result is all zeros.
pub fn normalize_min_max<T: FloatOps>(values: &mut [T]) {
    let (min, max) = values
        .iter()
        .fold((T::infinity(), T::neg_infinity()), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let spread = max - min;
    if values.is_empty() || !(spread > T::zero()) || !spread.is_finite() {
        values.iter_mut().for_each(|v| *v = T::zero());
        return;
    }

    for v in values.iter_mut() {
        *v = (*v - min) / spread;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rank_order() {
        assert!(RankOrder::Ascending.is_better(0.1, 0.2));
        assert!(!RankOrder::Ascending.is_better(0.2, 0.2));
        assert!(RankOrder::Descending.is_better(0.3, 0.2));
        assert!(!RankOrder::Descending.is_better(f32::NAN, 0.2));
        assert!(!RankOrder::Ascending.is_better(f32::NAN, 0.2));
    }

    #[test]
    fn test_normalize_min_max() {
        let mut values = vec![2.0f32, 4.0, 3.0];
        normalize_min_max(&mut values);
        assert_relative_eq!(values[0], 0.0);
        assert_relative_eq!(values[1], 1.0);
        assert_relative_eq!(values[2], 0.5);
    }

    #[test]
    fn test_normalize_min_max_flat() {
        let mut values = vec![0.7f64; 5];
        normalize_min_max(&mut values);
        assert!(values.iter().all(|&v| v == 0.0));

        let mut empty: Vec<f32> = Vec::new();
        normalize_min_max(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_nonzero_or_one() {
        assert_eq!(nonzero_or_one(0.0f32), 1.0);
        assert_eq!(nonzero_or_one(2.5f32), 2.5);
        assert_eq!(nonzero_or_one(f64::NAN), 1.0);
    }
}
