//! Conservative interval arithmetic
//!
//! An [`Interval`] is a closed, possibly unbounded range of reals together with an
//! orthogonal "may be NaN" flag. Every bound computed by the engine is expressed as an
//! interval that contains all results a correctly-rounded implementation could produce.

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, Neg};

/// A closed range `[lo, hi]` of reals plus a NaN flag
///
/// The empty interval is represented with `lo > hi`. An interval with its NaN flag
/// set accepts NaN samples regardless of its numeric bounds.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    /// Whether NaN is an acceptable value
    has_nan: bool,
    /// Lower bound, inclusive
    lo: f64,
    /// Upper bound, inclusive
    hi: f64,
}

impl Default for Interval {
    fn default() -> Self {
        Self::empty()
    }
}

impl Interval {
    /// Creates the empty interval, which contains nothing (not even NaN)
    pub const fn empty() -> Self {
        Self {
            has_nan: false,
            lo: f64::INFINITY,
            hi: f64::NEG_INFINITY,
        }
    }

    /// Creates an interval that contains only NaN
    pub const fn nan_only() -> Self {
        Self {
            has_nan: true,
            lo: f64::INFINITY,
            hi: f64::NEG_INFINITY,
        }
    }

    /// Creates a degenerate interval `[v, v]`, or a NaN-only interval if `v` is NaN
    pub fn point(v: f64) -> Self {
        if v.is_nan() { Self::nan_only() } else { Self { has_nan: false, lo: v, hi: v } }
    }

    /// Creates the hull of two values
    ///
    /// If either value is NaN the result is the NaN-only interval.
    pub fn new(a: f64, b: f64) -> Self {
        if a.is_nan() || b.is_nan() {
            Self::nan_only()
        } else {
            Self {
                has_nan: false,
                lo: a.min(b),
                hi: a.max(b),
            }
        }
    }

    /// Creates an interval from raw parts without normalizing the bounds
    pub const fn with_parts(has_nan: bool, lo: f64, hi: f64) -> Self {
        Self { has_nan, lo, hi }
    }

    /// The whole real line, optionally also admitting NaN
    pub const fn unbounded(nan: bool) -> Self {
        Self {
            has_nan: nan,
            lo: f64::NEG_INFINITY,
            hi: f64::INFINITY,
        }
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn has_nan(&self) -> bool {
        self.has_nan
    }

    /// Projects out the NaN part: NaN-only if this interval has NaN, else empty
    pub fn nan(&self) -> Self {
        if self.has_nan { Self::nan_only() } else { Self::empty() }
    }

    /// Returns the same numeric bounds with the NaN flag cleared
    pub fn without_nan(&self) -> Self {
        Self { has_nan: false, ..*self }
    }

    /// True if the numeric part is empty (the NaN flag is not considered)
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// True if both bounds are finite
    pub fn is_finite(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    /// True for non-empty, finite, NaN-free intervals
    pub fn is_ordinary(&self) -> bool {
        !self.has_nan && !self.is_empty() && self.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Returns NaN when the interval is not bounded
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.hi + self.lo)
    }

    /// Tests whether a single value lies in the interval
    ///
    /// A NaN sample is accepted exactly when the NaN flag is set.
    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() { self.has_nan } else { self.lo <= value && value <= self.hi }
    }

    /// Tests whether `other` is a subset of this interval
    pub fn contains_interval(&self, other: &Interval) -> bool {
        let nan_ok = !other.has_nan || self.has_nan;
        nan_ok && (other.is_empty() || (other.lo >= self.lo && other.hi <= self.hi))
    }

    /// Tests whether the two intervals share any value, NaN included
    pub fn intersects(&self, other: &Interval) -> bool {
        (other.hi >= self.lo && other.lo <= self.hi) || (other.has_nan && self.has_nan)
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.has_nan == other.has_nan && ((self.is_empty() && other.is_empty()) || (self.lo == other.lo && self.hi == other.hi))
    }
}

impl From<f64> for Interval {
    fn from(value: f64) -> Self {
        Interval::point(value)
    }
}

impl From<[f64; 2]> for Interval {
    fn from(bounds: [f64; 2]) -> Self {
        Interval::new(bounds[0], bounds[1])
    }
}

/// Union: the smallest interval containing both operands
impl BitOr for Interval {
    type Output = Interval;

    fn bitor(self, other: Interval) -> Interval {
        Interval {
            has_nan: self.has_nan || other.has_nan,
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }
}

/// Intersection
impl BitAnd for Interval {
    type Output = Interval;

    fn bitand(self, other: Interval) -> Interval {
        Interval {
            has_nan: self.has_nan && other.has_nan,
            lo: self.lo.max(other.lo),
            hi: self.hi.min(other.hi),
        }
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval {
            has_nan: self.has_nan,
            lo: -self.hi,
            hi: -self.lo,
        }
    }
}

/// Minkowski sum `[a.lo + b.lo, a.hi + b.hi]`
impl Add for Interval {
    type Output = Interval;

    fn add(self, other: Interval) -> Interval {
        let mut ret = Interval::empty();

        if !self.is_empty() && !other.is_empty() {
            let lo = self.lo + other.lo;
            let hi = self.hi + other.hi;
            // inf + -inf has no defined bound
            ret = if lo.is_nan() || hi.is_nan() { Interval::unbounded(true) } else { Interval::with_parts(false, lo, hi) };
        }
        if self.has_nan || other.has_nan {
            ret = ret | Interval::nan_only();
        }

        ret
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_empty(), self.has_nan) {
            (true, true) => write!(f, "{{ NaN }}"),
            (true, false) => write!(f, "{{}}"),
            (false, true) => write!(f, "{{ NaN }} | [{}, {}]", self.lo, self.hi),
            (false, false) => write!(f, "[{}, {}]", self.lo, self.hi),
        }
    }
}

/// Evaluates `body` at both endpoints of `arg` and joins the results
///
/// This is the image of `body` on `arg` under the assumption that `body` is monotone
/// on the interval. NaN is added when the argument may be NaN.
pub fn apply_monotone1(arg: &Interval, mut body: impl FnMut(f64) -> Interval) -> Interval {
    let mut ret = Interval::empty();

    if !arg.is_empty() {
        ret = body(arg.lo()) | body(arg.hi());
    }
    if arg.has_nan() {
        ret = ret | Interval::nan_only();
    }

    ret
}

/// Two-argument counterpart of [`apply_monotone1`], evaluating all four corners
pub fn apply_monotone2(arg0: &Interval, arg1: &Interval, mut body: impl FnMut(f64, f64) -> Interval) -> Interval {
    let mut ret = Interval::empty();

    if !arg0.is_empty() && !arg1.is_empty() {
        for x in [arg0.lo(), arg0.hi()] {
            for y in [arg1.lo(), arg1.hi()] {
                ret = ret | body(x, y);
            }
        }
    }
    if arg0.has_nan() || arg1.has_nan() {
        ret = ret | Interval::nan_only();
    }

    ret
}

/// Three-argument counterpart of [`apply_monotone1`], evaluating all eight corners
pub fn apply_monotone3(arg0: &Interval, arg1: &Interval, arg2: &Interval, mut body: impl FnMut(f64, f64, f64) -> Interval) -> Interval {
    let mut ret = Interval::empty();

    if !arg0.is_empty() && !arg1.is_empty() && !arg2.is_empty() {
        for x in [arg0.lo(), arg0.hi()] {
            for y in [arg1.lo(), arg1.hi()] {
                for z in [arg2.lo(), arg2.hi()] {
                    ret = ret | body(x, y, z);
                }
            }
        }
    }
    if arg0.has_nan() || arg1.has_nan() || arg2.has_nan() {
        ret = ret | Interval::nan_only();
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bounds() -> impl Strategy<Value = Interval> {
        (-1.0e6f64..1.0e6, -1.0e6f64..1.0e6, any::<bool>()).prop_map(|(a, b, nan)| {
            let interval = Interval::new(a, b);
            if nan { interval | Interval::nan_only() } else { interval }
        })
    }

    #[test]
    fn test_empty_and_point() {
        assert!(Interval::empty().is_empty());
        assert!(!Interval::empty().has_nan());
        assert!(!Interval::empty().contains(0.0));

        let point = Interval::point(2.5);
        assert!(point.contains(2.5));
        assert!(!point.contains(2.4));
        assert!(point.is_ordinary());

        let nan = Interval::point(f64::NAN);
        assert!(nan.is_empty());
        assert!(nan.has_nan());
        assert!(nan.contains(f64::NAN));
    }

    #[test]
    fn test_nan_sample_ignores_bounds() {
        let interval = Interval::new(1.0, 2.0) | Interval::nan_only();
        assert!(interval.contains(f64::NAN));
        assert!(!Interval::new(1.0, 2.0).contains(f64::NAN));
    }

    #[test]
    fn test_unbounded_accepts_everything() {
        let any = Interval::unbounded(true);
        assert!(any.contains(f64::INFINITY));
        assert!(any.contains(f64::NEG_INFINITY));
        assert!(any.contains(f64::NAN));
        assert!(!any.is_finite());
        assert!(!Interval::unbounded(false).contains(f64::NAN));
    }

    #[test]
    fn test_union_and_intersection() {
        let a = Interval::new(0.0, 1.0);
        let b = Interval::new(0.5, 3.0);
        assert_eq!(a | b, Interval::new(0.0, 3.0));
        assert_eq!(a & b, Interval::new(0.5, 1.0));
        assert!((a & Interval::new(2.0, 3.0)).is_empty());
        assert_eq!(a | Interval::empty(), a);
    }

    #[test]
    fn test_negation_flips_bounds() {
        let a = Interval::new(-1.0, 4.0);
        assert_eq!(-a, Interval::new(-4.0, 1.0));
        assert!((-Interval::nan_only()).has_nan());
    }

    #[test]
    fn test_sum() {
        let sum = Interval::new(1.0, 2.0) + Interval::new(10.0, 20.0);
        assert_eq!(sum, Interval::new(11.0, 22.0));

        let with_nan = Interval::point(1.0) + Interval::nan_only();
        assert!(with_nan.has_nan());
        assert!(with_nan.is_empty());

        let undefined = Interval::point(f64::INFINITY) + Interval::point(f64::NEG_INFINITY);
        assert!(undefined.has_nan());
    }

    #[test]
    fn test_apply_monotone2_corners() {
        let ret = apply_monotone2(&Interval::new(-1.0, 2.0), &Interval::new(3.0, 4.0), |x, y| Interval::point(x * y));
        assert_eq!(ret, Interval::new(-4.0, 8.0));

        let nan = apply_monotone2(&Interval::nan_only(), &Interval::point(1.0), |x, y| Interval::point(x + y));
        assert!(nan.has_nan());
        assert!(nan.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::new(1.0, 2.0).to_string(), "[1, 2]");
        assert_eq!(Interval::empty().to_string(), "{}");
        assert_eq!(Interval::nan_only().to_string(), "{ NaN }");
    }

    proptest! {
        #[test]
        fn test_union_commutative(a in bounds(), b in bounds()) {
            prop_assert_eq!(a | b, b | a);
        }

        #[test]
        fn test_union_associative(a in bounds(), b in bounds(), c in bounds()) {
            prop_assert_eq!((a | b) | c, a | (b | c));
        }

        #[test]
        fn test_negation_involution(a in bounds()) {
            prop_assert_eq!(-(-a), a);
        }

        #[test]
        fn test_contains_monotone_under_union(a in bounds(), b in bounds(), v in -2.0e6f64..2.0e6) {
            let wider = a | b;
            prop_assert!(wider.contains_interval(&a));
            if a.contains(v) {
                prop_assert!(wider.contains(v));
            }
        }
    }
}
