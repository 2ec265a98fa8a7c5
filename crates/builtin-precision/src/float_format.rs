//! Floating-point format descriptions
//!
//! A [`FloatFormat`] describes a target precision (exponent range, fraction bits and the
//! availability of subnormals, infinities and NaN) and knows how to round real numbers
//! to that format conservatively, producing [`Interval`]s.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::interval::Interval;

/// Three-valued capability flag for optional format features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNoMaybe {
    No,
    Maybe,
    Yes,
}

impl YesNoMaybe {
    /// Picks the interval matching the flag; `Maybe` yields the hull of both choices
    fn choose(self, no: Interval, yes: Interval) -> Interval {
        match self {
            YesNoMaybe::No => no,
            YesNoMaybe::Yes => yes,
            YesNoMaybe::Maybe => no | yes,
        }
    }
}

/// GLSL precision qualifier of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Lowp,
    Mediump,
    Highp,
}

impl Precision {
    pub const ALL: [Precision; 3] = [Precision::Lowp, Precision::Mediump, Precision::Highp];

    pub fn name(&self) -> &'static str {
        match self {
            Precision::Lowp => "lowp",
            Precision::Mediump => "mediump",
            Precision::Highp => "highp",
        }
    }

    /// The minimum format a conforming implementation must provide for this precision
    pub fn float_format(&self) -> FloatFormat {
        match self {
            Precision::Lowp => FloatFormat::lowp(),
            Precision::Mediump => FloatFormat::mediump(),
            Precision::Highp => FloatFormat::highp(),
        }
    }

    /// Number of random bits used when sampling integers of this precision
    pub fn int_bits(&self) -> u32 {
        match self {
            Precision::Lowp => 8,
            Precision::Mediump => 16,
            Precision::Highp => 32,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of a binary floating-point format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FloatFormat {
    /// Smallest exponent of a normal number
    pub min_exp: i32,
    /// Largest exponent of a finite number
    pub max_exp: i32,
    /// Number of stored fraction bits
    pub fraction_bits: i32,
    /// Whether results are rounded to the format (inexact formats also accept the exact value)
    pub exact_precision: bool,
    pub has_subnormal: YesNoMaybe,
    pub has_inf: YesNoMaybe,
    pub has_nan: YesNoMaybe,
}

/// Splits `x` into a mantissa in `[0.5, 1)` and a binary exponent
///
/// Zero, infinities and NaN are returned unchanged with exponent 0.
pub fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }

    let bits = x.to_bits();
    let exp_field = ((bits >> 52) & 0x7ff) as i32;
    if exp_field == 0 {
        // subnormal: normalize first
        let (m, e) = frexp(x * 2f64.powi(64));
        return (m, e - 64);
    }

    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, exp_field - 1022)
}

/// Computes `x * 2^exp` without intermediate overflow for large exponents
pub fn ldexp(x: f64, exp: i32) -> f64 {
    let mut x = x;
    let mut exp = exp;
    // powi stays exact inside the normal range of f64
    while exp > 1000 {
        x *= 2f64.powi(1000);
        exp -= 1000;
    }
    while exp < -1000 {
        x *= 2f64.powi(-1000);
        exp += 1000;
    }
    x * 2f64.powi(exp)
}

/// Smallest `f64` greater than `x`; NaN and +inf map to themselves
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    f64::from_bits(if x > 0.0 { bits + 1 } else { bits - 1 })
}

/// Largest `f64` less than `x`; NaN and -inf map to themselves
pub fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// Returns the fraction in `[1, 2)` and the exponent of `x`
///
/// Infinities and NaN map to themselves with exponent 0, zero to `(0, -1)`.
fn fract_exp(x: f64) -> (f64, i32) {
    if x.is_infinite() || x.is_nan() {
        return (x, 0);
    }
    if x == 0.0 {
        return (0.0, -1);
    }
    let (m, e) = frexp(x);
    (2.0 * m, e - 1)
}

impl FloatFormat {
    pub const fn new(
        min_exp: i32,
        max_exp: i32,
        fraction_bits: i32,
        exact_precision: bool,
        has_subnormal: YesNoMaybe,
        has_inf: YesNoMaybe,
        has_nan: YesNoMaybe,
    ) -> Self {
        Self {
            min_exp,
            max_exp,
            fraction_bits,
            exact_precision,
            has_subnormal,
            has_inf,
            has_nan,
        }
    }

    /// Minimum requirements for `highp`: IEEE binary32 with optional subnormals and NaN
    pub const fn highp() -> Self {
        Self::new(-126, 127, 23, true, YesNoMaybe::Maybe, YesNoMaybe::Yes, YesNoMaybe::Maybe)
    }

    /// Minimum requirements for `mediump`
    pub const fn mediump() -> Self {
        Self::new(-13, 13, 9, false, YesNoMaybe::Maybe, YesNoMaybe::Maybe, YesNoMaybe::Maybe)
    }

    /// Minimum requirements for `lowp`: a fixed-point range with 7 fraction bits
    pub const fn lowp() -> Self {
        Self::new(0, 0, 7, false, YesNoMaybe::Yes, YesNoMaybe::Maybe, YesNoMaybe::Maybe)
    }

    /// The host `f32` format, with everything present
    pub const fn native_float() -> Self {
        Self::new(-126, 127, 23, true, YesNoMaybe::Yes, YesNoMaybe::Yes, YesNoMaybe::Yes)
    }

    /// The host `f64` format, used as the exact reference
    pub const fn native_double() -> Self {
        Self::new(-1022, 1023, 52, true, YesNoMaybe::Yes, YesNoMaybe::Yes, YesNoMaybe::Yes)
    }

    /// Largest finite magnitude of the format
    pub fn max_value(&self) -> f64 {
        ldexp(1.0, self.max_exp) + ldexp(((1u64 << self.fraction_bits) - 1) as f64, self.max_exp - self.fraction_bits)
    }

    /// Smallest positive value: the minimum subnormal if subnormals may exist, else the minimum normal
    pub fn min_value(&self) -> f64 {
        if self.has_subnormal == YesNoMaybe::No {
            ldexp(1.0, self.min_exp)
        } else {
            ldexp(1.0, self.min_exp - self.fraction_bits)
        }
    }

    /// Number of fraction bits available at exponent `exp`
    ///
    /// Below `min_exp` the format loses one bit of precision per exponent step.
    fn exponent_shift(&self, exp: i32) -> i32 {
        self.fraction_bits - (self.min_exp - exp).max(0)
    }

    /// Rounds `d` to the nearest representable value towards +inf (`upward`) or -inf
    ///
    /// The exponent range is not enforced here; see [`FloatFormat::clamp_value`].
    pub fn round(&self, d: f64, upward: bool) -> f64 {
        let (frac, exp) = fract_exp(d);
        if !frac.is_finite() || frac == 0.0 {
            return d;
        }
        let shift = self.exponent_shift(exp);
        let shifted = ldexp(frac, shift);
        let rounded = if upward { shifted.ceil() } else { shifted.floor() };
        ldexp(rounded, exp - shift)
    }

    /// Like [`FloatFormat::round`], but with `round_up_overflow` set a value beyond the
    /// finite range that is rounded towards zero becomes `±max_value`
    ///
    /// Rounding away from zero is unaffected and may still leave the finite range.
    pub fn round_out(&self, d: f64, upward: bool, round_up_overflow: bool) -> f64 {
        let (_, exp) = fract_exp(d);
        if round_up_overflow && exp > self.max_exp && (upward == (d < 0.0)) {
            d.signum() * self.max_value()
        } else {
            self.round(d, upward)
        }
    }

    /// Rounds an interval outward, optionally letting finite overflow clamp to the largest finite value
    pub fn round_out_interval(&self, x: &Interval, round_up_overflow: bool) -> Interval {
        let mut ret = x.nan();
        if !x.is_empty() {
            ret = ret | Interval::new(self.round_out(x.lo(), false, round_up_overflow), self.round_out(x.hi(), true, round_up_overflow));
        }
        ret
    }

    /// Maps `d` to the set of values the format may store for it, accounting for flush
    /// to zero and overflow
    fn clamp_value(&self, d: f64) -> Interval {
        let (_, exp) = fract_exp(d);
        let sign = if d < 0.0 { -1.0 } else { 1.0 };

        if exp < self.min_exp {
            self.has_subnormal.choose(Interval::point(sign * 0.0), Interval::point(d))
        } else if d.is_infinite() || exp > self.max_exp {
            self.has_inf.choose(Interval::point(sign * self.max_value()), Interval::point(sign * f64::INFINITY))
        } else {
            Interval::point(d)
        }
    }

    /// Converts an exact interval into the interval of values the format may hold for it
    ///
    /// Bounds are rounded outward. Inexact formats additionally keep the exact input.
    pub fn convert(&self, x: &Interval) -> Interval {
        let mut ret = Interval::empty();
        let mut tmp = *x;

        if x.has_nan() {
            // a NaN must be representable either as itself or as an arbitrary value
            if self.has_nan != YesNoMaybe::No {
                ret = ret | Interval::nan_only();
            }
            if self.has_nan != YesNoMaybe::Yes {
                tmp = Interval::unbounded(false);
            }
        }

        if !tmp.is_empty() {
            ret = ret | self.clamp_value(self.round(tmp.lo(), false));
            ret = ret | self.clamp_value(self.round(tmp.hi(), true));
        }

        if !self.exact_precision {
            ret = ret | *x;
        }

        ret
    }

    /// Distance to a neighbouring representable value, times `count`
    pub fn ulp(&self, x: f64, count: f64) -> f64 {
        let (frac, exp) = fract_exp(x.abs());

        if x.is_infinite() || frac.is_infinite() {
            return ldexp(1.0, self.max_exp - self.fraction_bits) * count;
        }
        if x.is_nan() {
            return f64::NAN;
        }

        // the ulp of a power of two is measured on the side towards zero
        let exp = if frac == 1.0 { exp - 1 } else { exp };
        let exp = if x == 0.0 { self.min_exp } else { exp };
        let exp = exp.max(self.min_exp);

        ldexp(1.0, exp - self.fraction_bits) * count
    }

    /// Renders a value in hexadecimal floating-point notation, e.g. `0x1.8p1`
    pub fn float_to_hex(&self, x: f64) -> String {
        if x.is_nan() {
            return "NaN".to_string();
        }
        if x.is_infinite() {
            return if x < 0.0 { "-inf".to_string() } else { "+inf".to_string() };
        }
        if x == 0.0 {
            return if x.is_sign_negative() { "-0.0".to_string() } else { "0.0".to_string() };
        }

        let (frac, exp) = fract_exp(x.abs());
        let shift = self.exponent_shift(exp);
        let bits = ldexp(frac, shift) as u64;
        let whole = bits >> self.fraction_bits.max(0);
        let fraction = bits & ((1u64 << self.fraction_bits.max(0)) - 1);
        let digits = ((self.fraction_bits + 3) / 4) as usize;
        let exp_out = if whole == 0 { self.min_exp } else { exp };
        let sign = if x < 0.0 { "-" } else { "" };

        // left-align the fraction to a whole number of hex digits
        let aligned = fraction << (digits as i32 * 4 - self.fraction_bits);
        format!("{sign}0x{whole}.{aligned:0digits$x}p{exp_out}")
    }

    /// Renders an interval with hexadecimal bounds
    pub fn interval_to_hex(&self, interval: &Interval) -> String {
        if interval.is_empty() {
            return if interval.has_nan() { "{ NaN }".to_string() } else { "{}".to_string() };
        }
        if interval.lo() == f64::NEG_INFINITY && interval.hi() == f64::INFINITY && interval.has_nan() {
            return "<any>".to_string();
        }

        let bounds = if interval.lo() == interval.hi() {
            self.float_to_hex(interval.lo())
        } else {
            format!("[{}, {}]", self.float_to_hex(interval.lo()), self.float_to_hex(interval.hi()))
        };
        if interval.has_nan() { format!("{{ NaN }} | {bounds}") } else { bounds }
    }
}

impl Default for FloatFormat {
    fn default() -> Self {
        Self::native_double()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_frexp_ldexp() {
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(-3.0), (-0.75, 2));
        assert_eq!(frexp(0.0), (0.0, 0));
        let tiny = f64::from_bits(1);
        let (m, e) = frexp(tiny);
        assert_eq!(m, 0.5);
        assert_eq!(e, -1073);
        assert_eq!(ldexp(0.5, -1073), tiny);
        assert_eq!(ldexp(1.0, 2000), f64::INFINITY);
        assert_eq!(ldexp(3.0, 4), 48.0);
    }

    #[test]
    fn test_next_up_and_down() {
        assert_eq!(next_up(1.0), 1.0 + f64::EPSILON);
        assert_eq!(next_down(1.0), 1.0 - f64::EPSILON / 2.0);
        assert_eq!(next_up(-1.0), -(1.0 - f64::EPSILON / 2.0));
        assert_eq!(next_up(0.0), f64::from_bits(1));
        assert_eq!(next_down(0.0), -f64::from_bits(1));
        assert_eq!(next_up(f64::MAX), f64::INFINITY);
        assert_eq!(next_down(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(next_up(f64::NEG_INFINITY), -f64::MAX);
        assert!(next_up(f64::NAN).is_nan());
    }

    #[test]
    fn test_max_and_min_value() {
        assert_eq!(FloatFormat::highp().max_value(), f32::MAX as f64);
        assert_eq!(FloatFormat::native_float().min_value(), f64::from(f32::from_bits(1)));
        assert_eq!(FloatFormat::mediump().max_value(), 16368.0);
        assert_eq!(FloatFormat::lowp().max_value(), 1.9921875);
    }

    #[test]
    fn test_round_directions() {
        let format = FloatFormat::mediump();
        let third = 1.0 / 3.0;
        let down = format.round(third, false);
        let up = format.round(third, true);
        assert!(down < third && third < up);
        assert_eq!(up - down, format.ulp(third, 1.0));
        assert_eq!(format.round(1.5, true), 1.5);
        assert_eq!(format.round(1.5, false), 1.5);
    }

    #[test]
    fn test_round_out_overflow() {
        let format = FloatFormat::highp();
        let huge = 1.0e40;
        assert_eq!(format.round_out(huge, false, true), format.max_value());
        assert_eq!(format.round_out(huge, true, true), format.round(huge, true));
        assert_eq!(format.round_out(-huge, true, true), -format.max_value());
    }

    #[test]
    fn test_convert_exact_value() {
        let format = FloatFormat::highp();
        assert_eq!(format.convert(&Interval::point(5.0)), Interval::point(5.0));
    }

    #[test]
    fn test_convert_overflow_and_underflow() {
        let highp = FloatFormat::highp();
        let overflow = highp.convert(&Interval::point(1.0e39));
        assert!(overflow.contains(f64::INFINITY));
        assert!(!overflow.contains(highp.max_value()));

        let tiny = highp.convert(&Interval::point(1.0e-40));
        assert!(tiny.contains(0.0));
        assert!(tiny.contains(1.0e-40));

        let mediump = FloatFormat::mediump();
        let big = mediump.convert(&Interval::point(1.0e6));
        assert!(big.contains(f64::INFINITY));
        assert!(big.contains(mediump.max_value()));
        assert!(big.contains(1.0e6));
    }

    #[test]
    fn test_convert_nan() {
        let maybe = FloatFormat::highp().convert(&Interval::nan_only());
        assert!(maybe.has_nan());
        assert!(maybe.contains(0.0));
        assert!(maybe.contains(f64::INFINITY));

        let yes = FloatFormat::native_float().convert(&Interval::nan_only());
        assert!(yes.has_nan());
        assert!(yes.is_empty());
    }

    #[test]
    fn test_ulp() {
        let highp = FloatFormat::highp();
        // powers of two measure towards zero
        assert_eq!(highp.ulp(1.0, 1.0), ldexp(1.0, -24));
        assert_eq!(highp.ulp(1.5, 1.0), ldexp(1.0, -23));
        assert_eq!(highp.ulp(2.0, 1.0), ldexp(1.0, -23));
        assert_eq!(highp.ulp(0.0, 1.0), ldexp(1.0, -149));
        assert_eq!(highp.ulp(f64::INFINITY, 2.0), ldexp(1.0, 105));
        assert_eq!(FloatFormat::mediump().ulp(1.0, 2.0), ldexp(1.0, -9));
        assert!(highp.ulp(f64::NAN, 1.0).is_nan());
    }

    #[test]
    fn test_float_to_hex() {
        let highp = FloatFormat::highp();
        assert_eq!(highp.float_to_hex(1.0), "0x1.000000p0");
        assert_eq!(highp.float_to_hex(3.0), "0x1.800000p1");
        assert_eq!(highp.float_to_hex(-0.5), "-0x1.000000p-1");
        assert_eq!(highp.float_to_hex(f64::NAN), "NaN");
        assert_eq!(highp.float_to_hex(f64::NEG_INFINITY), "-inf");
        assert_eq!(highp.float_to_hex(0.0), "0.0");
        assert_eq!(highp.interval_to_hex(&Interval::unbounded(true)), "<any>");
        assert_eq!(highp.interval_to_hex(&Interval::new(1.0, 3.0)), "[0x1.000000p0, 0x1.800000p1]");
    }

    #[test]
    fn test_matches_half_rounding() {
        // mediump of an IEEE half, minus the inexact union, rounds the same way
        let half_format = FloatFormat::new(-14, 15, 10, true, YesNoMaybe::Yes, YesNoMaybe::Yes, YesNoMaybe::Yes);
        for value in [0.1, 1.0 / 3.0, 1234.567, -7.77, 0.000_061_035_156_25] {
            let nearest = half::f16::from_f64(value).to_f64();
            let bounds = half_format.convert(&Interval::point(value));
            assert!(bounds.contains(nearest), "{value}: {nearest} not in {bounds}");
            assert!(bounds.width() <= half_format.ulp(value, 1.0));
        }
    }

    proptest! {
        #[test]
        fn test_convert_contains_f32_rounding(value in -1.0e30f64..1.0e30) {
            let bounds = FloatFormat::highp().convert(&Interval::point(value));
            prop_assert!(bounds.contains(value as f32 as f64));
        }

        #[test]
        fn test_convert_idempotent(value in -1.0e30f64..1.0e30) {
            let format = FloatFormat::highp();
            let once = format.convert(&Interval::point(value));
            let twice = format.convert(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
