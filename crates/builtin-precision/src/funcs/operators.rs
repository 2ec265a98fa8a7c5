//! Arithmetic operators
//!
//! `+ - *` are correctly rounded: any representable value adjacent to the exact result
//! is accepted, but exactly representable results must be preserved. Ordinary intervals
//! take closed-form fast paths; anything involving infinities or NaN goes through the
//! general corner evaluation.

use std::fmt;

use crate::expr::{EvalContext, Expr};
use crate::float_format::{ldexp, next_down, next_up};
use crate::funcs::primitive::{FloatFunc1, FloatFunc2, widen};
use crate::funcs::write_infix;
use crate::interval::Interval;

/// Exact sum bracketed by adjacent `f64` values
///
/// The rounding error of `x + y` is recovered with TwoSum; when it is nonzero the
/// interval spans the rounded sum and its neighbour on the side of the exact value.
fn sum_bounds(x: f64, y: f64) -> Interval {
    let sum = x + y;
    if !sum.is_finite() {
        return Interval::point(sum);
    }
    let y_part = sum - x;
    let error = (x - (sum - y_part)) + (y - y_part);
    bracket(sum, error)
}

/// Exact product bracketed by adjacent `f64` values
///
/// The rounding error is recovered with a fused multiply-add, which is only exact while
/// the product stays well above the subnormal range.
fn product_bounds(x: f64, y: f64) -> Interval {
    let product = x * y;
    if !product.is_finite() {
        return Interval::point(product);
    }
    if x != 0.0 && y != 0.0 && product.abs() < ldexp(1.0, -969) {
        return Interval::new(next_down(product), next_up(product));
    }
    bracket(product, x.mul_add(y, -product))
}

fn bracket(rounded: f64, error: f64) -> Interval {
    if error > 0.0 {
        Interval::new(rounded, next_up(rounded))
    } else if error < 0.0 {
        Interval::new(next_down(rounded), rounded)
    } else {
        Interval::point(rounded)
    }
}

/// Rounding shared by the infix operators
///
/// When both operands are finite an overflowing result may also round down to the
/// largest finite value.
fn round_infix(ctx: &EvalContext, exact: Interval, x: f64, y: f64) -> Interval {
    ctx.format.round_out_interval(&exact, !x.is_infinite() && !y.is_infinite())
}

/// Finishes a fast-path result from the brackets of its lower and upper bounds
fn finish_ordinary(ctx: &EvalContext, lo: Interval, hi: Interval) -> Interval {
    ctx.format.convert(&ctx.format.round_out_interval(&Interval::new(lo.lo(), hi.hi()), true))
}

pub struct Add;

impl FloatFunc2 for Add {
    fn name(&self) -> &str {
        "add"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x + y
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64) -> Interval {
        round_infix(ctx, sum_bounds(x, y), x, y)
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        if x.is_ordinary() && y.is_ordinary() {
            return finish_ordinary(ctx, sum_bounds(x.lo(), y.lo()), sum_bounds(x.hi(), y.hi()));
        }
        self.apply_monotone(ctx, x, y)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "+", args)
    }
}

pub struct Sub;

impl FloatFunc2 for Sub {
    fn name(&self) -> &str {
        "sub"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x - y
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64) -> Interval {
        round_infix(ctx, sum_bounds(x, -y), x, y)
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        if x.is_ordinary() && y.is_ordinary() {
            return finish_ordinary(ctx, sum_bounds(x.lo(), -y.hi()), sum_bounds(x.hi(), -y.lo()));
        }
        self.apply_monotone(ctx, x, y)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "-", args)
    }
}

pub struct Mul;

impl FloatFunc2 for Mul {
    fn name(&self) -> &str {
        "mul"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x * y
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64) -> Interval {
        round_infix(ctx, product_bounds(x, y), x, y)
    }

    /// `inf * 0` is undefined
    fn inner_extrema(&self, _ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        let x_inf = x.contains(f64::NEG_INFINITY) || x.contains(f64::INFINITY);
        let y_inf = y.contains(f64::NEG_INFINITY) || y.contains(f64::INFINITY);
        if (x_inf && y.contains(0.0)) || (y_inf && x.contains(0.0)) { Interval::nan_only() } else { Interval::empty() }
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        if x.is_ordinary() && y.is_ordinary() {
            // flip both signs so that `a` is not entirely negative; the product is unchanged
            let (a, b) = if x.hi() < 0.0 { (-*x, -*y) } else { (*x, *y) };

            if a.lo() >= 0.0 && b.lo() >= 0.0 {
                return finish_ordinary(ctx, product_bounds(a.lo(), b.lo()), product_bounds(a.hi(), b.hi()));
            }
            if a.lo() >= 0.0 && b.hi() <= 0.0 {
                return finish_ordinary(ctx, product_bounds(a.hi(), b.lo()), product_bounds(a.lo(), b.hi()));
            }
        }
        self.apply_monotone(ctx, x, y)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "*", args)
    }
}

pub struct Div;

impl FloatFunc2 for Div {
    fn name(&self) -> &str {
        "div"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x / y
    }

    /// 2.5 ULP while the denominator is inside `[2^min_exp, 2^(max_exp - 1))`
    ///
    /// A zero denominator must produce exactly infinity; any other denominator may produce
    /// any number, but not NaN.
    fn precision(&self, ctx: &EvalContext, ret: f64, _x: f64, y: f64) -> f64 {
        let format = ctx.format;
        let lower = crate::float_format::ldexp(1.0, format.min_exp);
        let upper = crate::float_format::ldexp(1.0, format.max_exp - 1);

        if y == 0.0 {
            0.0
        } else if lower <= y.abs() && y.abs() < upper {
            format.ulp(ret, 2.5)
        } else {
            f64::INFINITY
        }
    }

    fn inner_extrema(&self, _ctx: &EvalContext, nom: &Interval, den: &Interval) -> Interval {
        let mut ret = Interval::empty();
        if den.contains(0.0) {
            if nom.contains(0.0) {
                ret = ret | Interval::nan_only();
            }
            if nom.lo() < 0.0 || nom.hi() > 0.0 {
                ret = ret | Interval::unbounded(false);
            }
        }
        ret
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64) -> Interval {
        let exact = self.apply_exact(x, y);
        let precision = self.precision(ctx, exact, x, y);
        let mut ret = widen(exact, precision);

        // a finite quotient that overflows may also saturate
        if !x.is_infinite() && !y.is_infinite() && y != 0.0 {
            let converted = ctx.format.convert(&ret);
            if converted.contains(f64::NEG_INFINITY) {
                ret = ret | Interval::point(-ctx.format.max_value());
            }
            if converted.contains(f64::INFINITY) {
                ret = ret | Interval::point(ctx.format.max_value());
            }
        }
        ret
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "/", args)
    }
}

pub struct Negate;

impl FloatFunc1 for Negate {
    fn name(&self) -> &str {
        "_negate"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        -x
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64) -> f64 {
        0.0
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write!(f, "(-{})", args[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Environment;
    use crate::float_format::{FloatFormat, Precision};
    use proptest::prelude::*;

    fn context(format: &FloatFormat, precision: Precision) -> EvalContext<'_> {
        EvalContext::new(format, precision, Environment::new(0))
    }

    #[test]
    fn test_add_exact_points() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        assert_eq!(Add.apply_exact(2.0, 3.0), 5.0);
        let ret = Add.apply_interval(&ctx, &Interval::point(2.0), &Interval::point(3.0));
        assert_eq!(ret, Interval::point(5.0));
    }

    #[test]
    fn test_add_rounds_outward() {
        let format = FloatFormat::mediump();
        let ctx = context(&format, Precision::Mediump);
        let ret = Add.apply_interval(&ctx, &Interval::point(2.0), &Interval::point(0.001));
        assert!(ret.contains(2.001));
        assert!(ret.lo() <= 2.0 && ret.hi() > 2.001);
    }

    #[test]
    fn test_add_infinities_are_nan() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let ret = Add.apply_interval(&ctx, &Interval::point(f64::INFINITY), &Interval::point(f64::NEG_INFINITY));
        assert!(ret.has_nan());
    }

    #[test]
    fn test_sub_fast_path() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let ret = Sub.apply_interval(&ctx, &Interval::new(1.0, 2.0), &Interval::new(0.5, 1.0));
        assert_eq!(ret, Interval::new(0.0, 1.5));
    }

    #[test]
    fn test_mul_sign_cases() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        assert_eq!(Mul.apply_interval(&ctx, &Interval::new(-3.0, -2.0), &Interval::new(4.0, 5.0)), Interval::new(-15.0, -8.0));
        assert_eq!(Mul.apply_interval(&ctx, &Interval::new(2.0, 3.0), &Interval::new(-5.0, -4.0)), Interval::new(-15.0, -8.0));
        assert_eq!(Mul.apply_interval(&ctx, &Interval::new(-3.0, -2.0), &Interval::new(-5.0, -4.0)), Interval::new(8.0, 15.0));
        assert_eq!(Mul.apply_interval(&ctx, &Interval::new(-1.0, 2.0), &Interval::new(3.0, 4.0)), Interval::new(-4.0, 8.0));
    }

    #[test]
    fn test_mul_infinity_times_zero_is_nan() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let x = Interval::new(f64::NEG_INFINITY, 5.0);
        let y = Interval::point(0.0);
        assert!(Mul.inner_extrema(&ctx, &x, &y).has_nan());
        assert!(Mul.apply_interval(&ctx, &x, &y).has_nan());
    }

    #[test]
    fn test_div_by_zero() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let ret = Div.apply_interval(&ctx, &Interval::point(1.0), &Interval::point(0.0));
        assert!(ret.contains(f64::INFINITY));
        assert!(!ret.has_nan());

        let zero_by_zero = Div.apply_interval(&ctx, &Interval::point(0.0), &Interval::point(0.0));
        assert!(zero_by_zero.has_nan());

        let spanning = Div.apply_interval(&ctx, &Interval::point(1.0), &Interval::new(-1.0, 1.0));
        assert!(spanning.contains(-1.0e30) && spanning.contains(1.0e30));
    }

    #[test]
    fn test_div_precision() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let ret = Div.apply_interval(&ctx, &Interval::point(1.0), &Interval::point(3.0));
        assert!(ret.contains(1.0 / 3.0));
        assert!(ret.width() <= 2.0 * format.ulp(1.0 / 3.0, 2.5) + 2.0 * format.ulp(1.0 / 3.0, 1.0));

        // a tiny denominator leaves the result unconstrained but finite
        let tiny = Div.apply_interval(&ctx, &Interval::point(1.0), &Interval::point(1.0e-39));
        assert!(tiny.contains(-1.0));
        assert!(!tiny.has_nan());
    }

    #[test]
    fn test_negate() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        assert_eq!(Negate.apply_interval(&ctx, &Interval::new(1.0, 2.0)), Interval::new(-2.0, -1.0));
    }

    #[test]
    fn test_sum_and_product_bounds_bracket_exact_value() {
        assert_eq!(sum_bounds(2.0, 3.0), Interval::point(5.0));
        assert_eq!(sum_bounds(1.0, 1.0e-30), Interval::new(1.0, next_up(1.0)));
        assert_eq!(sum_bounds(1.0, -1.0e-30), Interval::new(next_down(1.0), 1.0));

        let x = 1.0 + ldexp(1.0, -52);
        let square = 1.0 + ldexp(1.0, -51);
        assert_eq!(product_bounds(x, x), Interval::new(square, next_up(square)));
        assert_eq!(product_bounds(3.0, 0.5), Interval::point(1.5));

        let tiny = product_bounds(ldexp(1.0, -500), ldexp(1.0, -500));
        assert!(tiny.contains(ldexp(1.0, -1000)) && tiny.width() > 0.0);
    }

    #[test]
    fn test_add_keeps_both_neighbours_of_absorbed_term() {
        let format = FloatFormat::highp();
        let ctx = context(&format, Precision::Highp);
        let big = 1.0e30f32;
        let small = Interval::point(f64::from(1.0e-30f32));

        let sum = Add.apply_interval(&ctx, &Interval::point(f64::from(big)), &small);
        assert!(sum.contains(f64::from(big)));
        assert!(sum.contains(f64::from(f32::from_bits(big.to_bits() + 1))));

        let difference = Sub.apply_interval(&ctx, &Interval::point(f64::from(big)), &small);
        assert!(difference.contains(f64::from(big)));
        assert!(difference.contains(f64::from(f32::from_bits(big.to_bits() - 1))));
    }

    proptest! {
        #[test]
        fn test_mul_sound_for_f32(a in -1.0e3f32..1.0e3, b in -1.0e3f32..1.0e3, c in -1.0e3f32..1.0e3, d in -1.0e3f32..1.0e3, s in 0.0f64..1.0, t in 0.0f64..1.0) {
            let format = FloatFormat::highp();
            let ctx = context(&format, Precision::Highp);
            let x = Interval::new(f64::from(a), f64::from(b));
            let y = Interval::new(f64::from(c), f64::from(d));
            let xp = (x.lo() + s * x.width()) as f32;
            let yp = (y.lo() + t * y.width()) as f32;
            prop_assume!(x.contains(f64::from(xp)) && y.contains(f64::from(yp)));
            let bound = Mul.apply_interval(&ctx, &x, &y);
            prop_assert!(bound.contains(f64::from(xp * yp)));
        }

        #[test]
        fn test_add_sound_for_f32(a in -1.0e6f32..1.0e6, b in -1.0e6f32..1.0e6) {
            let format = FloatFormat::highp();
            let ctx = context(&format, Precision::Highp);
            let bound = Add.apply_interval(&ctx, &Interval::point(f64::from(a)), &Interval::point(f64::from(b)));
            prop_assert!(bound.contains(f64::from(a + b)));
        }

        #[test]
        fn test_div_sound_for_f32(a in -1.0e3f32..1.0e3, b in prop_oneof![-1.0e-3f32..1.0e-3, -1.0e3f32..1.0e3]) {
            prop_assume!(b != 0.0);
            let format = FloatFormat::highp();
            let ctx = context(&format, Precision::Highp);
            let bound = Div.apply_interval(&ctx, &Interval::point(f64::from(a)), &Interval::point(f64::from(b)));
            prop_assert!(bound.contains(f64::from(a / b)));
        }

        #[test]
        fn test_div_across_pole_for_f32(a in 0.5f32..1.0e3, lo in -1.0e-2f32..0.0, hi in 0.0f32..1.0e-2, t in 0.0f64..1.0) {
            let format = FloatFormat::highp();
            let ctx = context(&format, Precision::Highp);
            let den = Interval::new(f64::from(lo), f64::from(hi));
            let b = (den.lo() + t * den.width()) as f32;
            prop_assume!(b != 0.0 && den.contains(f64::from(b)));
            let bound = Div.apply_interval(&ctx, &Interval::point(f64::from(a)), &den);
            prop_assert!(bound.contains(f64::from(a / b)));
        }
    }
}
