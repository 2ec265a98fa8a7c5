//! Primitive float functions and their bounding algorithm
//!
//! A primitive evaluates its exact value at the corners of the argument intervals,
//! widens each point by the allowed error, joins any interior extrema, restricts the
//! result to the codomain and finally converts it to the target format.

use std::fmt;

use crate::expr::{EvalContext, Expr};
use crate::float_format::{next_down, next_up};
use crate::funcs::{Func, Signature, write_call};
use crate::interval::{Interval, apply_monotone1, apply_monotone2, apply_monotone3};
use crate::value::IVal;

/// Exact value widened by a symmetric error bound
///
/// A nonzero finite bound also steps one `f64` outward on each side, covering the
/// rounding of the host evaluation of `exact` and of the bounds themselves.
pub(crate) fn widen(exact: f64, precision: f64) -> Interval {
    if exact.is_finite() && precision.is_finite() && precision > 0.0 {
        return Interval::new(next_down(exact - precision), next_up(exact + precision));
    }
    Interval::point(exact) + Interval::new(-precision, precision)
}

/// One-argument float function
pub trait FloatFunc1 {
    fn name(&self) -> &str;

    /// The mathematically exact result
    fn apply_exact(&self, x: f64) -> f64;

    /// Allowed absolute error around `ret`; NaN marks an undefined result
    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64;

    /// Image of interior points that the endpoints alone would miss
    fn inner_extrema(&self, _ctx: &EvalContext, _x: &Interval) -> Interval {
        Interval::empty()
    }

    /// Range of defined results; NaN is always admitted on top of it
    fn codomain(&self) -> Interval {
        Interval::unbounded(true)
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64) -> Interval {
        let exact = self.apply_exact(x);
        widen(exact, self.precision(ctx, exact, x))
    }

    fn apply_monotone(&self, ctx: &EvalContext, x: &Interval) -> Interval {
        let ret = apply_monotone1(x, |x| self.apply_point(ctx, x)) | self.inner_extrema(ctx, x);
        ctx.format.convert(&(ret & (self.codomain() | Interval::nan_only())))
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval) -> Interval {
        self.apply_monotone(ctx, x)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_call(f, self.name(), args)
    }
}

/// Two-argument float function
pub trait FloatFunc2 {
    fn name(&self) -> &str;

    fn apply_exact(&self, x: f64, y: f64) -> f64;

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64, y: f64) -> f64;

    fn inner_extrema(&self, _ctx: &EvalContext, _x: &Interval, _y: &Interval) -> Interval {
        Interval::empty()
    }

    fn codomain(&self) -> Interval {
        Interval::unbounded(true)
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64) -> Interval {
        let exact = self.apply_exact(x, y);
        widen(exact, self.precision(ctx, exact, x, y))
    }

    fn apply_monotone(&self, ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        let ret = apply_monotone2(x, y, |x, y| self.apply_point(ctx, x, y)) | self.inner_extrema(ctx, x, y);
        ctx.format.convert(&(ret & (self.codomain() | Interval::nan_only())))
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval, y: &Interval) -> Interval {
        self.apply_monotone(ctx, x, y)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_call(f, self.name(), args)
    }
}

/// Three-argument float function
pub trait FloatFunc3 {
    fn name(&self) -> &str;

    fn apply_exact(&self, x: f64, y: f64, z: f64) -> f64;

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64, y: f64, z: f64) -> f64;

    fn inner_extrema(&self, _ctx: &EvalContext, _x: &Interval, _y: &Interval, _z: &Interval) -> Interval {
        Interval::empty()
    }

    fn codomain(&self) -> Interval {
        Interval::unbounded(true)
    }

    fn apply_point(&self, ctx: &EvalContext, x: f64, y: f64, z: f64) -> Interval {
        let exact = self.apply_exact(x, y, z);
        widen(exact, self.precision(ctx, exact, x, y, z))
    }

    fn apply_monotone(&self, ctx: &EvalContext, x: &Interval, y: &Interval, z: &Interval) -> Interval {
        let ret = apply_monotone3(x, y, z, |x, y, z| self.apply_point(ctx, x, y, z)) | self.inner_extrema(ctx, x, y, z);
        ctx.format.convert(&(ret & (self.codomain() | Interval::nan_only())))
    }

    fn apply_interval(&self, ctx: &EvalContext, x: &Interval, y: &Interval, z: &Interval) -> Interval {
        self.apply_monotone(ctx, x, y, z)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_call(f, self.name(), args)
    }
}

/// Adapts a [`FloatFunc1`] to [`Func`]
pub struct Unary<F> {
    inner: F,
    signature: Signature,
}

impl<F: FloatFunc1> Unary<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            signature: Signature::float(1),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: FloatFunc1> Func for Unary<F> {
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        self.inner.print(f, args)
    }

    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal {
        IVal::Scalar(self.inner.apply_interval(ctx, &args[0].as_scalar()))
    }
}

/// Adapts a [`FloatFunc2`] to [`Func`]
pub struct Binary<F> {
    inner: F,
    signature: Signature,
}

impl<F: FloatFunc2> Binary<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            signature: Signature::float(2),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: FloatFunc2> Func for Binary<F> {
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        self.inner.print(f, args)
    }

    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal {
        IVal::Scalar(self.inner.apply_interval(ctx, &args[0].as_scalar(), &args[1].as_scalar()))
    }
}

/// Adapts a [`FloatFunc3`] to [`Func`]
pub struct Ternary<F> {
    inner: F,
    signature: Signature,
}

impl<F: FloatFunc3> Ternary<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            signature: Signature::float(3),
        }
    }
}

impl<F: FloatFunc3> Func for Ternary<F> {
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        self.inner.print(f, args)
    }

    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal {
        IVal::Scalar(self.inner.apply_interval(ctx, &args[0].as_scalar(), &args[1].as_scalar(), &args[2].as_scalar()))
    }
}
