//! Exact common functions: abs, sign, rounding, min/max, clamp and step
//!
//! All of these are monotone (or piecewise monotone with a declared extremum) and
//! have no error beyond format conversion.

use crate::expr::EvalContext;
use crate::funcs::primitive::{FloatFunc1, FloatFunc2, FloatFunc3};
use crate::interval::Interval;

/// Declares an exact, monotone one-argument function
macro_rules! exact_func1 {
    ($ty:ident, $name:literal, |$x:ident| $body:expr) => {
        pub struct $ty;

        impl FloatFunc1 for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn apply_exact(&self, $x: f64) -> f64 {
                $body
            }

            fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64) -> f64 {
                0.0
            }
        }
    };
}

exact_func1!(Floor, "floor", |x| x.floor());
exact_func1!(Ceil, "ceil", |x| x.ceil());
exact_func1!(Trunc, "trunc", |x| x.trunc());
exact_func1!(RoundEven, "roundEven", |x| x.round_ties_even());

pub struct Abs;

impl FloatFunc1 for Abs {
    fn name(&self) -> &str {
        "abs"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.abs()
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64) -> f64 {
        0.0
    }

    fn inner_extrema(&self, _ctx: &EvalContext, x: &Interval) -> Interval {
        if x.contains(0.0) { Interval::point(0.0) } else { Interval::empty() }
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, f64::INFINITY)
    }
}

pub struct Sign;

impl FloatFunc1 for Sign {
    fn name(&self) -> &str {
        "sign"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            x
        }
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64) -> f64 {
        0.0
    }

    fn codomain(&self) -> Interval {
        Interval::new(-1.0, 1.0)
    }
}

/// `round`: halfway cases may go either way
pub struct Round;

impl FloatFunc1 for Round {
    fn name(&self) -> &str {
        "round"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.round()
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64) -> f64 {
        0.0
    }

    fn apply_point(&self, _ctx: &EvalContext, x: f64) -> Interval {
        let floor = x.floor();
        if x - floor == 0.5 { Interval::new(floor, floor + 1.0) } else { Interval::point(x.round()) }
    }
}

pub struct Min;

impl FloatFunc2 for Min {
    fn name(&self) -> &str {
        "min"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x.min(y)
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }
}

pub struct Max;

impl FloatFunc2 for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn apply_exact(&self, x: f64, y: f64) -> f64 {
        x.max(y)
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, _y: f64) -> f64 {
        0.0
    }
}

/// `step(edge, x)`
pub struct Step;

impl FloatFunc2 for Step {
    fn name(&self) -> &str {
        "step"
    }

    fn apply_exact(&self, edge: f64, x: f64) -> f64 {
        if x < edge { 0.0 } else { 1.0 }
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _edge: f64, _x: f64) -> f64 {
        0.0
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, 1.0)
    }
}

/// `clamp(x, minVal, maxVal)`, undefined when `minVal > maxVal`
pub struct Clamp;

impl FloatFunc3 for Clamp {
    fn name(&self) -> &str {
        "clamp"
    }

    fn apply_exact(&self, x: f64, min_val: f64, max_val: f64) -> f64 {
        x.max(min_val).min(max_val)
    }

    fn precision(&self, _ctx: &EvalContext, _ret: f64, _x: f64, min_val: f64, max_val: f64) -> f64 {
        if min_val > max_val { f64::NAN } else { 0.0 }
    }
}
