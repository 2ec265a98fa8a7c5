//! Exponential, logarithmic and trigonometric primitives
//!
//! Error bounds follow the GLSL ES 3.0 precision tables. For highp trigonometry the
//! OpenCL fast relaxed math limits are used instead.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::expr::EvalContext;
use crate::float_format::{Precision, YesNoMaybe, ldexp};
use crate::funcs::primitive::{FloatFunc1, FloatFunc2};
use crate::interval::Interval;

/// Error of `exp` and `exp2`, growing with the magnitude of the argument
fn exp_precision(ctx: &EvalContext, ret: f64, x: f64) -> f64 {
    match ctx.precision {
        Precision::Highp => ctx.format.ulp(ret, 3.0 + 2.0 * x.abs()),
        Precision::Mediump => ctx.format.ulp(ret, 2.0 + 2.0 * x.abs()),
        Precision::Lowp => ctx.format.ulp(ret, 2.0),
    }
}

/// Error of `log` and `log2`: absolute near 1, relative elsewhere
fn log_precision(ctx: &EvalContext, ret: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return f64::NAN;
    }
    let near_one = (0.5..=2.0).contains(&x);
    match ctx.precision {
        Precision::Highp if near_one => ldexp(1.0, -21),
        Precision::Highp => ctx.format.ulp(ret, 3.0),
        Precision::Mediump if near_one => ldexp(1.0, -7),
        Precision::Mediump => ctx.format.ulp(ret, 2.0),
        Precision::Lowp => ctx.format.ulp(ret, 2.0),
    }
}

pub struct Exp;

impl FloatFunc1 for Exp {
    fn name(&self) -> &str {
        "exp"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.exp()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        exp_precision(ctx, ret, x)
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, f64::INFINITY)
    }
}

pub struct Exp2;

impl FloatFunc1 for Exp2 {
    fn name(&self) -> &str {
        "exp2"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.exp2()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        exp_precision(ctx, ret, x)
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, f64::INFINITY)
    }
}

pub struct Log;

impl FloatFunc1 for Log {
    fn name(&self) -> &str {
        "log"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.ln()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        log_precision(ctx, ret, x)
    }
}

pub struct Log2;

impl FloatFunc1 for Log2 {
    fn name(&self) -> &str {
        "log2"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.log2()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        log_precision(ctx, ret, x)
    }
}

pub struct InverseSqrt;

impl FloatFunc1 for InverseSqrt {
    fn name(&self) -> &str {
        "inversesqrt"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        1.0 / x.sqrt()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        if x <= 0.0 { f64::NAN } else { ctx.format.ulp(ret, 2.0) }
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, f64::INFINITY)
    }
}

/// Sign of a value as -1, 0 or 1
fn int_sign(x: f64) -> i32 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Periodic functions whose extrema are found by comparing endpoint slopes
trait Periodic {
    fn exact(&self, angle: f64) -> f64;

    /// Sign of the derivative at `angle`
    fn slope(&self, angle: f64) -> i32;

    fn periodic_extrema(&self, angle: &Interval) -> Interval {
        let lo_slope = self.slope(angle.lo());
        let hi_slope = self.slope(angle.hi());

        if angle.width() >= 2.0 * PI {
            // a full period reaches both extrema
            Interval::new(-1.0, 1.0)
        } else if lo_slope == 1 && hi_slope == -1 {
            Interval::point(1.0)
        } else if lo_slope == -1 && hi_slope == 1 {
            Interval::point(-1.0)
        } else if lo_slope == hi_slope && int_sign(self.exact(angle.hi()) - self.exact(angle.lo())) * lo_slope == -1 {
            // the slope changed sign twice between the endpoints
            Interval::new(-1.0, 1.0)
        } else {
            Interval::empty()
        }
    }
}

/// Error of `sin` and `cos`
fn trig_precision(ctx: &EvalContext, ret: f64, angle: f64) -> f64 {
    let in_first_period = (-PI..=PI).contains(&angle);
    match ctx.precision {
        Precision::Highp if in_first_period => ldexp(1.0, -11),
        // slightly over 2^-11 at pi
        Precision::Highp => ldexp(angle.abs(), -12),
        Precision::Mediump if in_first_period => ctx.format.ulp(ret, 2.0),
        // slightly over 2 ULP at pi
        Precision::Mediump => ldexp(angle.abs(), -10),
        Precision::Lowp => ctx.format.ulp(ret, 2.0),
    }
}

pub struct Sin;

impl Periodic for Sin {
    fn exact(&self, angle: f64) -> f64 {
        angle.sin()
    }

    fn slope(&self, angle: f64) -> i32 {
        int_sign(angle.cos())
    }
}

impl FloatFunc1 for Sin {
    fn name(&self) -> &str {
        "sin"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.sin()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        trig_precision(ctx, ret, x)
    }

    fn inner_extrema(&self, _ctx: &EvalContext, x: &Interval) -> Interval {
        self.periodic_extrema(x)
    }

    fn codomain(&self) -> Interval {
        Interval::new(-1.0, 1.0)
    }
}

pub struct Cos;

impl Periodic for Cos {
    fn exact(&self, angle: f64) -> f64 {
        angle.cos()
    }

    fn slope(&self, angle: f64) -> i32 {
        -int_sign(angle.sin())
    }
}

impl FloatFunc1 for Cos {
    fn name(&self) -> &str {
        "cos"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.cos()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        trig_precision(ctx, ret, x)
    }

    fn inner_extrema(&self, _ctx: &EvalContext, x: &Interval) -> Interval {
        self.periodic_extrema(x)
    }

    fn codomain(&self) -> Interval {
        Interval::new(-1.0, 1.0)
    }
}

/// Error of the inverse trigonometric functions
fn arc_precision(ctx: &EvalContext, ret: f64) -> f64 {
    match ctx.precision {
        Precision::Highp => ctx.format.ulp(ret, 4096.0),
        Precision::Mediump | Precision::Lowp => ctx.format.ulp(ret, 2.0),
    }
}

pub struct Asin;

impl FloatFunc1 for Asin {
    fn name(&self) -> &str {
        "asin"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.asin()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        if (-1.0..=1.0).contains(&x) { arc_precision(ctx, ret) } else { f64::NAN }
    }

    fn codomain(&self) -> Interval {
        Interval::new(-FRAC_PI_2, FRAC_PI_2)
    }
}

pub struct Acos;

impl FloatFunc1 for Acos {
    fn name(&self) -> &str {
        "acos"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.acos()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, x: f64) -> f64 {
        if (-1.0..=1.0).contains(&x) { arc_precision(ctx, ret) } else { f64::NAN }
    }

    fn codomain(&self) -> Interval {
        Interval::new(0.0, PI)
    }
}

pub struct Atan;

impl FloatFunc1 for Atan {
    fn name(&self) -> &str {
        "atan"
    }

    fn apply_exact(&self, x: f64) -> f64 {
        x.atan()
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, _x: f64) -> f64 {
        arc_precision(ctx, ret)
    }

    fn codomain(&self) -> Interval {
        Interval::new(-FRAC_PI_2, FRAC_PI_2)
    }
}

/// Two-argument arc tangent `atan(y, x)`
pub struct Atan2;

impl FloatFunc2 for Atan2 {
    fn name(&self) -> &str {
        "atan"
    }

    fn apply_exact(&self, y: f64, x: f64) -> f64 {
        y.atan2(x)
    }

    fn precision(&self, ctx: &EvalContext, ret: f64, _y: f64, _x: f64) -> f64 {
        arc_precision(ctx, ret)
    }

    /// Covers the branch cut along the negative x axis and the undefined origin
    fn inner_extrema(&self, ctx: &EvalContext, y: &Interval, x: &Interval) -> Interval {
        let mut ret = Interval::empty();

        if y.contains(0.0) {
            if x.contains(0.0) {
                ret = ret | Interval::nan_only();
            }
            if x.intersects(&Interval::new(f64::NEG_INFINITY, 0.0)) {
                ret = ret | Interval::new(-PI, PI);
            }
        }

        // without guaranteed infinities anything goes
        if ctx.format.has_inf != YesNoMaybe::Yes && (!y.is_finite() || !x.is_finite()) {
            ret = ret | Interval::nan_only();
        }

        ret
    }
}
