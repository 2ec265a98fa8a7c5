//! Derived functions
//!
//! A derived function is defined by an expansion into expressions over other functions.
//! The expansion is built once per instance, on first use, and then replayed in a fresh
//! environment for every application. Its bound is whatever the composed functions
//! produce, so no error analysis is written for it.

use std::cell::OnceCell;
use std::f64::consts::PI;
use std::fmt;

use crate::expr::{EvalContext, ExpandContext, Expr, Statement, VariableP};
use crate::funcs::builders::{alternatives, clamp, constant, cos, exp, exp2, floor, inversesqrt, log, log2, sin, sqrt};
use crate::funcs::{Func, Signature, write_call};
use crate::value::IVal;

/// Parameter names used inside expansions
const PARAM_NAMES: [&str; 4] = ["a", "b", "c", "d"];

/// Definition of a derived function
pub trait DerivedFunc {
    fn name(&self) -> String;

    fn signature(&self) -> Signature;

    /// Builds the result expression from parameter expressions, adding any
    /// intermediate statements to `ctx`
    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr;

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_call(f, &self.name(), args)
    }
}

/// Cached expansion of a derived function
struct Expansion {
    params: Vec<VariableP>,
    body: Vec<Statement>,
    ret: Expr,
    slots: usize,
}

/// Adapts a [`DerivedFunc`] to [`Func`], expanding lazily
pub struct Derived<D> {
    inner: D,
    signature: Signature,
    expansion: OnceCell<Expansion>,
}

impl<D: DerivedFunc> Derived<D> {
    pub fn new(inner: D) -> Self {
        let signature = inner.signature();
        Self {
            inner,
            signature,
            expansion: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn expansion(&self) -> &Expansion {
        self.expansion.get_or_init(|| {
            let mut ctx = ExpandContext::new();
            let params: Vec<VariableP> = self.signature.args.iter().zip(PARAM_NAMES).map(|(ty, name)| ctx.variable(name, *ty)).collect();
            let args: Vec<Expr> = params.iter().cloned().map(Expr::variable).collect();
            let ret = self.inner.expand(&mut ctx, &args);
            assert_eq!(ret.ty(), self.signature.ret, "Expansion of {} has the wrong type", self.inner.name());
            let (body, slots) = ctx.finish();
            Expansion { params, body, ret, slots }
        })
    }

    /// The expansion as pseudo-GLSL, with the result on a final `return` line
    pub fn body_source(&self) -> String {
        let expansion = self.expansion();
        let mut source: String = expansion.body.iter().map(ToString::to_string).collect();
        source.push_str(&format!("return {};\n", expansion.ret));
        source
    }
}

impl<D: DerivedFunc> Func for Derived<D> {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        self.inner.print(f, args)
    }

    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal {
        let expansion = self.expansion();
        let mut env = crate::expr::Environment::new(expansion.slots);
        for (param, arg) in expansion.params.iter().zip(args) {
            env.bind(param, arg.clone());
        }

        let mut body_ctx = ctx.nested(env);
        for statement in &expansion.body {
            statement.execute(&mut body_ctx);
        }
        expansion.ret.evaluate(&body_ctx)
    }
}

pub struct Radians;

impl DerivedFunc for Radians {
    fn name(&self) -> String {
        "radians".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    /// The factor is the `float` literal a shader would carry
    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        constant(f64::from((PI / 180.0) as f32)) * args[0].clone()
    }
}

pub struct Degrees;

impl DerivedFunc for Degrees {
    fn name(&self) -> String {
        "degrees".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        constant(f64::from((180.0 / PI) as f32)) * args[0].clone()
    }
}

pub struct Tan;

impl DerivedFunc for Tan {
    fn name(&self) -> String {
        "tan".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        sin(x.clone()) * (constant(1.0) / cos(x.clone()))
    }
}

pub struct Sinh;

impl DerivedFunc for Sinh {
    fn name(&self) -> String {
        "sinh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        (exp(x.clone()) - exp(-x.clone())) / constant(2.0)
    }
}

pub struct Cosh;

impl DerivedFunc for Cosh {
    fn name(&self) -> String {
        "cosh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        (exp(x.clone()) + exp(-x.clone())) / constant(2.0)
    }
}

pub struct Tanh;

impl DerivedFunc for Tanh {
    fn name(&self) -> String {
        "tanh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        let ex = ctx.bind_expression("ex", exp(x.clone()));
        let emx = ctx.bind_expression("emx", exp(-x.clone()));
        (ex.clone() - emx.clone()) / (ex + emx)
    }
}

pub struct Asinh;

impl DerivedFunc for Asinh {
    fn name(&self) -> String {
        "asinh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        log(x.clone() + sqrt(x.clone() * x.clone() + constant(1.0)))
    }
}

pub struct Acosh;

impl DerivedFunc for Acosh {
    fn name(&self) -> String {
        "acosh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        log(x.clone() + sqrt((x.clone() + constant(1.0)) * (x.clone() - constant(1.0))))
    }
}

pub struct Atanh;

impl DerivedFunc for Atanh {
    fn name(&self) -> String {
        "atanh".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let x = &args[0];
        constant(0.5) * log((constant(1.0) + x.clone()) / (constant(1.0) - x.clone()))
    }
}

/// `pow(x, y)` as `exp2(y * log2(x))`
pub struct Pow;

impl DerivedFunc for Pow {
    fn name(&self) -> String {
        "pow".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(2)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        exp2(args[1].clone() * log2(args[0].clone()))
    }
}

pub struct Sqrt;

impl DerivedFunc for Sqrt {
    fn name(&self) -> String {
        "sqrt".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        constant(1.0) / inversesqrt(args[0].clone())
    }
}

pub struct Fract;

impl DerivedFunc for Fract {
    fn name(&self) -> String {
        "fract".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(1)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        args[0].clone() - floor(args[0].clone())
    }
}

pub struct Mod;

impl DerivedFunc for Mod {
    fn name(&self) -> String {
        "mod".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(2)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (x, y) = (&args[0], &args[1]);
        x.clone() - y.clone() * floor(x.clone() / y.clone())
    }
}

/// `mix(x, y, a)`; both common formulations are accepted
pub struct Mix;

impl DerivedFunc for Mix {
    fn name(&self) -> String {
        "mix".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(3)
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (x, y, a) = (&args[0], &args[1], &args[2]);
        let weighted = x.clone() * (constant(1.0) - a.clone()) + y.clone() * a.clone();
        let stepped = x.clone() + (y.clone() - x.clone()) * a.clone();
        alternatives(weighted, stepped)
    }
}

/// `smoothstep(edge0, edge1, x)`
pub struct SmoothStep;

impl DerivedFunc for SmoothStep {
    fn name(&self) -> String {
        "smoothstep".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::float(3)
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (edge0, edge1, x) = (&args[0], &args[1], &args[2]);
        let t = ctx.bind_expression("t", clamp((x.clone() - edge0.clone()) / (edge1.clone() - edge0.clone()), constant(0.0), constant(1.0)));
        (t.clone() * t.clone()) * (constant(3.0) - constant(2.0) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Environment;
    use crate::float_format::{FloatFormat, Precision};
    use crate::interval::Interval;
    use proptest::prelude::*;

    fn apply(func: &dyn Func, format: &FloatFormat, precision: Precision, args: &[f64]) -> Interval {
        let ctx = EvalContext::new(format, precision, Environment::new(0));
        let args: Vec<IVal> = args.iter().map(|&v| IVal::Scalar(Interval::point(v))).collect();
        func.apply(&ctx, &args).as_scalar()
    }

    #[test]
    fn test_expansion_is_cached() {
        let tanh = Derived::new(Tanh);
        let first = tanh.body_source();
        assert_eq!(first, tanh.body_source());
        assert!(first.starts_with("float ex0 = exp(a);\n"));
        assert!(first.ends_with("return ((ex0 - emx1) / (ex0 + emx1));\n"));
    }

    #[test]
    fn test_sqrt_and_pow() {
        let format = FloatFormat::highp();
        assert!(apply(&Derived::new(Sqrt), &format, Precision::Highp, &[4.0]).contains(2.0));
        assert!(apply(&Derived::new(Pow), &format, Precision::Highp, &[2.0, 3.0]).contains(8.0));
        assert!(apply(&Derived::new(Sqrt), &format, Precision::Highp, &[-1.0]).has_nan());
    }

    #[test]
    fn test_fract_and_mod() {
        let format = FloatFormat::highp();
        assert!(apply(&Derived::new(Fract), &format, Precision::Highp, &[2.75]).contains(0.75));
        assert!(apply(&Derived::new(Mod), &format, Precision::Highp, &[7.0, 3.0]).contains(1.0));
    }

    #[test]
    fn test_mix_and_smoothstep() {
        let format = FloatFormat::mediump();
        let mixed = apply(&Derived::new(Mix), &format, Precision::Mediump, &[1.0, 3.0, 0.25]);
        assert!(mixed.contains(1.5));
        let smooth = apply(&Derived::new(SmoothStep), &format, Precision::Mediump, &[0.0, 1.0, 0.5]);
        assert!(smooth.contains(0.5));
        let below = apply(&Derived::new(SmoothStep), &format, Precision::Mediump, &[0.0, 1.0, -3.0]);
        assert!(below.contains(0.0));
    }

    #[test]
    fn test_trig_and_hyperbolic() {
        let format = FloatFormat::highp();
        assert!(apply(&Derived::new(Tan), &format, Precision::Highp, &[0.5]).contains(0.5f64.tan()));
        assert!(apply(&Derived::new(Sinh), &format, Precision::Highp, &[1.0]).contains(1.0f64.sinh()));
        assert!(apply(&Derived::new(Atanh), &format, Precision::Highp, &[0.5]).contains(0.5f64.atanh()));
        assert!(apply(&Derived::new(Radians), &format, Precision::Highp, &[180.0]).contains(PI));
    }

    #[test]
    fn test_angle_conversion_uses_float_constant() {
        let format = FloatFormat::highp();
        let radians = apply(&Derived::new(Radians), &format, Precision::Highp, &[1.0]);
        assert_eq!(radians, Interval::point(f64::from((PI / 180.0) as f32)));
        let degrees = apply(&Derived::new(Degrees), &format, Precision::Highp, &[1.0]);
        assert_eq!(degrees, Interval::point(f64::from((180.0 / PI) as f32)));
    }

    #[test]
    fn test_composition_contains_direct_composition() {
        // the expansion of sqrt is exactly 1 / inversesqrt(x)
        use crate::funcs::operators::Div;
        use crate::funcs::primitive::FloatFunc2;
        use crate::funcs::transcendental::InverseSqrt;
        use crate::funcs::primitive::FloatFunc1;

        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let x = Interval::new(2.0, 3.0);
        let direct = Div.apply_interval(&ctx, &Interval::point(1.0), &InverseSqrt.apply_interval(&ctx, &x));
        let expanded = Derived::new(Sqrt).apply(&ctx, &[IVal::Scalar(x)]).as_scalar();
        assert!(expanded.contains_interval(&direct));
    }

    proptest! {
        #[test]
        fn test_tan_sound_for_f32(x in -1.5f32..1.5) {
            let bound = apply(&Derived::new(Tan), &FloatFormat::highp(), Precision::Highp, &[f64::from(x)]);
            prop_assert!(bound.contains(f64::from(x.tan())));
        }

        #[test]
        fn test_pow_sound_for_f32(x in 0.5f32..4.0, y in -3.0f32..3.0) {
            let bound = apply(&Derived::new(Pow), &FloatFormat::highp(), Precision::Highp, &[f64::from(x), f64::from(y)]);
            prop_assert!(bound.contains(f64::from(x.powf(y))));
        }

        #[test]
        fn test_radians_sound_for_f32(x in -1.0e3f32..1.0e3) {
            let bound = apply(&Derived::new(Radians), &FloatFormat::highp(), Precision::Highp, &[f64::from(x)]);
            prop_assert!(bound.contains(f64::from(x * (PI / 180.0) as f32)));
        }
    }
}
