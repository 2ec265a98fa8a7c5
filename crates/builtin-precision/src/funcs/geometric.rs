//! Geometric functions, all derived from arithmetic primitives

use crate::expr::{ExpandContext, Expr};
use crate::funcs::builders::{alternatives, cond, constant, dot, length, less_than, sqrt, vec};
use crate::funcs::derived::DerivedFunc;
use crate::funcs::Signature;
use crate::value::ValueType;

/// Zero of a float vector type, or scalar zero when `size` is 1
fn zero(size: usize) -> Expr {
    if size == 1 { constant(0.0) } else { vec(vec![constant(0.0); size]) }
}

/// `dot(a, b)` as a left-to-right sum of component products
pub struct Dot {
    size: usize,
}

impl Dot {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Dot {
    fn name(&self) -> String {
        "dot".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::FLOAT, vec![ValueType::vec(self.size); 2])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (x, y) = (&args[0], &args[1]);
        if self.size == 1 {
            return x.clone() * y.clone();
        }
        (1..self.size).fold(x.index(0) * y.index(0), |sum, i| sum + x.index(i) * y.index(i))
    }
}

pub struct Length {
    size: usize,
}

impl Length {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Length {
    fn name(&self) -> String {
        "length".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::FLOAT, vec![ValueType::vec(self.size)])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        sqrt(dot(args[0].clone(), args[0].clone()))
    }
}

pub struct Distance {
    size: usize,
}

impl Distance {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Distance {
    fn name(&self) -> String {
        "distance".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::FLOAT, vec![ValueType::vec(self.size); 2])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        length(args[0].clone() - args[1].clone())
    }
}

pub struct Normalize {
    size: usize,
}

impl Normalize {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Normalize {
    fn name(&self) -> String {
        "normalize".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.size), vec![ValueType::vec(self.size)])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        args[0].clone() / length(args[0].clone())
    }
}

pub struct Cross;

impl DerivedFunc for Cross {
    fn name(&self) -> String {
        "cross".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(3), vec![ValueType::vec(3); 2])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (x, y) = (&args[0], &args[1]);
        vec(vec![
            x.index(1) * y.index(2) - y.index(1) * x.index(2),
            x.index(2) * y.index(0) - y.index(2) * x.index(0),
            x.index(0) * y.index(1) - y.index(0) * x.index(1),
        ])
    }
}

/// `faceforward(N, I, Nref)`
pub struct FaceForward {
    size: usize,
}

impl FaceForward {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for FaceForward {
    fn name(&self) -> String {
        "faceforward".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.size), vec![ValueType::vec(self.size); 3])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (n, i, n_ref) = (&args[0], &args[1], &args[2]);
        cond(less_than(dot(n_ref.clone(), i.clone()), constant(0.0)), n.clone(), -n.clone())
    }
}

/// `reflect(I, N)`
pub struct Reflect {
    size: usize,
}

impl Reflect {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Reflect {
    fn name(&self) -> String {
        "reflect".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.size), vec![ValueType::vec(self.size); 2])
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (i, n) = (&args[0], &args[1]);
        let dot_ni = ctx.bind_expression("dotNI", dot(n.clone(), i.clone()));
        let scaled = alternatives((n.clone() * dot_ni.clone()) * constant(2.0), n.clone() * (dot_ni * constant(2.0)));
        i.clone() - scaled
    }
}

/// `refract(I, N, eta)`
pub struct Refract {
    size: usize,
}

impl Refract {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl DerivedFunc for Refract {
    fn name(&self) -> String {
        "refract".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.size), vec![ValueType::vec(self.size), ValueType::vec(self.size), ValueType::FLOAT])
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (i, n, eta) = (&args[0], &args[1], &args[2]);
        let dot_ni = ctx.bind_expression("dotNI", dot(n.clone(), i.clone()));
        let k = ctx.bind_expression("k", constant(1.0) - eta.clone() * eta.clone() * (constant(1.0) - dot_ni.clone() * dot_ni.clone()));
        let refracted = i.clone() * eta.clone() - n.clone() * (eta.clone() * dot_ni + sqrt(k.clone()));
        cond(less_than(k, constant(0.0)), zero(self.size), refracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{Environment, EvalContext};
    use crate::float_format::{FloatFormat, Precision};
    use crate::funcs::Func;
    use crate::funcs::derived::Derived;
    use crate::interval::Interval;
    use crate::value::IVal;

    fn vector(values: &[f64]) -> IVal {
        IVal::vector(values.iter().map(|&v| Interval::point(v)))
    }

    #[test]
    fn test_dot_expansion_and_value() {
        let dot = Derived::new(Dot::new(3));
        assert_eq!(dot.body_source(), "return (((a[0] * b[0]) + (a[1] * b[1])) + (a[2] * b[2]));\n");

        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let ret = dot.apply(&ctx, &[vector(&[1.0, 2.0, 3.0]), vector(&[4.0, 5.0, 6.0])]).as_scalar();
        assert!(ret.contains(32.0));
        assert!(ret.width() < 1.0e-3);
    }

    #[test]
    fn test_length_and_normalize() {
        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let length = Derived::new(Length::new(2)).apply(&ctx, &[vector(&[3.0, 4.0])]).as_scalar();
        assert!(length.contains(5.0));

        let normalized = Derived::new(Normalize::new(2)).apply(&ctx, &[vector(&[3.0, 4.0])]);
        assert!(normalized.component(0).as_scalar().contains(0.6));
        assert!(normalized.component(1).as_scalar().contains(0.8));
    }

    #[test]
    fn test_cross() {
        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let ret = Derived::new(Cross).apply(&ctx, &[vector(&[1.0, 0.0, 0.0]), vector(&[0.0, 1.0, 0.0])]);
        let lows: Vec<f64> = ret.scalars().iter().map(Interval::lo).collect();
        assert_eq!(lows, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_faceforward_and_reflect() {
        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let n = vector(&[0.0, 1.0]);
        let i = vector(&[1.0, -1.0]);
        let facing = Derived::new(FaceForward::new(2)).apply(&ctx, &[n.clone(), i.clone(), n.clone()]);
        assert!(facing.component(1).as_scalar().contains(1.0));

        let reflected = Derived::new(Reflect::new(2)).apply(&ctx, &[i, n]);
        assert!(reflected.component(0).as_scalar().contains(1.0));
        assert!(reflected.component(1).as_scalar().contains(1.0));
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        let format = FloatFormat::highp();
        let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
        let i = vector(&[0.8, -0.6]);
        let n = vector(&[0.0, 1.0]);
        let ret = Derived::new(Refract::new(2)).apply(&ctx, &[i, n, IVal::Scalar(Interval::point(2.0))]);
        assert_eq!(ret.component(0).as_scalar(), Interval::point(0.0));
    }
}
