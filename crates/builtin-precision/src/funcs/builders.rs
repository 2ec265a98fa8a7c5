//! Expression builders
//!
//! Helpers that create function instances and apply them, lifting scalar functions
//! component-wise when any argument is a vector or matrix. The arithmetic operators on
//! [`Expr`] are component-wise as well; linear-algebra products are separate functions
//! in [`crate::funcs::matrix`].

use std::ops;
use std::rc::Rc;

use crate::expr::{Expr, VariableP};
use crate::funcs::common::{Abs, Ceil, Clamp, Floor, Max, Min, Round, RoundEven, Sign, Step, Trunc};
use crate::funcs::derived::{Derived, Sqrt};
use crate::funcs::geometric::{Dot, Length};
use crate::funcs::matrix::Determinant;
use crate::funcs::operators::{Add, Div, Mul, Negate, Sub};
use crate::funcs::primitive::{Binary, FloatFunc1, FloatFunc2, FloatFunc3, Ternary, Unary};
use crate::funcs::structural::{Alternatives, Cond, Construct, GenFunc, GetComponent, LessThan};
use crate::funcs::transcendental::{Cos, Exp, Exp2, InverseSqrt, Log, Log2, Sin};
use crate::funcs::{Func, FuncP};
use crate::value::ValueType;

pub fn var(variable: &VariableP) -> Expr {
    Expr::variable(variable.clone())
}

pub fn constant(value: f64) -> Expr {
    Expr::constant(value)
}

pub fn unary(func: impl FloatFunc1 + 'static) -> FuncP {
    Rc::new(Unary::new(func))
}

pub fn binary(func: impl FloatFunc2 + 'static) -> FuncP {
    Rc::new(Binary::new(func))
}

pub fn ternary(func: impl FloatFunc3 + 'static) -> FuncP {
    Rc::new(Ternary::new(func))
}

/// Wraps a scalar function so that it accepts `shape`, broadcasting scalar arguments
pub fn vectorize(scalar: FuncP, shape: ValueType, broadcast: Vec<bool>) -> FuncP {
    if shape.is_scalar() { scalar } else { Rc::new(GenFunc::new(scalar, shape, broadcast)) }
}

/// Applies a scalar function, lifting it over the first non-scalar argument's shape
pub fn lift(scalar: FuncP, args: Vec<Expr>) -> Expr {
    let shape = args.iter().map(Expr::ty).find(|ty| !ty.is_scalar());
    match shape {
        None => Expr::apply(scalar, args),
        Some(shape) => {
            let broadcast = args.iter().map(|arg| arg.ty().is_scalar()).collect();
            Expr::apply(vectorize(scalar, shape, broadcast), args)
        }
    }
}

/// Applies any function without lifting
pub fn app(func: impl Func + 'static, args: Vec<Expr>) -> Expr {
    Expr::apply(Rc::new(func), args)
}

pub fn component(expr: &Expr, index: usize) -> Expr {
    app(GetComponent::new(expr.ty(), index), vec![expr.clone()])
}

/// Builds a vector from scalar expressions
pub fn vec(components: Vec<Expr>) -> Expr {
    app(Construct::new(ValueType::vec(components.len())), components)
}

/// Builds a matrix from column vector expressions
pub fn mat(columns: Vec<Expr>) -> Expr {
    let rows = columns[0].ty().size();
    app(Construct::new(ValueType::mat(columns.len(), rows)), columns)
}

pub fn less_than(a: Expr, b: Expr) -> Expr {
    app(LessThan::new(), vec![a, b])
}

pub fn cond(condition: Expr, if_true: Expr, if_false: Expr) -> Expr {
    let ty = if_true.ty();
    app(Cond::new(ty), vec![condition, if_true, if_false])
}

pub fn alternatives(a: Expr, b: Expr) -> Expr {
    let ty = a.ty();
    app(Alternatives::new(ty), vec![a, b])
}

pub fn exp(x: Expr) -> Expr {
    lift(unary(Exp), vec![x])
}

pub fn exp2(x: Expr) -> Expr {
    lift(unary(Exp2), vec![x])
}

pub fn log(x: Expr) -> Expr {
    lift(unary(Log), vec![x])
}

pub fn log2(x: Expr) -> Expr {
    lift(unary(Log2), vec![x])
}

pub fn inversesqrt(x: Expr) -> Expr {
    lift(unary(InverseSqrt), vec![x])
}

pub fn sqrt(x: Expr) -> Expr {
    lift(Rc::new(Derived::new(Sqrt)), vec![x])
}

pub fn sin(x: Expr) -> Expr {
    lift(unary(Sin), vec![x])
}

pub fn cos(x: Expr) -> Expr {
    lift(unary(Cos), vec![x])
}

pub fn abs(x: Expr) -> Expr {
    lift(unary(Abs), vec![x])
}

pub fn sign(x: Expr) -> Expr {
    lift(unary(Sign), vec![x])
}

pub fn floor(x: Expr) -> Expr {
    lift(unary(Floor), vec![x])
}

pub fn ceil(x: Expr) -> Expr {
    lift(unary(Ceil), vec![x])
}

pub fn trunc(x: Expr) -> Expr {
    lift(unary(Trunc), vec![x])
}

pub fn round(x: Expr) -> Expr {
    lift(unary(Round), vec![x])
}

pub fn round_even(x: Expr) -> Expr {
    lift(unary(RoundEven), vec![x])
}

pub fn min(a: Expr, b: Expr) -> Expr {
    lift(binary(Min), vec![a, b])
}

pub fn max(a: Expr, b: Expr) -> Expr {
    lift(binary(Max), vec![a, b])
}

pub fn step(edge: Expr, x: Expr) -> Expr {
    lift(binary(Step), vec![edge, x])
}

pub fn clamp(x: Expr, min_val: Expr, max_val: Expr) -> Expr {
    lift(ternary(Clamp), vec![x, min_val, max_val])
}

pub fn dot(a: Expr, b: Expr) -> Expr {
    let size = a.ty().size();
    app(Derived::new(Dot::new(size)), vec![a, b])
}

pub fn length(x: Expr) -> Expr {
    let size = x.ty().size();
    app(Derived::new(Length::new(size)), vec![x])
}

pub fn determinant(m: Expr) -> Expr {
    let size = m.ty().size();
    app(Derived::new(Determinant::new(size)), vec![m])
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        lift(binary(Add), vec![self, rhs])
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        lift(binary(Sub), vec![self, rhs])
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        lift(binary(Mul), vec![self, rhs])
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        lift(binary(Div), vec![self, rhs])
    }
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        lift(unary(Negate), vec![self])
    }
}
