//! Builtin function hierarchy
//!
//! A [`Func`] knows its GLSL signature, how to print an application of itself, and how to
//! bound its result from interval arguments. Primitive functions do the bounding
//! themselves (see [`primitive`]); derived functions expand into expressions over other
//! functions and inherit their bounds (see [`derived`]).

pub mod builders;
pub mod common;
pub mod derived;
pub mod geometric;
pub mod matrix;
pub mod operators;
pub mod primitive;
pub mod structural;
pub mod transcendental;

use std::fmt;
use std::rc::Rc;

use crate::expr::{EvalContext, Expr};
use crate::value::{IVal, ValueType};

/// Return and argument types of a function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub ret: ValueType,
    pub args: Vec<ValueType>,
}

impl Signature {
    pub fn new(ret: ValueType, args: impl Into<Vec<ValueType>>) -> Self {
        Self { ret, args: args.into() }
    }

    /// `float f(float, ...)` with `arity` arguments
    pub fn float(arity: usize) -> Self {
        Self::new(ValueType::FLOAT, vec![ValueType::FLOAT; arity])
    }
}

/// A builtin operation that can be printed as GLSL and evaluated over intervals
pub trait Func {
    /// GLSL name used in call syntax
    fn name(&self) -> String;

    fn signature(&self) -> &Signature;

    /// Writes an application of the function to `args`, call syntax by default
    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_call(f, &self.name(), args)
    }

    /// Computes an interval containing every admissible result for arguments in `args`
    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal;
}

pub type FuncP = Rc<dyn Func>;

impl fmt::Debug for dyn Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({})", self.name())
    }
}

/// Writes `name(arg0, arg1, ...)`
pub fn write_call(f: &mut fmt::Formatter<'_>, name: &str, args: &[Expr]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    write!(f, ")")
}

/// Writes `(arg0 symbol arg1)`
pub fn write_infix(f: &mut fmt::Formatter<'_>, symbol: &str, args: &[Expr]) -> fmt::Result {
    write!(f, "({} {symbol} {})", args[0], args[1])
}
