//! Structural functions: component access, constructors, comparison, selection and
//! component-wise lifting of scalar functions to vectors and matrices

use std::fmt;

use crate::expr::{EvalContext, Expr};
use crate::funcs::{Func, FuncP, Signature, write_call};
use crate::interval::Interval;
use crate::value::{IVal, ValueType};

/// `v[i]`: component of a vector or column of a matrix
pub struct GetComponent {
    index: usize,
    signature: Signature,
}

impl GetComponent {
    pub fn new(container: ValueType, index: usize) -> Self {
        assert!(!container.is_scalar(), "Cannot index scalar type {container}");
        assert!(index < container.size(), "Index {index} out of range for {container}");
        Self {
            index,
            signature: Signature::new(container.component_type(), vec![container]),
        }
    }
}

impl Func for GetComponent {
    fn name(&self) -> String {
        "comp".to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write!(f, "{}[{}]", args[0], self.index)
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        args[0].component(self.index).clone()
    }
}

/// Vector or matrix constructor from its components (or columns)
pub struct Construct {
    signature: Signature,
}

impl Construct {
    pub fn new(ty: ValueType) -> Self {
        assert!(!ty.is_scalar(), "Cannot construct scalar type {ty} from components");
        Self {
            signature: Signature::new(ty, vec![ty.component_type(); ty.size()]),
        }
    }
}

impl Func for Construct {
    fn name(&self) -> String {
        self.signature.ret.glsl_name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        IVal::Composite(args.to_vec())
    }
}

/// Interval of a boolean: the set of possible truth values as 0 and 1
fn bool_interval(can_be_false: bool, can_be_true: bool) -> Interval {
    let mut ret = Interval::empty();
    if can_be_false {
        ret = ret | Interval::point(0.0);
    }
    if can_be_true {
        ret = ret | Interval::point(1.0);
    }
    ret
}

/// Scalar `a < b`
pub struct LessThan {
    signature: Signature,
}

impl LessThan {
    pub fn new() -> Self {
        Self {
            signature: Signature::new(ValueType::BOOL, vec![ValueType::FLOAT, ValueType::FLOAT]),
        }
    }
}

impl Default for LessThan {
    fn default() -> Self {
        Self::new()
    }
}

impl Func for LessThan {
    fn name(&self) -> String {
        "lessThan".to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write!(f, "({} < {})", args[0], args[1])
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        let a = args[0].as_scalar();
        let b = args[1].as_scalar();
        // comparisons involving NaN are false
        let can_be_true = !a.is_empty() && !b.is_empty() && a.lo() < b.hi();
        let can_be_false = (!a.is_empty() && !b.is_empty() && a.hi() >= b.lo()) || a.has_nan() || b.has_nan();
        IVal::Scalar(bool_interval(can_be_false, can_be_true))
    }
}

/// `(c ? a : b)`
pub struct Cond {
    ty: ValueType,
    signature: Signature,
}

impl Cond {
    pub fn new(ty: ValueType) -> Self {
        Self {
            ty,
            signature: Signature::new(ty, vec![ValueType::BOOL, ty, ty]),
        }
    }
}

impl Func for Cond {
    fn name(&self) -> String {
        "_cond".to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write!(f, "({} ? {} : {})", args[0], args[1], args[2])
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        let condition = args[0].as_scalar();
        let mut ret = self.ty.empty_interval();
        if condition.contains(1.0) {
            ret = self.ty.union(&ret, &args[1]);
        }
        if condition.contains(0.0) {
            ret = self.ty.union(&ret, &args[2]);
        }
        ret
    }
}

/// Either of two equally valid formulations; the bound is their union
pub struct Alternatives {
    ty: ValueType,
    signature: Signature,
}

impl Alternatives {
    pub fn new(ty: ValueType) -> Self {
        Self {
            ty,
            signature: Signature::new(ty, vec![ty, ty]),
        }
    }
}

impl Func for Alternatives {
    fn name(&self) -> String {
        "alternatives".to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write!(f, "{{{} | {}}}", args[0], args[1])
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        self.ty.union(&args[0], &args[1])
    }
}

/// Lifts a scalar function to apply component-wise over a vector or matrix shape
///
/// Arguments flagged as broadcast stay scalar and are reused for every component, as
/// in `vec3 * float`.
pub struct GenFunc {
    scalar: FuncP,
    shape: ValueType,
    broadcast: Vec<bool>,
    display_name: Option<String>,
    signature: Signature,
}

impl GenFunc {
    /// # Panics
    /// Panics if `scalar` is not a scalar function of matching arity.
    pub fn new(scalar: FuncP, shape: ValueType, broadcast: Vec<bool>) -> Self {
        let scalar_signature = scalar.signature().clone();
        assert!(scalar_signature.ret.is_scalar() && scalar_signature.args.iter().all(ValueType::is_scalar), "GenFunc needs a scalar function, got {}", scalar.name());
        assert_eq!(broadcast.len(), scalar_signature.args.len(), "Broadcast flags do not match the arity of {}", scalar.name());

        let args = scalar_signature
            .args
            .iter()
            .zip(&broadcast)
            .map(|(arg, &is_broadcast)| if is_broadcast { *arg } else { shape.with_scalar(arg.scalar_type()) })
            .collect::<Vec<_>>();
        let signature = Signature::new(shape.with_scalar(scalar_signature.ret.scalar_type()), args);

        Self {
            scalar,
            shape,
            broadcast,
            display_name: None,
            signature,
        }
    }

    /// Component-wise application with no broadcast arguments
    pub fn componentwise(scalar: FuncP, shape: ValueType) -> Self {
        let arity = scalar.signature().args.len();
        Self::new(scalar, shape, vec![false; arity])
    }

    /// Prints applications with `name` in call syntax instead of the scalar function's syntax
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

impl Func for GenFunc {
    fn name(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| self.scalar.name())
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        match &self.display_name {
            Some(name) => write_call(f, name, args),
            None => self.scalar.print(f, args),
        }
    }

    fn apply(&self, ctx: &EvalContext, args: &[IVal]) -> IVal {
        let flat: Vec<Vec<Interval>> = args.iter().map(IVal::scalars).collect();
        let results: Vec<Interval> = (0..self.shape.scalar_count())
            .map(|slot| {
                let scalar_args: Vec<IVal> = flat.iter().zip(&self.broadcast).map(|(scalars, &is_broadcast)| IVal::Scalar(if is_broadcast { scalars[0] } else { scalars[slot] })).collect();
                self.scalar.apply(ctx, &scalar_args).as_scalar()
            })
            .collect();
        self.signature.ret.ival_from_scalars(&results)
    }
}

/// Matrix transpose
pub struct Transpose {
    signature: Signature,
}

impl Transpose {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            signature: Signature::new(ValueType::mat(rows, cols), vec![ValueType::mat(cols, rows)]),
        }
    }
}

impl Func for Transpose {
    fn name(&self) -> String {
        "transpose".to_string()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn apply(&self, _ctx: &EvalContext, args: &[IVal]) -> IVal {
        let ValueType::Matrix { cols, rows } = self.signature.ret else {
            unreachable!("transpose always returns a matrix")
        };
        IVal::Composite((0..cols).map(|col| IVal::Composite((0..rows).map(|row| args[0].component(row).component(col).clone()).collect())).collect())
    }
}
