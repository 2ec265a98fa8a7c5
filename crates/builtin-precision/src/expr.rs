//! Expression model
//!
//! An [`Expr`] is an immutable tree of variable references, constants and function
//! applications. The same tree is evaluated over intervals (to compute reference bounds)
//! and printed as GLSL (to build the shader under test).
//!
//! Variables are bound to integer slots when they are created by a [`Scope`], so an
//! [`Environment`] is a plain vector indexed by slot.

use std::fmt;
use std::rc::Rc;

use crate::float_format::{FloatFormat, Precision};
use crate::funcs::FuncP;
use crate::interval::Interval;
use crate::value::{IVal, ValueType};

/// A named, typed handle into an [`Environment`] slot
#[derive(Debug, PartialEq, Eq)]
pub struct Variable {
    name: String,
    ty: ValueType,
    slot: usize,
}

pub type VariableP = Rc<Variable>;

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// Allocates variable slots for one environment layout
#[derive(Debug, Default)]
pub struct Scope {
    variables: Vec<VariableP>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a variable bound to the next free slot
    pub fn variable(&mut self, name: impl Into<String>, ty: ValueType) -> VariableP {
        let variable = Rc::new(Variable {
            name: name.into(),
            ty,
            slot: self.variables.len(),
        });
        self.variables.push(variable.clone());
        variable
    }

    /// Number of slots an environment for this scope needs
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Creates an environment with every slot unbound
    pub fn environment(&self) -> Environment {
        Environment::new(self.len())
    }
}

/// Slot-indexed storage of interval values
#[derive(Debug, Clone, Default)]
pub struct Environment {
    slots: Vec<Option<IVal>>,
}

impl Environment {
    pub fn new(size: usize) -> Self {
        Self { slots: vec![None; size] }
    }

    pub fn bind(&mut self, variable: &Variable, value: IVal) {
        self.slots[variable.slot] = Some(value);
    }

    /// Returns the bound value
    ///
    /// # Panics
    /// Panics if the variable was never bound; this is a bug in the expression definition.
    pub fn lookup(&self, variable: &Variable) -> &IVal {
        match self.slots.get(variable.slot) {
            Some(Some(value)) => value,
            _ => panic!("Variable '{}' (slot {}) is not bound", variable.name, variable.slot),
        }
    }
}

/// Everything interval evaluation needs: the target format, its precision and the bindings
pub struct EvalContext<'a> {
    pub format: &'a FloatFormat,
    pub precision: Precision,
    pub env: Environment,
    /// Nesting depth of derived function bodies, informational only
    pub call_depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(format: &'a FloatFormat, precision: Precision, env: Environment) -> Self {
        Self {
            format,
            precision,
            env,
            call_depth: 0,
        }
    }

    /// Creates a context for a nested function body with its own environment
    pub fn nested(&self, env: Environment) -> EvalContext<'a> {
        EvalContext {
            format: self.format,
            precision: self.precision,
            env,
            call_depth: self.call_depth + 1,
        }
    }
}

#[derive(Debug)]
enum ExprNode {
    Variable(VariableP),
    Constant(f64),
    Apply { func: FuncP, args: Vec<Expr> },
    /// Application whose arguments are all plain variables, looked up directly
    ApplyVar { func: FuncP, args: Vec<VariableP> },
}

/// Shared, immutable expression tree node
#[derive(Debug, Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    pub fn variable(variable: VariableP) -> Expr {
        Expr(Rc::new(ExprNode::Variable(variable)))
    }

    /// A float constant, evaluated exactly
    pub fn constant(value: f64) -> Expr {
        Expr(Rc::new(ExprNode::Constant(value)))
    }

    /// Applies `func` to `args`
    ///
    /// # Panics
    /// Panics if the argument count or types do not match the function's signature.
    pub fn apply(func: FuncP, args: Vec<Expr>) -> Expr {
        let signature = func.signature();
        assert_eq!(args.len(), signature.args.len(), "Wrong number of arguments to {}", func.name());
        for (i, (arg, expected)) in args.iter().zip(&signature.args).enumerate() {
            assert_eq!(arg.ty(), *expected, "Argument {i} of {} has type {}, expected {}", func.name(), arg.ty(), expected);
        }

        let variables: Option<Vec<VariableP>> = args.iter().map(|arg| arg.as_variable().cloned()).collect();
        match variables {
            Some(variables) if !variables.is_empty() => Expr(Rc::new(ExprNode::ApplyVar { func, args: variables })),
            _ => Expr(Rc::new(ExprNode::Apply { func, args })),
        }
    }

    pub fn as_variable(&self) -> Option<&VariableP> {
        match self.0.as_ref() {
            ExprNode::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub fn ty(&self) -> ValueType {
        match self.0.as_ref() {
            ExprNode::Variable(variable) => variable.ty,
            ExprNode::Constant(_) => ValueType::FLOAT,
            ExprNode::Apply { func, .. } | ExprNode::ApplyVar { func, .. } => func.signature().ret,
        }
    }

    /// Computes the interval value of the expression under `ctx`
    pub fn evaluate(&self, ctx: &EvalContext) -> IVal {
        match self.0.as_ref() {
            ExprNode::Variable(variable) => ctx.env.lookup(variable).clone(),
            ExprNode::Constant(value) => IVal::Scalar(Interval::point(*value)),
            ExprNode::Apply { func, args } => {
                let values: Vec<IVal> = args.iter().map(|arg| arg.evaluate(ctx)).collect();
                func.apply(ctx, &values)
            }
            ExprNode::ApplyVar { func, args } => {
                let values: Vec<IVal> = args.iter().map(|variable| ctx.env.lookup(variable).clone()).collect();
                func.apply(ctx, &values)
            }
        }
    }

    /// Component `index` of a vector, or column `index` of a matrix
    pub fn index(&self, index: usize) -> Expr {
        crate::funcs::builders::component(self, index)
    }
}

/// Writes a float constant as a GLSL literal
fn write_float_literal(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 && value.abs() < 1.0e15 { write!(f, "{value:.1}") } else { write!(f, "{value:?}") }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_ref() {
            ExprNode::Variable(variable) => f.write_str(&variable.name),
            ExprNode::Constant(value) => write_float_literal(f, *value),
            ExprNode::Apply { func, args } => func.print(f, args),
            ExprNode::ApplyVar { func, args } => {
                let args: Vec<Expr> = args.iter().cloned().map(Expr::variable).collect();
                func.print(f, &args)
            }
        }
    }
}

/// A side effect on the environment
#[derive(Debug, Clone)]
pub enum Statement {
    /// Evaluates `value` and binds it to `variable`
    Variable { variable: VariableP, value: Expr, is_declaration: bool },
    Compound(Vec<Statement>),
}

impl Statement {
    pub fn declaration(variable: VariableP, value: Expr) -> Statement {
        Statement::Variable {
            variable,
            value,
            is_declaration: true,
        }
    }

    pub fn assignment(variable: VariableP, value: Expr) -> Statement {
        Statement::Variable {
            variable,
            value,
            is_declaration: false,
        }
    }

    pub fn execute(&self, ctx: &mut EvalContext) {
        match self {
            Statement::Variable { variable, value, .. } => {
                let result = value.evaluate(ctx);
                ctx.env.bind(variable, result);
            }
            Statement::Compound(statements) => statements.iter().for_each(|statement| statement.execute(ctx)),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Variable {
                variable,
                value,
                is_declaration: true,
            } => writeln!(f, "{} {} = {};", variable.ty, variable.name, value),
            Statement::Variable { variable, value, .. } => writeln!(f, "{} = {};", variable.name, value),
            Statement::Compound(statements) => statements.iter().try_for_each(|statement| write!(f, "{statement}")),
        }
    }
}

/// Collects the statements of a derived function body while it is being expanded
#[derive(Debug, Default)]
pub struct ExpandContext {
    scope: Scope,
    statements: Vec<Statement>,
    sym_counter: usize,
}

impl ExpandContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parameter or temporary variable in this body's scope
    pub fn variable(&mut self, name: impl Into<String>, ty: ValueType) -> VariableP {
        self.scope.variable(name, ty)
    }

    /// Creates a fresh uniquely named temporary
    pub fn gen_sym(&mut self, base: &str, ty: ValueType) -> VariableP {
        let name = format!("{base}{}", self.sym_counter);
        self.sym_counter += 1;
        self.scope.variable(name, ty)
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Evaluates `expr` once into a new temporary and returns a reference to it
    pub fn bind_expression(&mut self, base: &str, expr: Expr) -> Expr {
        let variable = self.gen_sym(base, expr.ty());
        self.add_statement(Statement::declaration(variable.clone(), expr));
        Expr::variable(variable)
    }

    /// Returns the collected statements and the number of slots the body needs
    pub fn finish(self) -> (Vec<Statement>, usize) {
        (self.statements, self.scope.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::builders::{constant, var};

    #[test]
    fn test_environment_bind_lookup() {
        let mut scope = Scope::new();
        let x = scope.variable("x", ValueType::FLOAT);
        let mut env = scope.environment();
        env.bind(&x, IVal::Scalar(Interval::point(3.0)));
        assert_eq!(env.lookup(&x).as_scalar(), Interval::point(3.0));
    }

    #[test]
    #[should_panic(expected = "is not bound")]
    fn test_unbound_lookup_panics() {
        let mut scope = Scope::new();
        let x = scope.variable("x", ValueType::FLOAT);
        let env = scope.environment();
        env.lookup(&x);
    }

    #[test]
    fn test_statement_execute_and_print() {
        let mut scope = Scope::new();
        let x = scope.variable("x", ValueType::FLOAT);
        let y = scope.variable("y", ValueType::FLOAT);
        let statement = Statement::declaration(y.clone(), var(&x) + constant(1.0));
        assert_eq!(statement.to_string(), "float y = (x + 1.0);\n");

        let format = FloatFormat::highp();
        let mut ctx = EvalContext::new(&format, Precision::Highp, scope.environment());
        ctx.env.bind(&x, IVal::Scalar(Interval::point(2.0)));
        statement.execute(&mut ctx);
        assert_eq!(ctx.env.lookup(&y).as_scalar(), Interval::point(3.0));
    }

    #[test]
    fn test_bind_expression_allocates_slots() {
        let mut ctx = ExpandContext::new();
        let x = ctx.variable("x", ValueType::FLOAT);
        let bound = ctx.bind_expression("tmp", var(&x) * var(&x));
        assert_eq!(bound.to_string(), "tmp0");
        let (statements, slots) = ctx.finish();
        assert_eq!(statements.len(), 1);
        assert_eq!(slots, 2);
    }

    #[test]
    fn test_constant_literals() {
        assert_eq!(constant(2.0).to_string(), "2.0");
        assert_eq!(constant(0.5).to_string(), "0.5");
        assert_eq!(constant(-3.0).to_string(), "-3.0");
    }
}
