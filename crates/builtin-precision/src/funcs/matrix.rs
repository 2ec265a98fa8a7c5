//! Matrix functions derived from arithmetic primitives
//!
//! Matrices are column-major: `m[c][r]` is the element in column `c`, row `r`.

use std::fmt;

use crate::expr::{ExpandContext, Expr};
use crate::funcs::builders::{determinant, mat, vec};
use crate::funcs::derived::DerivedFunc;
use crate::funcs::{Signature, write_infix};
use crate::value::ValueType;

/// Left-to-right sum of `terms(0) + terms(1) + ...`
fn sum(count: usize, mut term: impl FnMut(usize) -> Expr) -> Expr {
    (1..count).fold(term(0), |acc, i| acc + term(i))
}

/// The submatrix of the square matrix `m` without one row and one column
fn minor(m: &Expr, size: usize, skip_row: usize, skip_col: usize) -> Expr {
    let columns = (0..size)
        .filter(|&col| col != skip_col)
        .map(|col| vec((0..size).filter(|&row| row != skip_row).map(|row| m.index(col).index(row)).collect()))
        .collect();
    mat(columns)
}

pub struct Determinant {
    size: usize,
}

impl Determinant {
    pub fn new(size: usize) -> Self {
        assert!((2..=4).contains(&size), "No determinant for {size}x{size} matrices");
        Self { size }
    }
}

impl DerivedFunc for Determinant {
    fn name(&self) -> String {
        "determinant".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::FLOAT, vec![ValueType::mat(self.size, self.size)])
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let m = &args[0];
        let at = |col: usize, row: usize| m.index(col).index(row);

        match self.size {
            2 => at(0, 0) * at(1, 1) - at(1, 0) * at(0, 1),
            3 => {
                at(0, 0) * (at(1, 1) * at(2, 2) - at(1, 2) * at(2, 1))
                    + at(0, 1) * (at(1, 2) * at(2, 0) - at(1, 0) * at(2, 2))
                    + at(0, 2) * (at(1, 0) * at(2, 1) - at(1, 1) * at(2, 0))
            }
            _ => {
                // Laplace expansion along the first row
                let minors: Vec<Expr> = (0..4).map(|col| ctx.bind_expression("minor", minor(m, 4, 0, col))).collect();
                at(0, 0) * determinant(minors[0].clone()) - at(1, 0) * determinant(minors[1].clone()) + at(2, 0) * determinant(minors[2].clone())
                    - at(3, 0) * determinant(minors[3].clone())
            }
        }
    }
}

pub struct Inverse {
    size: usize,
}

impl Inverse {
    pub fn new(size: usize) -> Self {
        assert!((2..=4).contains(&size), "No inverse for {size}x{size} matrices");
        Self { size }
    }
}

impl DerivedFunc for Inverse {
    fn name(&self) -> String {
        "inverse".to_string()
    }

    fn signature(&self) -> Signature {
        let ty = ValueType::mat(self.size, self.size);
        Signature::new(ty, vec![ty])
    }

    fn expand(&self, ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let m = &args[0];
        let det = ctx.bind_expression("det", determinant(m.clone()));

        if self.size == 2 {
            let at = |col: usize, row: usize| m.index(col).index(row);
            return mat(vec![
                vec(vec![at(1, 1) / det.clone(), -at(0, 1) / det.clone()]),
                vec(vec![-at(1, 0) / det.clone(), at(0, 0) / det.clone()]),
            ]);
        }

        // adjugate: element (row r, column c) is the cofactor of (c, r) over the determinant
        let columns = (0..self.size)
            .map(|col| {
                let components = (0..self.size)
                    .map(|row| {
                        let cofactor = determinant(minor(m, self.size, col, row));
                        let signed = if (row + col) % 2 == 0 { cofactor } else { -cofactor };
                        signed / det.clone()
                    })
                    .collect();
                vec(components)
            })
            .collect();
        mat(columns)
    }
}

/// Linear-algebra product of two matrices
pub struct MatMul {
    left_cols: usize,
    left_rows: usize,
    right_cols: usize,
}

impl MatMul {
    /// `mat(left_cols x left_rows) * mat(right_cols x left_cols)`
    pub fn new(left_cols: usize, left_rows: usize, right_cols: usize) -> Self {
        Self { left_cols, left_rows, right_cols }
    }
}

impl DerivedFunc for MatMul {
    fn name(&self) -> String {
        "mul".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(
            ValueType::mat(self.right_cols, self.left_rows),
            vec![ValueType::mat(self.left_cols, self.left_rows), ValueType::mat(self.right_cols, self.left_cols)],
        )
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (a, b) = (&args[0], &args[1]);
        let columns = (0..self.right_cols)
            .map(|col| vec((0..self.left_rows).map(|row| sum(self.left_cols, |k| a.index(k).index(row) * b.index(col).index(k))).collect()))
            .collect();
        mat(columns)
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "*", args)
    }
}

/// `mat * vec`: the vector is a column
pub struct MatVecMul {
    cols: usize,
    rows: usize,
}

impl MatVecMul {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }
}

impl DerivedFunc for MatVecMul {
    fn name(&self) -> String {
        "mul".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.rows), vec![ValueType::mat(self.cols, self.rows), ValueType::vec(self.cols)])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (m, v) = (&args[0], &args[1]);
        vec((0..self.rows).map(|row| sum(self.cols, |k| m.index(k).index(row) * v.index(k))).collect())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "*", args)
    }
}

/// `vec * mat`: the vector is a row
pub struct VecMatMul {
    cols: usize,
    rows: usize,
}

impl VecMatMul {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }
}

impl DerivedFunc for VecMatMul {
    fn name(&self) -> String {
        "mul".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::vec(self.cols), vec![ValueType::vec(self.rows), ValueType::mat(self.cols, self.rows)])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (v, m) = (&args[0], &args[1]);
        vec((0..self.cols).map(|col| sum(self.rows, |k| v.index(k) * m.index(col).index(k))).collect())
    }

    fn print(&self, f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
        write_infix(f, "*", args)
    }
}

/// `outerProduct(c, r)`: `c` gives the rows, `r` the columns
pub struct OuterProduct {
    cols: usize,
    rows: usize,
}

impl OuterProduct {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }
}

impl DerivedFunc for OuterProduct {
    fn name(&self) -> String {
        "outerProduct".to_string()
    }

    fn signature(&self) -> Signature {
        Signature::new(ValueType::mat(self.cols, self.rows), vec![ValueType::vec(self.rows), ValueType::vec(self.cols)])
    }

    fn expand(&self, _ctx: &mut ExpandContext, args: &[Expr]) -> Expr {
        let (c, r) = (&args[0], &args[1]);
        mat((0..self.cols).map(|col| vec((0..self.rows).map(|row| c.index(row) * r.index(col)).collect())).collect())
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
    use crate::value::{IVal, Value};

    fn matrix(columns: &[&[f32]]) -> IVal {
        let value = Value::mat(columns);
        let ty = ValueType::mat(columns.len(), columns[0].len());
        ty.make_interval(&value)
    }

    fn context(format: &FloatFormat) -> EvalContext<'_> {
        EvalContext::new(format, Precision::Highp, Environment::new(0))
    }

    #[test]
    fn test_determinant_2x2() {
        let det = Derived::new(Determinant::new(2));
        assert_eq!(det.body_source(), "return ((a[0][0] * a[1][1]) - (a[1][0] * a[0][1]));\n");

        let format = FloatFormat::highp();
        let ret = det.apply(&context(&format), &[matrix(&[&[1.0, 2.0], &[3.0, 4.0]])]).as_scalar();
        assert!(ret.contains(-2.0));
        assert!(ret.width() < 1.0e-5);
    }

    #[test]
    fn test_determinant_3x3_and_4x4() {
        let format = FloatFormat::highp();
        let ctx = context(&format);
        let m3 = matrix(&[&[2.0, 0.0, 0.0], &[0.0, 3.0, 0.0], &[1.0, 0.0, 4.0]]);
        assert!(Derived::new(Determinant::new(3)).apply(&ctx, &[m3]).as_scalar().contains(24.0));

        let m4 = matrix(&[&[1.0, 0.0, 0.0, 0.0], &[0.0, 2.0, 0.0, 0.0], &[0.0, 0.0, 3.0, 0.0], &[5.0, 0.0, 0.0, 4.0]]);
        assert!(Derived::new(Determinant::new(4)).apply(&ctx, &[m4]).as_scalar().contains(24.0));
    }

    #[test]
    fn test_inverse() {
        let format = FloatFormat::highp();
        let ctx = context(&format);
        let inv2 = Derived::new(Inverse::new(2)).apply(&ctx, &[matrix(&[&[4.0, 0.0], &[0.0, 2.0]])]);
        assert!(inv2.component(0).component(0).as_scalar().contains(0.25));
        assert!(inv2.component(1).component(1).as_scalar().contains(0.5));

        // upper triangular: [[1, 2, 0], [0, 1, 0], [0, 0, 2]] in row notation
        let inv3 = Derived::new(Inverse::new(3)).apply(&ctx, &[matrix(&[&[1.0, 0.0, 0.0], &[2.0, 1.0, 0.0], &[0.0, 0.0, 2.0]])]);
        assert!(inv3.component(1).component(0).as_scalar().contains(-2.0));
        assert!(inv3.component(2).component(2).as_scalar().contains(0.5));
        assert!(inv3.component(0).component(1).as_scalar().contains(0.0));
    }

    #[test]
    fn test_products() {
        let format = FloatFormat::highp();
        let ctx = context(&format);
        let a = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let v = IVal::vector([Interval::point(1.0), Interval::point(1.0)]);

        let mv = Derived::new(MatVecMul::new(2, 2)).apply(&ctx, &[a.clone(), v.clone()]);
        assert_eq!(mv.scalars(), vec![Interval::point(4.0), Interval::point(6.0)]);

        let vm = Derived::new(VecMatMul::new(2, 2)).apply(&ctx, &[v, a.clone()]);
        assert_eq!(vm.scalars(), vec![Interval::point(3.0), Interval::point(7.0)]);

        let mm = Derived::new(MatMul::new(2, 2, 2)).apply(&ctx, &[a.clone(), a]);
        assert_eq!(mm.scalars(), vec![Interval::point(7.0), Interval::point(10.0), Interval::point(15.0), Interval::point(22.0)]);
    }

    #[test]
    fn test_outer_product() {
        let format = FloatFormat::highp();
        let ctx = context(&format);
        let c = IVal::vector([Interval::point(1.0), Interval::point(2.0), Interval::point(3.0)]);
        let r = IVal::vector([Interval::point(4.0), Interval::point(5.0)]);
        let outer = Derived::new(OuterProduct::new(2, 3)).apply(&ctx, &[c, r]);
        let lows: Vec<f64> = outer.scalars().iter().map(Interval::lo).collect();
        assert_eq!(lows, vec![4.0, 8.0, 12.0, 5.0, 10.0, 15.0]);
    }
}
