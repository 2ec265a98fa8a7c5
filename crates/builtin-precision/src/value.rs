//! Value shapes, concrete values and interval values
//!
//! [`ValueType`] is the closed set of element shapes the engine understands. Concrete
//! inputs and outputs are [`Value`]s, and their conservative counterparts are [`IVal`]s.
//! The shape-generic operations over these live in [`crate::traits`].

use std::fmt;

use crate::interval::Interval;

/// Scalar element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Float,
    Int,
    Bool,
}

impl ScalarType {
    pub fn glsl_name(&self) -> &'static str {
        match self {
            ScalarType::Float => "float",
            ScalarType::Int => "int",
            ScalarType::Bool => "bool",
        }
    }

    /// Prefix used for vector type names, e.g. `ivec3`
    fn vector_prefix(&self) -> &'static str {
        match self {
            ScalarType::Float => "",
            ScalarType::Int => "i",
            ScalarType::Bool => "b",
        }
    }
}

/// Shape of a value: a scalar, a vector of 2..=4 scalars or a float matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar(ScalarType),
    Vector(ScalarType, usize),
    /// Column-major float matrix with `cols` columns of `rows` components each
    Matrix { cols: usize, rows: usize },
}

impl ValueType {
    pub const FLOAT: ValueType = ValueType::Scalar(ScalarType::Float);
    pub const INT: ValueType = ValueType::Scalar(ScalarType::Int);
    pub const BOOL: ValueType = ValueType::Scalar(ScalarType::Bool);

    /// Float vector of `size` components; a size of 1 yields `float`
    pub fn vec(size: usize) -> ValueType {
        Self::vector_of(ScalarType::Float, size)
    }

    pub fn vector_of(scalar: ScalarType, size: usize) -> ValueType {
        assert!((1..=4).contains(&size), "Invalid vector size {size}");
        if size == 1 { ValueType::Scalar(scalar) } else { ValueType::Vector(scalar, size) }
    }

    pub fn mat(cols: usize, rows: usize) -> ValueType {
        assert!((2..=4).contains(&cols) && (2..=4).contains(&rows), "Invalid matrix shape {cols}x{rows}");
        ValueType::Matrix { cols, rows }
    }

    /// GLSL spelling of the type, e.g. `vec3`, `bvec2`, `mat2`, `mat3x2`
    pub fn glsl_name(&self) -> String {
        match self {
            ValueType::Scalar(scalar) => scalar.glsl_name().to_string(),
            ValueType::Vector(scalar, size) => format!("{}vec{size}", scalar.vector_prefix()),
            ValueType::Matrix { cols, rows } if cols == rows => format!("mat{cols}"),
            ValueType::Matrix { cols, rows } => format!("mat{cols}x{rows}"),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ValueType::Scalar(scalar) | ValueType::Vector(scalar, _) => *scalar,
            ValueType::Matrix { .. } => ScalarType::Float,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, ValueType::Scalar(_))
    }

    pub fn is_float(&self) -> bool {
        self.scalar_type() == ScalarType::Float
    }

    /// Number of direct components: 1 for scalars, the size for vectors, the column count for matrices
    pub fn size(&self) -> usize {
        match self {
            ValueType::Scalar(_) => 1,
            ValueType::Vector(_, size) => *size,
            ValueType::Matrix { cols, .. } => *cols,
        }
    }

    /// Type of each direct component; for a scalar this is the scalar itself
    pub fn component_type(&self) -> ValueType {
        match self {
            ValueType::Scalar(_) => *self,
            ValueType::Vector(scalar, _) => ValueType::Scalar(*scalar),
            ValueType::Matrix { rows, .. } => ValueType::vec(*rows),
        }
    }

    /// Total number of scalar slots
    pub fn scalar_count(&self) -> usize {
        match self {
            ValueType::Scalar(_) => 1,
            ValueType::Vector(_, size) => *size,
            ValueType::Matrix { cols, rows } => cols * rows,
        }
    }

    /// Replaces the scalar kind while keeping the vector shape; matrices are not affected
    pub fn with_scalar(&self, scalar: ScalarType) -> ValueType {
        match self {
            ValueType::Scalar(_) => ValueType::Scalar(scalar),
            ValueType::Vector(_, size) => ValueType::Vector(scalar, *size),
            ValueType::Matrix { .. } => *self,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glsl_name())
    }
}

/// A concrete value as passed to or read back from a shader
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f32),
    Int(i32),
    Bool(bool),
    /// Vector components, or matrix columns (each itself a `Composite` of floats)
    Composite(Vec<Value>),
}

impl Value {
    pub fn vec(components: &[f32]) -> Value {
        Value::Composite(components.iter().copied().map(Value::Float).collect())
    }

    /// Builds a matrix from its columns
    pub fn mat(columns: &[&[f32]]) -> Value {
        Value::Composite(columns.iter().map(|column| Value::vec(column)).collect())
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            Value::Float(value) => *value,
            Value::Int(value) => *value as f32,
            Value::Bool(value) => f32::from(u8::from(*value)),
            Value::Composite(_) => panic!("Composite value used as a scalar"),
        }
    }

    /// Scalar value as an exact real; ints and bools map to their numeric value
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Float(value) => f64::from(*value),
            Value::Int(value) => f64::from(*value),
            Value::Bool(value) => f64::from(u8::from(*value)),
            Value::Composite(_) => panic!("Composite value used as a scalar"),
        }
    }

    pub fn components(&self) -> &[Value] {
        match self {
            Value::Composite(components) => components,
            scalar => std::slice::from_ref(scalar),
        }
    }

    pub fn component(&self, index: usize) -> &Value {
        &self.components()[index]
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Interval counterpart of [`Value`]: one [`Interval`] per scalar slot
///
/// Integers and booleans use intervals over their numeric values (false = 0, true = 1).
#[derive(Debug, Clone, PartialEq)]
pub enum IVal {
    Scalar(Interval),
    Composite(Vec<IVal>),
}

impl IVal {
    /// The scalar interval; panics on composites
    pub fn as_scalar(&self) -> Interval {
        match self {
            IVal::Scalar(interval) => *interval,
            IVal::Composite(_) => panic!("Composite interval value used as a scalar"),
        }
    }

    pub fn components(&self) -> &[IVal] {
        match self {
            IVal::Composite(components) => components,
            scalar => std::slice::from_ref(scalar),
        }
    }

    pub fn component(&self, index: usize) -> &IVal {
        &self.components()[index]
    }

    /// Builds a vector interval value from scalar intervals
    pub fn vector(components: impl IntoIterator<Item = Interval>) -> IVal {
        IVal::Composite(components.into_iter().map(IVal::Scalar).collect())
    }

    /// Applies `body` to every scalar slot, preserving the shape
    pub fn map(&self, body: &mut impl FnMut(&Interval) -> Interval) -> IVal {
        match self {
            IVal::Scalar(interval) => IVal::Scalar(body(interval)),
            IVal::Composite(components) => IVal::Composite(components.iter().map(|component| component.map(body)).collect()),
        }
    }

    /// Collects every scalar slot in column-major order
    pub fn scalars(&self) -> Vec<Interval> {
        let mut out = Vec::new();
        self.collect_scalars(&mut out);
        out
    }

    fn collect_scalars(&self, out: &mut Vec<Interval>) {
        match self {
            IVal::Scalar(interval) => out.push(*interval),
            IVal::Composite(components) => components.iter().for_each(|component| component.collect_scalars(out)),
        }
    }
}

impl From<Interval> for IVal {
    fn from(interval: Interval) -> Self {
        IVal::Scalar(interval)
    }
}

impl fmt::Display for IVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IVal::Scalar(interval) => write!(f, "{interval}"),
            IVal::Composite(components) => {
                write!(f, "(")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{component}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glsl_names() {
        assert_eq!(ValueType::FLOAT.glsl_name(), "float");
        assert_eq!(ValueType::vec(3).glsl_name(), "vec3");
        assert_eq!(ValueType::vector_of(ScalarType::Int, 2).glsl_name(), "ivec2");
        assert_eq!(ValueType::vector_of(ScalarType::Bool, 4).glsl_name(), "bvec4");
        assert_eq!(ValueType::mat(2, 2).glsl_name(), "mat2");
        assert_eq!(ValueType::mat(3, 2).glsl_name(), "mat3x2");
        assert_eq!(ValueType::vec(1), ValueType::FLOAT);
    }

    #[test]
    fn test_shape_queries() {
        let mat = ValueType::mat(3, 4);
        assert_eq!(mat.size(), 3);
        assert_eq!(mat.component_type(), ValueType::vec(4));
        assert_eq!(mat.scalar_count(), 12);
        assert_eq!(ValueType::vec(2).with_scalar(ScalarType::Bool), ValueType::vector_of(ScalarType::Bool, 2));
    }

    #[test]
    fn test_value_components() {
        let matrix = Value::mat(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(matrix.component(1).component(0).as_f32(), 3.0);
        assert_eq!(Value::Float(2.0).components().len(), 1);
        assert_eq!(Value::Bool(true).as_f64(), 1.0);
    }

    #[test]
    fn test_ival_scalars_column_major() {
        let ival = IVal::Composite(vec![IVal::vector([Interval::point(1.0), Interval::point(2.0)]), IVal::vector([Interval::point(3.0), Interval::point(4.0)])]);
        let lows: Vec<f64> = ival.scalars().iter().map(|interval| interval.lo()).collect();
        assert_eq!(lows, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
