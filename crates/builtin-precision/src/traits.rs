//! Shape-generic operations over values and interval values
//!
//! Every operation dispatches on [`ValueType`] with one exhaustive match and recurses
//! into the component type for vectors and matrices. No other module inspects shapes
//! element by element.

use crate::float_format::FloatFormat;
use crate::interval::Interval;
use crate::value::{IVal, ScalarType, Value, ValueType};

impl ValueType {
    /// Builds the degenerate interval value of a concrete value
    pub fn make_interval(&self, value: &Value) -> IVal {
        match self {
            ValueType::Scalar(_) => IVal::Scalar(Interval::point(value.as_f64())),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                IVal::Composite(value.components().iter().map(|component| component_type.make_interval(component)).collect())
            }
        }
    }

    /// An interval value of this shape with every slot empty
    pub fn empty_interval(&self) -> IVal {
        match self {
            ValueType::Scalar(_) => IVal::Scalar(Interval::empty()),
            ValueType::Vector(..) | ValueType::Matrix { .. } => IVal::Composite(vec![self.component_type().empty_interval(); self.size()]),
        }
    }

    /// Slot-wise union
    pub fn union(&self, a: &IVal, b: &IVal) -> IVal {
        match self {
            ValueType::Scalar(_) => IVal::Scalar(a.as_scalar() | b.as_scalar()),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                IVal::Composite((0..self.size()).map(|i| component_type.union(a.component(i), b.component(i))).collect())
            }
        }
    }

    /// True if every slot of `value` lies in the matching slot of `ival`
    pub fn contains(&self, ival: &IVal, value: &Value) -> bool {
        match self {
            ValueType::Scalar(_) => ival.as_scalar().contains(value.as_f64()),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                (0..self.size()).all(|i| component_type.contains(ival.component(i), value.component(i)))
            }
        }
    }

    /// Converts an exact interval value into the values `format` may hold for it
    ///
    /// Integer and boolean slots are exact and pass through unchanged.
    pub fn convert(&self, format: &FloatFormat, ival: &IVal) -> IVal {
        match self {
            ValueType::Scalar(ScalarType::Float) => IVal::Scalar(format.convert(&ival.as_scalar())),
            ValueType::Scalar(_) => ival.clone(),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                IVal::Composite((0..self.size()).map(|i| component_type.convert(format, ival.component(i))).collect())
            }
        }
    }

    /// Rounds a concrete value outward to `format`, yielding both neighbouring representable values
    pub fn round(&self, format: &FloatFormat, value: &Value) -> IVal {
        match self {
            ValueType::Scalar(ScalarType::Float) => {
                let x = value.as_f64();
                IVal::Scalar(Interval::new(format.round(x, false), format.round(x, true)))
            }
            ValueType::Scalar(_) => self.make_interval(value),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                IVal::Composite(value.components().iter().map(|component| component_type.round(format, component)).collect())
            }
        }
    }

    /// Rebuilds an interval value of this shape from its scalar slots in column-major order
    pub fn ival_from_scalars(&self, scalars: &[Interval]) -> IVal {
        match self {
            ValueType::Scalar(_) => IVal::Scalar(scalars[0]),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                let stride = component_type.scalar_count();
                IVal::Composite((0..self.size()).map(|i| component_type.ival_from_scalars(&scalars[i * stride..])).collect())
            }
        }
    }

    /// True if `value` has exactly this shape
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Scalar(ScalarType::Float), Value::Float(_)) => true,
            (ValueType::Scalar(ScalarType::Int), Value::Int(_)) => true,
            (ValueType::Scalar(ScalarType::Bool), Value::Bool(_)) => true,
            (ValueType::Vector(..) | ValueType::Matrix { .. }, Value::Composite(components)) => {
                let component_type = self.component_type();
                components.len() == self.size() && components.iter().all(|component| component_type.accepts(component))
            }
            _ => false,
        }
    }

    /// Renders a concrete value, floats in both hexadecimal and decimal notation
    pub fn print_value(&self, format: &FloatFormat, value: &Value) -> String {
        match self {
            ValueType::Scalar(ScalarType::Float) => {
                let x = value.as_f64();
                format!("{} / {}", format.float_to_hex(x), x)
            }
            ValueType::Scalar(ScalarType::Int) => value.as_f64().to_string(),
            ValueType::Scalar(ScalarType::Bool) => (value.as_f64() != 0.0).to_string(),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                let components: Vec<String> = value.components().iter().map(|component| component_type.print_value(format, component)).collect();
                format!("{}({})", self.glsl_name(), components.join(", "))
            }
        }
    }

    /// Renders an interval value; float bounds use the format's hexadecimal notation
    pub fn print_interval(&self, format: &FloatFormat, ival: &IVal) -> String {
        match self {
            ValueType::Scalar(ScalarType::Float) => format.interval_to_hex(&ival.as_scalar()),
            ValueType::Scalar(_) => ival.as_scalar().to_string(),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                let components: Vec<String> = (0..self.size()).map(|i| component_type.print_interval(format, ival.component(i))).collect();
                format!("({})", components.join(", "))
            }
        }
    }

    /// Appends the 32-bit words of `value` in column-major order
    pub fn flatten(&self, value: &Value, out: &mut Vec<u32>) {
        match self {
            ValueType::Scalar(ScalarType::Float) => out.push(value.as_f32().to_bits()),
            ValueType::Scalar(ScalarType::Int) => out.push(match value {
                Value::Int(x) => *x as u32,
                other => other.as_f64() as i32 as u32,
            }),
            ValueType::Scalar(ScalarType::Bool) => out.push(u32::from(value.as_f64() != 0.0)),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                value.components().iter().for_each(|component| component_type.flatten(component, out));
            }
        }
    }

    /// Reads a value of this shape from the front of `words`, the inverse of [`ValueType::flatten`]
    ///
    /// # Panics
    /// Panics if `words` holds fewer than [`ValueType::scalar_count`] words.
    pub fn unflatten(&self, words: &[u32]) -> Value {
        match self {
            ValueType::Scalar(ScalarType::Float) => Value::Float(f32::from_bits(words[0])),
            ValueType::Scalar(ScalarType::Int) => Value::Int(words[0] as i32),
            ValueType::Scalar(ScalarType::Bool) => Value::Bool(words[0] != 0),
            ValueType::Vector(..) | ValueType::Matrix { .. } => {
                let component_type = self.component_type();
                let stride = component_type.scalar_count();
                Value::Composite((0..self.size()).map(|i| component_type.unflatten(&words[i * stride..])).collect())
            }
        }
    }
}
