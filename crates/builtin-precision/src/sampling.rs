//! Test value sampling
//!
//! Each shape has a [`Sampling`] strategy producing a catalogue of boundary values and
//! random values distributed over the whole range of a format. [`sampling_for`] picks
//! the strategy of a [`ValueType`].

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::float_format::{FloatFormat, Precision, YesNoMaybe, ldexp};
use crate::value::{ScalarType, Value, ValueType};

/// Generator of test values for one shape
pub trait Sampling {
    /// Appends the fixed catalogue of interesting values
    fn gen_fixeds(&self, format: &FloatFormat, out: &mut Vec<Value>);

    /// Draws one random value
    fn gen_random(&self, format: &FloatFormat, precision: Precision, rng: &mut ChaCha8Rng) -> Value;

    /// Relative importance, used to size random sampling
    fn weight(&self) -> f64 {
        1.0
    }
}

/// Returns the default sampling strategy for `ty`
pub fn sampling_for(ty: ValueType) -> Box<dyn Sampling> {
    match ty {
        ValueType::Scalar(ScalarType::Float) => Box::new(FloatSampling),
        ValueType::Scalar(ScalarType::Int) => Box::new(IntSampling),
        ValueType::Scalar(ScalarType::Bool) => Box::new(BoolSampling),
        ValueType::Vector(scalar, size) => Box::new(VectorSampling {
            element: sampling_for(ValueType::Scalar(scalar)),
            size,
        }),
        ValueType::Matrix { cols, rows } => Box::new(MatrixSampling { cols, rows }),
    }
}

pub struct FloatSampling;

impl Sampling for FloatSampling {
    fn gen_fixeds(&self, format: &FloatFormat, out: &mut Vec<Value>) {
        let min_quantum = ldexp(1.0, format.min_exp - format.fraction_bits);
        let min_normal = ldexp(1.0, format.min_exp);
        let max_quantum = ldexp(1.0, format.max_exp - format.fraction_bits);
        let largest = ldexp(1.0, format.max_exp) + (ldexp(1.0, format.max_exp) - max_quantum);

        out.push(Value::Float(f32::NAN));
        out.push(Value::Float(0.0));

        for sign in [-1.0, 1.0] {
            for magnitude in [
                // smallest and largest subnormal
                min_quantum,
                min_normal - min_quantum,
                // smallest and next smallest normal
                min_normal,
                min_normal + min_quantum,
                0.5,
                1.0,
                2.0,
                largest,
                f64::INFINITY,
            ] {
                out.push(Value::Float((sign * magnitude) as f32));
            }
        }
    }

    fn gen_random(&self, format: &FloatFormat, _precision: Precision, rng: &mut ChaCha8Rng) -> Value {
        let have_subnormal = format.has_subnormal != YesNoMaybe::No;

        // a cubic cumulative distribution of exponents peaks around zero
        let min_root = (f64::from(format.min_exp) - 0.5 - if have_subnormal { 1.0 } else { 0.0 }).cbrt();
        let max_root = (f64::from(format.max_exp) + 0.5).cbrt();
        let exp = rng.gen_range(min_root..max_root).powi(3).round_ties_even() as i32;

        match rng.gen_range(0..=64) {
            0 => return Value::Float(0.0),
            1 => return Value::Float(f32::INFINITY),
            2 => return Value::Float(f32::NEG_INFINITY),
            3 => return Value::Float(f32::NAN),
            _ => {}
        }

        let (base, quantum) = if exp >= format.min_exp {
            (ldexp(1.0, exp), ldexp(1.0, exp - format.fraction_bits))
        } else {
            // subnormal
            (0.0, ldexp(1.0, format.min_exp - format.fraction_bits))
        };

        let significand = match rng.gen_range(0..=16) {
            // all fraction bits set
            0 => base - quantum,
            1 => quantum,
            2 => 0.0,
            _ => {
                let fraction = rng.r#gen::<u64>() & ((1u64 << format.fraction_bits) - 1);
                fraction as f64 * quantum
            }
        };

        // positive numbers are more common
        let sign = if rng.gen_range(0..=3) == 0 { -1.0 } else { 1.0 };
        Value::Float((sign * (base + significand)) as f32)
    }
}

pub struct IntSampling;

impl Sampling for IntSampling {
    fn gen_fixeds(&self, _format: &FloatFormat, out: &mut Vec<Value>) {
        out.extend([Value::Int(0), Value::Int(-1), Value::Int(1)]);
    }

    fn gen_random(&self, _format: &FloatFormat, precision: Precision, rng: &mut ChaCha8Rng) -> Value {
        let exp = rng.gen_range(0..=precision.int_bits() - 2);
        let sign = if rng.r#gen::<bool>() { -1 } else { 1 };
        Value::Int(sign * rng.gen_range(0..=(1i32 << exp)))
    }
}

pub struct BoolSampling;

impl Sampling for BoolSampling {
    fn gen_fixeds(&self, _format: &FloatFormat, out: &mut Vec<Value>) {
        out.extend([Value::Bool(true), Value::Bool(false)]);
    }

    fn gen_random(&self, _format: &FloatFormat, _precision: Precision, rng: &mut ChaCha8Rng) -> Value {
        Value::Bool(rng.r#gen())
    }
}

/// Vectors: broadcast scalar fixeds, random per component
pub struct VectorSampling {
    element: Box<dyn Sampling>,
    size: usize,
}

impl Sampling for VectorSampling {
    fn gen_fixeds(&self, format: &FloatFormat, out: &mut Vec<Value>) {
        let mut scalars = Vec::new();
        self.element.gen_fixeds(format, &mut scalars);
        out.extend(scalars.into_iter().map(|scalar| Value::Composite(vec![scalar; self.size])));
    }

    fn gen_random(&self, format: &FloatFormat, precision: Precision, rng: &mut ChaCha8Rng) -> Value {
        Value::Composite((0..self.size).map(|_| self.element.gen_random(format, precision, rng)).collect())
    }

    fn weight(&self) -> f64 {
        self.element.weight().powi(self.size as i32)
    }
}

/// Float matrices: scalar fixeds on the diagonal, plus an anti-diagonal of powers of two
/// for square shapes
pub struct MatrixSampling {
    cols: usize,
    rows: usize,
}

impl MatrixSampling {
    fn matrix(&self, mut element: impl FnMut(usize, usize) -> f32) -> Value {
        Value::Composite((0..self.cols).map(|col| Value::Composite((0..self.rows).map(|row| Value::Float(element(col, row))).collect())).collect())
    }
}

impl Sampling for MatrixSampling {
    fn gen_fixeds(&self, format: &FloatFormat, out: &mut Vec<Value>) {
        let mut scalars = Vec::new();
        FloatSampling.gen_fixeds(format, &mut scalars);
        for scalar in scalars {
            let diagonal = scalar.as_f32();
            out.push(self.matrix(|col, row| if col == row { diagonal } else { 0.0 }));
        }

        if self.cols == self.rows {
            let size = self.cols;
            out.push(self.matrix(|col, row| {
                if col == 0 && row == 0 {
                    1.0
                } else if col + row == size - 1 {
                    ldexp(1.0, row as i32) as f32
                } else {
                    0.0
                }
            }));
        }
    }

    fn gen_random(&self, format: &FloatFormat, precision: Precision, rng: &mut ChaCha8Rng) -> Value {
        let columns = (0..self.cols).map(|_| Value::Composite((0..self.rows).map(|_| FloatSampling.gen_random(format, precision, rng)).collect())).collect();
        Value::Composite(columns)
    }

    fn weight(&self) -> f64 {
        FloatSampling.weight().powi((self.cols * self.rows) as i32)
    }
}
