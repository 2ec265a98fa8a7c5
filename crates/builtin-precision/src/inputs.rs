//! Input tuple generation
//!
//! Every combination of the argument samplings' fixed values is generated first, then
//! random tuples until the requested count, skipping duplicates.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::float_format::{FloatFormat, Precision};
use crate::sampling::sampling_for;
use crate::value::{Value, ValueType};

/// Seed mixed into every per-case random generator
pub const INPUT_SEED: u64 = 0xdeadbeef;

/// Generated input values, one column per argument
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    pub columns: Vec<Vec<Value>>,
}

impl Inputs {
    pub fn new(arity: usize) -> Self {
        Self { columns: vec![Vec::new(); arity] }
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Number of input tuples
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one tuple
    ///
    /// # Panics
    /// Panics if the tuple does not have one value per argument.
    pub fn push(&mut self, tuple: Vec<Value>) {
        assert_eq!(tuple.len(), self.arity(), "Input tuple has the wrong arity");
        for (column, value) in self.columns.iter_mut().zip(tuple) {
            column.push(value);
        }
    }

    /// The values of tuple `index`, one per argument
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|column| &column[index]).collect()
    }
}

/// Identity of a tuple for duplicate detection: all NaNs are equal, as are both zeros
fn tuple_key(types: &[ValueType], tuple: &[Value]) -> Vec<u32> {
    let mut words = Vec::new();
    for (ty, value) in types.iter().zip(tuple) {
        let start = words.len();
        ty.flatten(value, &mut words);
        if ty.is_float() {
            for word in &mut words[start..] {
                let x = f32::from_bits(*word);
                if x.is_nan() {
                    *word = f32::NAN.to_bits();
                } else if x == 0.0 {
                    *word = 0;
                }
            }
        }
    }
    words
}

/// Number of random tuples to draw for arguments of `types`
pub fn num_samples(types: &[ValueType], num_randoms: usize) -> usize {
    let weight: f64 = types.iter().map(|&ty| sampling_for(ty).weight()).product();
    (num_randoms as f64 * weight).round() as usize
}

/// Generates the inputs of a function taking arguments of `types`
///
/// The same `base_seed` always yields the same sequence.
pub fn generate_inputs(types: &[ValueType], format: &FloatFormat, precision: Precision, num_randoms: usize, base_seed: u64) -> Inputs {
    let samplings: Vec<_> = types.iter().map(|&ty| sampling_for(ty)).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(INPUT_SEED.wrapping_add(base_seed));
    let mut inputs = Inputs::new(types.len());
    let mut seen = HashSet::new();

    let fixeds: Vec<Vec<Value>> = samplings
        .iter()
        .map(|sampling| {
            let mut values = Vec::new();
            sampling.gen_fixeds(format, &mut values);
            values
        })
        .collect();

    // cross product of the fixed catalogues, first argument varying slowest
    let mut tuples: Vec<Vec<Value>> = vec![Vec::new()];
    for values in &fixeds {
        tuples = tuples.into_iter().flat_map(|prefix| values.iter().map(move |value| [prefix.clone(), vec![value.clone()]].concat())).collect();
    }
    for tuple in tuples {
        if seen.insert(tuple_key(types, &tuple)) {
            inputs.push(tuple);
        }
    }

    let fixed_count = inputs.len();
    for _ in 0..num_samples(types, num_randoms) {
        let tuple: Vec<Value> = samplings.iter().map(|sampling| sampling.gen_random(format, precision, &mut rng)).collect();
        if seen.insert(tuple_key(types, &tuple)) {
            inputs.push(tuple);
        }
    }

    tracing::debug!(fixed = fixed_count, random = inputs.len() - fixed_count, "Generated inputs");
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_cross_product() {
        let format = FloatFormat::highp();
        let inputs = generate_inputs(&[ValueType::FLOAT, ValueType::FLOAT], &format, Precision::Highp, 0, 0);
        assert_eq!(inputs.arity(), 2);
        assert_eq!(inputs.len(), 400);
        assert!(inputs.row(0)[0].as_f32().is_nan());
        assert!(inputs.row(0)[1].as_f32().is_nan());
    }

    #[test]
    fn test_generation_is_reproducible() {
        let format = FloatFormat::mediump();
        let a = generate_inputs(&[ValueType::vec(2)], &format, Precision::Mediump, 64, 5);
        let b = generate_inputs(&[ValueType::vec(2)], &format, Precision::Mediump, 64, 5);
        let c = generate_inputs(&[ValueType::vec(2)], &format, Precision::Mediump, 64, 6);
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
        assert_ne!(format!("{a:?}"), format!("{c:?}"));
    }

    #[test]
    fn test_no_duplicate_tuples() {
        let format = FloatFormat::lowp();
        let inputs = generate_inputs(&[ValueType::BOOL], &format, Precision::Lowp, 100, 0);
        assert_eq!(inputs.len(), 2);

        let ints = generate_inputs(&[ValueType::INT], &format, Precision::Lowp, 1000, 0);
        let keys: HashSet<_> = ints.columns[0].iter().map(|value| tuple_key(&[ValueType::INT], std::slice::from_ref(value))).collect();
        assert_eq!(keys.len(), ints.len());
    }

    #[test]
    fn test_signed_zeros_and_nans_collapse() {
        let a = tuple_key(&[ValueType::FLOAT], &[Value::Float(-0.0)]);
        let b = tuple_key(&[ValueType::FLOAT], &[Value::Float(0.0)]);
        assert_eq!(a, b);
        let nan = f32::from_bits(0x7fc0_0001);
        assert_eq!(tuple_key(&[ValueType::FLOAT], &[Value::Float(nan)]), tuple_key(&[ValueType::FLOAT], &[Value::Float(f32::NAN)]));
    }

    #[test]
    fn test_random_sample_count() {
        let format = FloatFormat::highp();
        assert_eq!(num_samples(&[ValueType::FLOAT], 100), 100);
        let inputs = generate_inputs(&[ValueType::FLOAT], &format, Precision::Highp, 100, 0);
        assert!(inputs.len() > 20);
        assert!(inputs.len() <= 120);
    }
}
