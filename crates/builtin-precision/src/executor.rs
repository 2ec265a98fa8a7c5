//! Shader executor boundary
//!
//! A [`ShaderExecutor`] compiles a [`ShaderSpec`] and runs it over a batch of input
//! values. Values cross the boundary as flat 32-bit words, one buffer per symbol, each
//! value laid out column-major by [`ValueType::flatten`].

use std::fmt;

use serde::Deserialize;

use crate::error::ExecutorError;
use crate::float_format::Precision;
use crate::value::{Value, ValueType};

/// Shader stage a case runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderType {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderType {
    pub const ALL: [ShaderType; 3] = [ShaderType::Vertex, ShaderType::Fragment, ShaderType::Compute];

    pub fn name(&self) -> &'static str {
        match self {
            ShaderType::Vertex => "vertex",
            ShaderType::Fragment => "fragment",
            ShaderType::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed shader input or output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: ValueType,
    pub precision: Precision,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: ValueType, precision: Precision) -> Self {
        Self { name: name.into(), ty, precision }
    }

    /// GLSL declaration without a storage qualifier, e.g. `highp vec3 in0`
    pub fn declaration(&self) -> String {
        format!("{} {} {}", self.precision, self.ty.glsl_name(), self.name)
    }
}

/// Everything an executor needs to build a program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderSpec {
    pub inputs: Vec<Symbol>,
    pub outputs: Vec<Symbol>,
    /// Helper function definitions placed before the entry point
    pub global_declarations: String,
    /// Statements assigning the outputs from the inputs
    pub source: String,
}

/// A compiled program that evaluates a [`ShaderSpec`]
pub trait ShaderExecutor {
    /// Whether compilation and linking succeeded
    fn is_ok(&self) -> bool;

    /// Compiler diagnostics, empty when there are none
    fn info_log(&self) -> String;

    /// Makes the program current; a no-op for executors without bound program state
    fn use_program(&mut self) {}

    /// Runs the program for `num_values` input rows
    ///
    /// `inputs` holds one flattened buffer per input symbol; the result holds one flattened
    /// buffer per output symbol.
    fn execute(&mut self, num_values: usize, inputs: &[Vec<u32>]) -> Result<Vec<Vec<u32>>, ExecutorError>;
}

/// Creates executors for the stages it supports
pub trait ExecutorFactory {
    fn supports(&self, shader_type: ShaderType) -> bool;

    fn create_executor(&mut self, shader_type: ShaderType, spec: &ShaderSpec) -> Result<Box<dyn ShaderExecutor>, ExecutorError>;
}

/// Flattens one column of values into a single word buffer
pub fn flatten_column(ty: ValueType, values: &[Value]) -> Vec<u32> {
    let mut words = Vec::with_capacity(values.len() * ty.scalar_count());
    for value in values {
        ty.flatten(value, &mut words);
    }
    words
}

/// Splits a word buffer back into `num_values` values
pub fn unflatten_column(ty: ValueType, words: &[u32], num_values: usize) -> Result<Vec<Value>, ExecutorError> {
    let stride = ty.scalar_count();
    if words.len() < num_values * stride {
        return Err(ExecutorError::BufferSize(0, num_values * stride, words.len()));
    }
    Ok(words.chunks_exact(stride).take(num_values).map(|chunk| ty.unflatten(chunk)).collect())
}

/// Checks that every input buffer holds `num_values` values of its symbol's type
pub fn check_input_sizes(symbols: &[Symbol], num_values: usize, inputs: &[Vec<u32>]) -> Result<(), ExecutorError> {
    for (index, (symbol, words)) in symbols.iter().zip(inputs).enumerate() {
        let expected = num_values * symbol.ty.scalar_count();
        if words.len() != expected {
            return Err(ExecutorError::BufferSize(index, expected, words.len()));
        }
    }
    Ok(())
}
