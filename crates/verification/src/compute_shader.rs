//! GLSL compute shader generation for precision cases
//!
//! Wraps the statements of a [`ShaderSpec`] in a GLSL 450 compute shader. Every symbol is
//! backed by a storage buffer of raw 32-bit words; the generated entry point rebuilds the
//! typed input values from those words, runs the statements and stores the outputs back.
//!
//! Binding layout (all in set 0):
//! - binding 0: uniform block holding the number of values in the batch
//! - bindings `1..=N`: one read-only word buffer per input
//! - bindings `N+1..`: one word buffer per output

use builtin_precision::value::{ScalarType, ValueType};
use builtin_precision::{ShaderSpec, Symbol};

/// Invocations per workgroup along x
pub const COMPUTE_WORKGROUP_SIZE_X: u32 = 64;

/// Binding index of the parameter uniform block
pub const PARAMS_BINDING: u32 = 0;

/// Binding index of the buffer of input `index`
pub fn input_binding(index: usize) -> u32 {
    1 + index as u32
}

/// Binding index of the buffer of output `index`, given the number of inputs
pub fn output_binding(num_inputs: usize, index: usize) -> u32 {
    1 + (num_inputs + index) as u32
}

fn data_name(symbol: &Symbol) -> String {
    format!("{}_data", symbol.name)
}

/// Expression loading the scalar at word `offset` of the current value
fn load_scalar(symbol: &Symbol, scalar: ScalarType, offset: usize) -> String {
    let word = format!("{}[base_{} + {offset}u]", data_name(symbol), symbol.name);
    match scalar {
        ScalarType::Float => format!("uintBitsToFloat({word})"),
        ScalarType::Int => format!("int({word})"),
        ScalarType::Bool => format!("({word} != 0u)"),
    }
}

/// Expression converting a scalar lvalue to its word representation
fn store_scalar(scalar: ScalarType, lvalue: &str) -> String {
    match scalar {
        ScalarType::Float => format!("floatBitsToUint({lvalue})"),
        ScalarType::Int => format!("uint({lvalue})"),
        ScalarType::Bool => format!("({lvalue} ? 1u : 0u)"),
    }
}

/// Scalar lvalues of a symbol in flattened (column-major) order
fn scalar_lvalues(name: &str, ty: ValueType) -> Vec<String> {
    match ty {
        ValueType::Scalar(_) => vec![name.to_string()],
        ValueType::Vector(_, size) => (0..size).map(|i| format!("{name}[{i}]")).collect(),
        ValueType::Matrix { cols, rows } => (0..cols).flat_map(|c| (0..rows).map(move |r| format!("{name}[{c}][{r}]"))).collect(),
    }
}

/// Local declaration of a symbol; booleans take no precision qualifier
fn declaration(symbol: &Symbol) -> String {
    match symbol.ty.scalar_type() {
        ScalarType::Bool => format!("{} {}", symbol.ty.glsl_name(), symbol.name),
        _ => symbol.declaration(),
    }
}

fn generate_input_load(symbol: &Symbol) -> String {
    let scalar = symbol.ty.scalar_type();
    let count = symbol.ty.scalar_count();
    let mut code = format!("    uint base_{} = idx * {count}u;\n", symbol.name);
    let value = if symbol.ty.is_scalar() {
        load_scalar(symbol, scalar, 0)
    } else {
        // Vector and matrix constructors both take their scalars in column-major order
        let args: Vec<String> = (0..count).map(|offset| load_scalar(symbol, scalar, offset)).collect();
        format!("{}({})", symbol.ty.glsl_name(), args.join(", "))
    };
    code.push_str(&format!("    {} = {value};\n", declaration(symbol)));
    code
}

fn generate_output_store(symbol: &Symbol) -> String {
    let scalar = symbol.ty.scalar_type();
    let count = symbol.ty.scalar_count();
    let mut code = format!("    uint base_{} = idx * {count}u;\n", symbol.name);
    for (offset, lvalue) in scalar_lvalues(&symbol.name, symbol.ty).iter().enumerate() {
        code.push_str(&format!("    {}[base_{} + {offset}u] = {};\n", data_name(symbol), symbol.name, store_scalar(scalar, lvalue)));
    }
    code
}

/// Generates the complete GLSL compute shader evaluating `spec`
///
/// # Arguments
/// * `spec` - Symbols and statements of the case
///
/// # Returns
/// GLSL 450 source with entry point `main`
pub fn generate_compute_shader(spec: &ShaderSpec) -> String {
    let mut source = format!("#version 450\nlayout(local_size_x = {COMPUTE_WORKGROUP_SIZE_X}, local_size_y = 1, local_size_z = 1) in;\n\n");

    source.push_str(&format!("layout(set = 0, binding = {PARAMS_BINDING}) uniform Params {{\n    uint num_values;\n}};\n\n"));
    for (index, symbol) in spec.inputs.iter().enumerate() {
        source.push_str(&format!(
            "layout(std430, set = 0, binding = {}) readonly buffer Input{index} {{\n    uint {}[];\n}};\n",
            input_binding(index),
            data_name(symbol)
        ));
    }
    for (index, symbol) in spec.outputs.iter().enumerate() {
        source.push_str(&format!(
            "layout(std430, set = 0, binding = {}) buffer Output{index} {{\n    uint {}[];\n}};\n",
            output_binding(spec.inputs.len(), index),
            data_name(symbol)
        ));
    }
    source.push('\n');

    if !spec.global_declarations.is_empty() {
        source.push_str(&spec.global_declarations);
        if !spec.global_declarations.ends_with('\n') {
            source.push('\n');
        }
        source.push('\n');
    }

    source.push_str("void main() {\n    uint idx = gl_GlobalInvocationID.x;\n    if (idx >= num_values) {\n        return;\n    }\n\n");
    for symbol in &spec.inputs {
        source.push_str(&generate_input_load(symbol));
    }
    for symbol in &spec.outputs {
        source.push_str(&format!("    {};\n", declaration(symbol)));
    }
    source.push('\n');
    for line in spec.source.lines() {
        source.push_str(&format!("    {line}\n"));
    }
    source.push('\n');
    for symbol in &spec.outputs {
        source.push_str(&generate_output_store(symbol));
    }
    source.push_str("}\n");
    source
}
