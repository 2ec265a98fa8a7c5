//! Precision test cases
//!
//! A [`FuncCase`] checks one builtin at one precision in one shader stage. It advances
//! through [`Phase`]s, one per call to [`TestCase::iterate`]: inputs are generated, the
//! shader is compiled and run, each output is checked against the interval computed for
//! its input, and the tally is reported.

use std::fmt;

use crate::executor::{ExecutorFactory, ShaderExecutor, ShaderSpec, ShaderType, Symbol, check_input_sizes, flatten_column, unflatten_column};
use crate::expr::{EvalContext, Expr, Scope, Statement, VariableP};
use crate::float_format::{FloatFormat, Precision};
use crate::funcs::FuncP;
use crate::inputs::{Inputs, generate_inputs};
use crate::value::Value;

/// Parameters shared by every case of a run
#[derive(Debug, Clone)]
pub struct CaseContext {
    pub name: String,
    /// Format the function is evaluated in
    pub float_format: FloatFormat,
    /// Format used for the final output conversion and for printing
    pub highp_format: FloatFormat,
    pub precision: Precision,
    pub shader_type: ShaderType,
    pub num_randoms: usize,
    pub base_seed: u64,
    /// Maximum number of individual failure messages logged per case
    pub max_messages: usize,
}

impl CaseContext {
    pub fn new(name: impl Into<String>, float_format: FloatFormat, precision: Precision, shader_type: ShaderType) -> Self {
        Self {
            name: name.into(),
            float_format,
            highp_format: FloatFormat::highp(),
            precision,
            shader_type,
            num_randoms: 16384,
            base_seed: 0,
            max_messages: 100,
        }
    }
}

/// Final outcome of a case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Pass(String),
    Fail(String),
    NotSupported(String),
}

impl TestStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, TestStatus::Pass(_))
    }

    pub fn description(&self) -> &str {
        match self {
            TestStatus::Pass(message) | TestStatus::Fail(message) | TestStatus::NotSupported(message) => message,
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Pass(message) => write!(f, "Pass ({message})"),
            TestStatus::Fail(message) => write!(f, "Fail ({message})"),
            TestStatus::NotSupported(message) => write!(f, "NotSupported ({message})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterateResult {
    Continue,
    Stop(TestStatus),
}

/// A leaf of the test tree
pub trait TestCase {
    fn name(&self) -> &str;

    fn description(&self) -> String;

    /// Advances the case by one step
    fn iterate(&mut self, factory: &mut dyn ExecutorFactory) -> IterateResult;

    /// Messages logged so far
    fn log(&self) -> &[String];
}

/// Keeps the first failure reason while every check is still counted
#[derive(Debug, Default)]
pub struct ResultCollector {
    failure: Option<String>,
    num_failures: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure with `message` unless `condition` holds; returns `condition`
    pub fn check(&mut self, condition: bool, message: &str) -> bool {
        if !condition {
            self.fail(message);
        }
        condition
    }

    pub fn fail(&mut self, message: &str) {
        self.num_failures += 1;
        self.failure.get_or_insert_with(|| message.to_string());
    }

    pub fn num_failures(&self) -> usize {
        self.num_failures
    }

    pub fn status(&self, pass_message: &str) -> TestStatus {
        match &self.failure {
            None => TestStatus::Pass(pass_message.to_string()),
            Some(message) => TestStatus::Fail(message.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Compile,
    Execute,
    Verify,
    Report,
    Done,
}

/// Checks `out0 = f(in0, ...)` for one builtin
pub struct FuncCase {
    ctx: CaseContext,
    func: FuncP,
    phase: Phase,
    inputs: Option<Inputs>,
    executor: Option<Box<dyn ShaderExecutor>>,
    outputs: Vec<Value>,
    collector: ResultCollector,
    num_errors: usize,
    messages: Vec<String>,
}

impl FuncCase {
    pub fn new(ctx: CaseContext, func: FuncP) -> Self {
        Self {
            ctx,
            func,
            phase: Phase::Init,
            inputs: None,
            executor: None,
            outputs: Vec::new(),
            collector: ResultCollector::new(),
            num_errors: 0,
            messages: Vec::new(),
        }
    }

    /// Uses `inputs` instead of generated ones
    ///
    /// # Panics
    /// Panics if the inputs do not match the function's arity.
    pub fn with_inputs(mut self, inputs: Inputs) -> Self {
        assert_eq!(inputs.arity(), self.func.signature().args.len(), "Inputs do not match the arity of {}", self.func.name());
        self.inputs = Some(inputs);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &CaseContext {
        &self.ctx
    }

    /// Number of inputs whose output fell outside the reference interval
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// Runs the case to completion
    pub fn run(&mut self, factory: &mut dyn ExecutorFactory) -> TestStatus {
        loop {
            if let IterateResult::Stop(status) = self.iterate(factory) {
                return status;
            }
        }
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        self.func.signature().args.iter().enumerate().map(|(i, ty)| Symbol::new(format!("in{i}"), *ty, self.ctx.precision)).collect()
    }

    fn output_symbol(&self) -> Symbol {
        Symbol::new("out0", self.func.signature().ret, self.ctx.precision)
    }

    /// The statement computing the output, shared by the shader and the reference
    fn statement(&self, scope: &mut Scope) -> (Vec<VariableP>, VariableP, Statement) {
        let inputs: Vec<VariableP> = self.input_symbols().iter().map(|symbol| scope.variable(symbol.name.clone(), symbol.ty)).collect();
        let output = self.output_symbol();
        let out0 = scope.variable(output.name, output.ty);
        let args = inputs.iter().cloned().map(Expr::variable).collect();
        let statement = Statement::assignment(out0.clone(), Expr::apply(self.func.clone(), args));
        (inputs, out0, statement)
    }

    pub fn shader_spec(&self) -> ShaderSpec {
        let (_, _, statement) = self.statement(&mut Scope::new());
        ShaderSpec {
            inputs: self.input_symbols(),
            outputs: vec![self.output_symbol()],
            global_declarations: String::new(),
            source: statement.to_string(),
        }
    }

    fn log_message(&mut self, message: String) {
        self.messages.push(message);
    }

    fn init(&mut self, factory: &mut dyn ExecutorFactory) -> IterateResult {
        if !factory.supports(self.ctx.shader_type) {
            return IterateResult::Stop(TestStatus::NotSupported(format!("{} shaders are not supported", self.ctx.shader_type)));
        }
        if self.inputs.is_none() {
            let types = self.func.signature().args.clone();
            let inputs = generate_inputs(&types, &self.ctx.float_format, self.ctx.precision, self.ctx.num_randoms, self.ctx.base_seed);
            self.inputs = Some(inputs);
        }
        self.phase = Phase::Compile;
        IterateResult::Continue
    }

    fn compile(&mut self, factory: &mut dyn ExecutorFactory) -> IterateResult {
        let spec = self.shader_spec();
        tracing::debug!(case = %self.ctx.name, source = %spec.source, "Compiling statement");
        let executor = match factory.create_executor(self.ctx.shader_type, &spec) {
            Ok(executor) => executor,
            Err(e) => {
                tracing::warn!(case = %self.ctx.name, "Failed to create executor: {e}");
                self.log_message(e.to_string());
                return IterateResult::Stop(TestStatus::Fail("Shader compilation failed".to_string()));
            }
        };
        if !executor.is_ok() {
            let info_log = executor.info_log();
            tracing::warn!(case = %self.ctx.name, "Shader compilation failed:\n{info_log}");
            self.log_message(info_log);
            return IterateResult::Stop(TestStatus::Fail("Shader compilation failed".to_string()));
        }
        self.executor = Some(executor);
        self.phase = Phase::Execute;
        IterateResult::Continue
    }

    fn execute(&mut self) -> IterateResult {
        let Some(inputs) = self.inputs.as_ref() else {
            return IterateResult::Stop(TestStatus::Fail("Case executed before input generation".to_string()));
        };
        let symbols = self.input_symbols();
        let buffers: Vec<Vec<u32>> = symbols.iter().zip(&inputs.columns).map(|(symbol, column)| flatten_column(symbol.ty, column)).collect();
        let num_values = inputs.len();
        let ret = self.func.signature().ret;

        let Some(executor) = self.executor.as_mut() else {
            return IterateResult::Stop(TestStatus::Fail("Case executed before compilation".to_string()));
        };
        executor.use_program();
        let result = check_input_sizes(&symbols, num_values, &buffers)
            .and_then(|()| executor.execute(num_values, &buffers))
            .and_then(|outputs| match outputs.first() {
                Some(words) => unflatten_column(ret, words, num_values),
                None => Ok(Vec::new()),
            });

        match result {
            Ok(outputs) if outputs.len() == num_values => {
                self.outputs = outputs;
                self.executor = None;
                self.phase = Phase::Verify;
                IterateResult::Continue
            }
            Ok(outputs) => IterateResult::Stop(TestStatus::Fail(format!("Executor returned {} of {num_values} outputs", outputs.len()))),
            Err(e) => {
                tracing::warn!(case = %self.ctx.name, "Execution failed: {e}");
                self.log_message(e.to_string());
                IterateResult::Stop(TestStatus::Fail("Shader execution failed".to_string()))
            }
        }
    }

    fn verify(&mut self) -> IterateResult {
        let Some(inputs) = self.inputs.take() else {
            return IterateResult::Stop(TestStatus::Fail("Case verified before execution".to_string()));
        };
        let mut scope = Scope::new();
        let (variables, out0, statement) = self.statement(&mut scope);
        let format = self.ctx.float_format;
        let highp = self.ctx.highp_format;
        let out_ty = out0.ty();
        let mut env = scope.environment();

        let outputs = std::mem::take(&mut self.outputs);
        for (index, actual) in outputs.iter().enumerate() {
            let row = inputs.row(index);
            for (variable, value) in variables.iter().zip(&row) {
                let ty = variable.ty();
                env.bind(variable, ty.convert(&format, &ty.round(&format, value)));
            }

            let mut eval = EvalContext::new(&format, self.ctx.precision, env);
            statement.execute(&mut eval);
            env = eval.env;

            let reference = out_ty.convert(&highp, env.lookup(&out0));
            let passed = self.collector.check(out_ty.contains(&reference, actual), "Shader output 0 is outside acceptable range");
            if passed {
                continue;
            }

            self.num_errors += 1;
            if self.num_errors <= self.ctx.max_messages {
                let mut message = String::from("Failed sample:\n");
                for (variable, value) in variables.iter().zip(&row) {
                    message.push_str(&format!("\t{} = {}\n", variable.name(), variable.ty().print_value(&highp, value)));
                }
                message.push_str(&format!("\t{} = {}\n", out0.name(), out_ty.print_value(&highp, actual)));
                message.push_str(&format!("\tExpected range: {}\n", out_ty.print_interval(&highp, &reference)));
                tracing::warn!(case = %self.ctx.name, "{message}");
                self.log_message(message);
            }
        }

        self.inputs = Some(inputs);
        self.outputs = outputs;
        self.phase = Phase::Report;
        IterateResult::Continue
    }

    fn report(&mut self) -> IterateResult {
        let num_values = self.outputs.len();
        if self.num_errors > self.ctx.max_messages {
            self.log_message(format!("(Skipped {} messages.)", self.num_errors - self.ctx.max_messages));
        }
        let summary = if self.num_errors == 0 {
            format!("All {num_values} inputs passed.")
        } else {
            format!("{}/{num_values} inputs failed.", self.num_errors)
        };
        tracing::info!(case = %self.ctx.name, "{summary}");
        self.log_message(summary.clone());

        self.phase = Phase::Done;
        IterateResult::Stop(self.collector.status(&summary))
    }
}

impl TestCase for FuncCase {
    fn name(&self) -> &str {
        &self.ctx.name
    }

    fn description(&self) -> String {
        let signature = self.func.signature();
        let args: Vec<String> = signature.args.iter().map(|ty| format!("{} {ty}", self.ctx.precision)).collect();
        format!("{} {}({}) in {} shaders", signature.ret, self.func.name(), args.join(", "), self.ctx.shader_type)
    }

    fn iterate(&mut self, factory: &mut dyn ExecutorFactory) -> IterateResult {
        tracing::debug!(case = %self.ctx.name, phase = ?self.phase, "Iterating");
        match self.phase {
            Phase::Init => self.init(factory),
            Phase::Compile => self.compile(factory),
            Phase::Execute => self.execute(),
            Phase::Verify => self.verify(),
            Phase::Report => self.report(),
            Phase::Done => IterateResult::Stop(self.collector.status("Case already finished")),
        }
    }

    fn log(&self) -> &[String] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutorError;
    use crate::funcs::builders::binary;
    use crate::funcs::operators::Add;
    use crate::value::ValueType;

    /// Returns the same word for every row
    struct ConstantExecutor {
        word: u32,
    }

    impl ShaderExecutor for ConstantExecutor {
        fn is_ok(&self) -> bool {
            true
        }

        fn info_log(&self) -> String {
            String::new()
        }

        fn execute(&mut self, num_values: usize, _inputs: &[Vec<u32>]) -> Result<Vec<Vec<u32>>, ExecutorError> {
            Ok(vec![vec![self.word; num_values]])
        }
    }

    struct BrokenCompiler;

    impl ShaderExecutor for BrokenCompiler {
        fn is_ok(&self) -> bool {
            false
        }

        fn info_log(&self) -> String {
            "ERROR: 0:1: syntax error".to_string()
        }

        fn execute(&mut self, _num_values: usize, _inputs: &[Vec<u32>]) -> Result<Vec<Vec<u32>>, ExecutorError> {
            Err(ExecutorError::Compile { info_log: self.info_log() })
        }
    }

    struct Factory {
        result: f32,
        compiles: bool,
        specs: Vec<ShaderSpec>,
    }

    impl ExecutorFactory for Factory {
        fn supports(&self, shader_type: ShaderType) -> bool {
            shader_type == ShaderType::Compute
        }

        fn create_executor(&mut self, _shader_type: ShaderType, spec: &ShaderSpec) -> Result<Box<dyn ShaderExecutor>, ExecutorError> {
            self.specs.push(spec.clone());
            if self.compiles {
                Ok(Box::new(ConstantExecutor { word: self.result.to_bits() }))
            } else {
                Ok(Box::new(BrokenCompiler))
            }
        }
    }

    fn add_case(shader_type: ShaderType) -> FuncCase {
        let mut inputs = Inputs::new(2);
        inputs.push(vec![Value::Float(2.0), Value::Float(3.0)]);
        inputs.push(vec![Value::Float(1.0), Value::Float(4.0)]);
        let ctx = CaseContext::new("add.mediump_compute", FloatFormat::mediump(), Precision::Mediump, shader_type);
        FuncCase::new(ctx, binary(Add)).with_inputs(inputs)
    }

    #[test]
    fn test_phases_advance_in_order() {
        let mut factory = Factory { result: 5.0, compiles: true, specs: Vec::new() };
        let mut case = add_case(ShaderType::Compute);
        let mut phases = vec![case.phase()];
        while case.iterate(&mut factory) == IterateResult::Continue {
            phases.push(case.phase());
        }
        assert_eq!(phases, vec![Phase::Init, Phase::Compile, Phase::Execute, Phase::Verify, Phase::Report]);
        assert_eq!(case.phase(), Phase::Done);
        assert_eq!(factory.specs[0].source, "out0 = (in0 + in1);\n");
        assert_eq!(factory.specs[0].inputs[1].ty, ValueType::FLOAT);
    }

    #[test]
    fn test_passing_case() {
        let mut factory = Factory { result: 5.0, compiles: true, specs: Vec::new() };
        let status = add_case(ShaderType::Compute).run(&mut factory);
        assert_eq!(status, TestStatus::Pass("All 2 inputs passed.".to_string()));
    }

    #[test]
    fn test_failures_are_counted_not_short_circuited() {
        let mut factory = Factory { result: 6.0, compiles: true, specs: Vec::new() };
        let mut case = add_case(ShaderType::Compute);
        let status = case.run(&mut factory);
        assert!(matches!(status, TestStatus::Fail(_)));
        assert_eq!(case.num_errors(), 2);
        assert_eq!(case.log().last().map(String::as_str), Some("2/2 inputs failed."));
    }

    #[test]
    fn test_message_cap() {
        let mut factory = Factory { result: 7.0, compiles: true, specs: Vec::new() };
        let mut case = add_case(ShaderType::Compute);
        case.ctx.max_messages = 1;
        case.run(&mut factory);
        assert_eq!(case.log().iter().filter(|message| message.starts_with("Failed sample")).count(), 1);
        assert!(case.log().iter().any(|message| message == "(Skipped 1 messages.)"));
    }

    #[test]
    fn test_compile_failure_is_terminal() {
        let mut factory = Factory { result: 5.0, compiles: false, specs: Vec::new() };
        let mut case = add_case(ShaderType::Compute);
        let status = case.run(&mut factory);
        assert_eq!(status, TestStatus::Fail("Shader compilation failed".to_string()));
        assert_eq!(case.phase(), Phase::Compile);
        assert!(case.log()[0].contains("syntax error"));
    }

    #[test]
    fn test_unsupported_stage() {
        let mut factory = Factory { result: 5.0, compiles: true, specs: Vec::new() };
        let status = add_case(ShaderType::Vertex).run(&mut factory);
        assert!(matches!(status, TestStatus::NotSupported(_)));
        assert!(factory.specs.is_empty());
    }

    #[test]
    fn test_description() {
        let case = add_case(ShaderType::Compute);
        assert_eq!(case.description(), "float add(mediump float, mediump float) in compute shaders");
    }
}
