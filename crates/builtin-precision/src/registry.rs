//! Builtin catalogue and test tree
//!
//! Each [`CaseFactory`] describes one function group and its shape variants. The tree is
//! `precision.<group>[.<variant>].<precision>_<shader>`, e.g. `precision.add.mediump_compute`
//! or `precision.dot.vec3.highp_compute`.

use std::rc::Rc;

use crate::case::{CaseContext, FuncCase, TestCase};
use crate::config::SuiteConfig;
use crate::funcs::FuncP;
use crate::funcs::builders::{binary, ternary, unary};
use crate::funcs::common::{Abs, Ceil, Clamp, Floor, Max, Min, Round, RoundEven, Sign, Step, Trunc};
use crate::funcs::derived::{Acosh, Asinh, Atanh, Cosh, Degrees, Derived, DerivedFunc, Fract, Mix, Mod, Pow, Radians, Sinh, SmoothStep, Sqrt, Tan, Tanh};
use crate::funcs::geometric::{Cross, Distance, Dot, FaceForward, Length, Normalize, Reflect, Refract};
use crate::funcs::matrix::{Determinant, Inverse, MatMul, MatVecMul, OuterProduct, VecMatMul};
use crate::funcs::operators::{Add, Div, Mul, Sub};
use crate::funcs::structural::{GenFunc, Transpose};
use crate::funcs::transcendental::{Acos, Asin, Atan, Atan2, Cos, Exp, Exp2, InverseSqrt, Log, Log2, Sin};
use crate::value::ValueType;

/// Matrix shapes as (columns, rows)
const MATRIX_SHAPES: [(usize, usize); 9] = [(2, 2), (2, 3), (2, 4), (3, 2), (3, 3), (3, 4), (4, 2), (4, 3), (4, 4)];

/// A node of the test tree
pub enum TestNode {
    Group(TestGroup),
    Case(Box<dyn TestCase>),
}

impl TestNode {
    pub fn name(&self) -> &str {
        match self {
            TestNode::Group(group) => &group.name,
            TestNode::Case(case) => case.name(),
        }
    }
}

/// A named group of cases and subgroups
pub struct TestGroup {
    pub name: String,
    pub description: String,
    pub children: Vec<TestNode>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn add_group(&mut self, group: TestGroup) {
        self.children.push(TestNode::Group(group))
    }

    pub fn add_case(&mut self, case: Box<dyn TestCase>) {
        self.children.push(TestNode::Case(case))
    }

    /// Finds the subgroup `name`, creating it if needed
    fn subgroup(&mut self, name: &str, description: &str) -> &mut TestGroup {
        let index = match self.children.iter().position(|child| matches!(child, TestNode::Group(group) if group.name == name)) {
            Some(index) => index,
            None => {
                self.add_group(TestGroup::new(name, description));
                self.children.len() - 1
            }
        };
        match &mut self.children[index] {
            TestNode::Group(group) => group,
            TestNode::Case(_) => unreachable!("subgroup index always refers to a group"),
        }
    }

    /// Number of cases in this group and all subgroups
    pub fn count_cases(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                TestNode::Group(group) => group.count_cases(),
                TestNode::Case(_) => 1,
            })
            .sum()
    }

    /// Visits every case depth first with its full dotted path
    pub fn for_each_case_mut(&mut self, visit: &mut dyn FnMut(&str, &mut dyn TestCase)) {
        let prefix = self.name.clone();
        self.visit_cases(&prefix, visit);
    }

    fn visit_cases(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut dyn TestCase)) {
        for child in &mut self.children {
            match child {
                TestNode::Group(group) => {
                    let path = format!("{path}.{}", group.name);
                    group.visit_cases(&path, visit);
                }
                TestNode::Case(case) => {
                    let path = format!("{path}.{}", case.name());
                    visit(&path, case.as_mut());
                }
            }
        }
    }
}

/// One function group of the catalogue
pub trait CaseFactory {
    fn name(&self) -> &str;

    fn description(&self) -> String;

    /// The functions to test, each with the subgroup it is placed in (`None` for the group itself)
    fn variants(&self) -> Vec<(Option<String>, FuncP)>;
}

fn derived(func: impl DerivedFunc + 'static) -> FuncP {
    Rc::new(Derived::new(func))
}

fn vector_name(size: usize) -> Option<String> {
    if size == 1 { None } else { Some(format!("vec{size}")) }
}

/// A scalar function, also tested component-wise on `vec2`..`vec4`
pub struct ScalarFactory {
    name: String,
    func: FuncP,
}

impl ScalarFactory {
    pub fn new(name: impl Into<String>, func: FuncP) -> Self {
        Self { name: name.into(), func }
    }
}

impl CaseFactory for ScalarFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Precision of {} on scalars and vectors", self.func.name())
    }

    fn variants(&self) -> Vec<(Option<String>, FuncP)> {
        let mut variants = vec![(None, self.func.clone())];
        for size in 2..=4 {
            let func: FuncP = Rc::new(GenFunc::componentwise(self.func.clone(), ValueType::vec(size)));
            variants.push((vector_name(size), func));
        }
        variants
    }
}

/// A function defined separately for each vector size
pub struct TemplateFactory {
    name: String,
    sizes: Vec<usize>,
    make: fn(usize) -> FuncP,
}

impl TemplateFactory {
    pub fn new(name: impl Into<String>, sizes: impl Into<Vec<usize>>, make: fn(usize) -> FuncP) -> Self {
        Self {
            name: name.into(),
            sizes: sizes.into(),
            make,
        }
    }
}

impl CaseFactory for TemplateFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Precision of {} on vectors", self.name)
    }

    fn variants(&self) -> Vec<(Option<String>, FuncP)> {
        self.sizes.iter().map(|&size| (vector_name(size), (self.make)(size))).collect()
    }
}

/// A function defined for every matrix shape, given as (columns, rows)
pub struct MatrixFactory {
    name: String,
    make: fn(usize, usize) -> FuncP,
}

impl MatrixFactory {
    pub fn new(name: impl Into<String>, make: fn(usize, usize) -> FuncP) -> Self {
        Self { name: name.into(), make }
    }
}

impl CaseFactory for MatrixFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Precision of {} on matrices", self.name)
    }

    fn variants(&self) -> Vec<(Option<String>, FuncP)> {
        MATRIX_SHAPES.iter().map(|&(cols, rows)| (Some(ValueType::mat(cols, rows).glsl_name()), (self.make)(cols, rows))).collect()
    }
}

/// A function defined for square matrices only
pub struct SquareMatrixFactory {
    name: String,
    make: fn(usize) -> FuncP,
}

impl SquareMatrixFactory {
    pub fn new(name: impl Into<String>, make: fn(usize) -> FuncP) -> Self {
        Self { name: name.into(), make }
    }
}

impl CaseFactory for SquareMatrixFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Precision of {} on square matrices", self.name)
    }

    fn variants(&self) -> Vec<(Option<String>, FuncP)> {
        (2..=4).map(|size| (Some(ValueType::mat(size, size).glsl_name()), (self.make)(size))).collect()
    }
}

/// Linear-algebra products `mat * mat`, `mat * vec` and `vec * mat` for every matrix shape
pub struct MatrixProductFactory;

impl CaseFactory for MatrixProductFactory {
    fn name(&self) -> &str {
        "matrix_product"
    }

    fn description(&self) -> String {
        "Precision of matrix and vector products".to_string()
    }

    fn variants(&self) -> Vec<(Option<String>, FuncP)> {
        let mut variants = Vec::new();
        for (cols, rows) in MATRIX_SHAPES {
            let name = ValueType::mat(cols, rows).glsl_name();
            variants.push((Some(name.clone()), derived(MatMul::new(cols, rows, cols))));
            variants.push((Some(format!("{name}_vec{cols}")), derived(MatVecMul::new(cols, rows))));
            variants.push((Some(format!("vec{rows}_{name}")), derived(VecMatMul::new(cols, rows))));
        }
        variants
    }
}

/// The full builtin catalogue
pub fn create_builtin_cases() -> Vec<Box<dyn CaseFactory>> {
    let scalar = |name: &str, func: FuncP| -> Box<dyn CaseFactory> { Box::new(ScalarFactory::new(name, func)) };
    let template = |name: &str, make: fn(usize) -> FuncP| -> Box<dyn CaseFactory> { Box::new(TemplateFactory::new(name, vec![1, 2, 3, 4], make)) };

    vec![
        scalar("add", binary(Add)),
        scalar("sub", binary(Sub)),
        scalar("mul", binary(Mul)),
        scalar("div", binary(Div)),
        scalar("radians", derived(Radians)),
        scalar("degrees", derived(Degrees)),
        scalar("sin", unary(Sin)),
        scalar("cos", unary(Cos)),
        scalar("tan", derived(Tan)),
        scalar("asin", unary(Asin)),
        scalar("acos", unary(Acos)),
        scalar("atan2", binary(Atan2)),
        scalar("atan", unary(Atan)),
        scalar("sinh", derived(Sinh)),
        scalar("cosh", derived(Cosh)),
        scalar("tanh", derived(Tanh)),
        scalar("asinh", derived(Asinh)),
        scalar("acosh", derived(Acosh)),
        scalar("atanh", derived(Atanh)),
        scalar("pow", derived(Pow)),
        scalar("exp", unary(Exp)),
        scalar("log", unary(Log)),
        scalar("exp2", unary(Exp2)),
        scalar("log2", unary(Log2)),
        scalar("sqrt", derived(Sqrt)),
        scalar("inversesqrt", unary(InverseSqrt)),
        scalar("abs", unary(Abs)),
        scalar("sign", unary(Sign)),
        scalar("floor", unary(Floor)),
        scalar("trunc", unary(Trunc)),
        scalar("round", unary(Round)),
        scalar("roundeven", unary(RoundEven)),
        scalar("ceil", unary(Ceil)),
        scalar("fract", derived(Fract)),
        scalar("mod", derived(Mod)),
        scalar("min", binary(Min)),
        scalar("max", binary(Max)),
        scalar("clamp", ternary(Clamp)),
        scalar("mix", derived(Mix)),
        scalar("step", binary(Step)),
        scalar("smoothstep", derived(SmoothStep)),
        template("length", |size| derived(Length::new(size))),
        template("distance", |size| derived(Distance::new(size))),
        template("dot", |size| derived(Dot::new(size))),
        Box::new(TemplateFactory::new("cross", vec![3], |_| derived(Cross))),
        template("normalize", |size| derived(Normalize::new(size))),
        template("faceforward", |size| derived(FaceForward::new(size))),
        template("reflect", |size| derived(Reflect::new(size))),
        template("refract", |size| derived(Refract::new(size))),
        Box::new(MatrixFactory::new("matrixcompmult", |cols, rows| Rc::new(GenFunc::componentwise(binary(Mul), ValueType::mat(cols, rows)).with_name("matrixCompMult")))),
        Box::new(MatrixFactory::new("outerproduct", |cols, rows| derived(OuterProduct::new(cols, rows)))),
        Box::new(MatrixFactory::new("transpose", |cols, rows| Rc::new(Transpose::new(cols, rows)))),
        Box::new(SquareMatrixFactory::new("determinant", |size| derived(Determinant::new(size)))),
        Box::new(SquareMatrixFactory::new("inverse", |size| derived(Inverse::new(size)))),
        Box::new(MatrixProductFactory),
    ]
}

/// Creates the cases of one factory in a new group
pub fn create_factory_group(factory: &dyn CaseFactory, config: &SuiteConfig) -> TestGroup {
    let mut group = TestGroup::new(factory.name(), factory.description());
    for (variant, func) in factory.variants() {
        let parent = match &variant {
            Some(variant) => group.subgroup(variant, variant),
            None => &mut group,
        };
        for &precision in &config.precisions {
            for &shader_type in &config.shader_types {
                let name = format!("{precision}_{shader_type}");
                let mut ctx = CaseContext::new(name, *config.formats.get(precision), precision, shader_type);
                ctx.highp_format = config.formats.highp;
                ctx.num_randoms = config.num_randoms;
                ctx.base_seed = config.base_seed;
                ctx.max_messages = config.max_messages;
                parent.add_case(Box::new(FuncCase::new(ctx, func.clone())));
            }
        }
    }
    group
}

/// Builds the `precision` test tree for the functions selected by `config`
pub fn add_builtin_precision_tests(config: &SuiteConfig) -> TestGroup {
    let mut root = TestGroup::new("precision", "Builtin function precision tests");
    for factory in create_builtin_cases() {
        if config.includes(factory.name()) {
            root.add_group(create_factory_group(factory.as_ref(), config));
        }
    }
    tracing::debug!(cases = root.count_cases(), "Created precision test tree");
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ShaderType;
    use crate::expr::{Environment, EvalContext};
    use crate::float_format::{FloatFormat, Precision};
    use crate::value::IVal;

    fn case_paths(group: &mut TestGroup) -> Vec<String> {
        let mut paths = Vec::new();
        group.for_each_case_mut(&mut |path, _| paths.push(path.to_string()));
        paths
    }

    #[test]
    fn test_catalogue_names_are_unique() {
        let factories = create_builtin_cases();
        let mut names: Vec<&str> = factories.iter().map(|factory| factory.name()).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    fn test_scalar_factory_variants() {
        let variants = ScalarFactory::new("add", binary(Add)).variants();
        let names: Vec<Option<String>> = variants.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec![None, Some("vec2".to_string()), Some("vec3".to_string()), Some("vec4".to_string())]);
        assert_eq!(variants[2].1.signature().args, vec![ValueType::vec(3); 2]);
    }

    #[test]
    fn test_case_paths() {
        let config = SuiteConfig {
            functions: Some(vec!["add".to_string(), "dot".to_string(), "inverse".to_string()]),
            ..SuiteConfig::default()
        };
        let mut root = add_builtin_precision_tests(&config);
        let paths = case_paths(&mut root);
        assert!(paths.contains(&"precision.add.mediump_compute".to_string()));
        assert!(paths.contains(&"precision.add.vec4.highp_compute".to_string()));
        assert!(paths.contains(&"precision.dot.vec3.highp_compute".to_string()));
        assert!(paths.contains(&"precision.inverse.mat3.mediump_compute".to_string()));
        // 4 variants of add and dot, 3 of inverse, 2 precisions each
        assert_eq!(root.count_cases(), (4 + 4 + 3) * 2);
    }

    #[test]
    fn test_matrix_variants() {
        let config = SuiteConfig {
            functions: Some(vec!["transpose".to_string(), "matrixcompmult".to_string()]),
            precisions: vec![Precision::Highp],
            shader_types: vec![ShaderType::Compute, ShaderType::Fragment],
            ..SuiteConfig::default()
        };
        let mut root = add_builtin_precision_tests(&config);
        let paths = case_paths(&mut root);
        assert_eq!(paths.len(), 9 * 2 * 2);
        assert!(paths.contains(&"precision.transpose.mat2x3.highp_fragment".to_string()));
        assert!(paths.contains(&"precision.matrixcompmult.mat4.highp_compute".to_string()));
    }

    #[test]
    fn test_every_variant_evaluates() {
        let format = FloatFormat::highp();
        for factory in create_builtin_cases() {
            for (variant, func) in factory.variants() {
                let signature = func.signature().clone();
                let args: Vec<IVal> = signature.args.iter().map(|ty| ty.make_interval(&ty.unflatten(&vec![0.5f32.to_bits(); ty.scalar_count()]))).collect();
                let ctx = EvalContext::new(&format, Precision::Highp, Environment::new(0));
                let ret = func.apply(&ctx, &args);
                assert_eq!(ret.scalars().len(), signature.ret.scalar_count(), "{}.{variant:?} returned the wrong shape", factory.name());
            }
        }
    }
}
