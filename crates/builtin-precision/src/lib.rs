//! Precision verification of GLSL builtin functions
//!
//! This crate computes, for every builtin and every input, an interval containing all
//! results a conforming implementation may return at a given precision, and checks the
//! results of an actual shader implementation against those intervals.
//!
//! # Architecture
//!
//! - [`float_format`] and [`interval`]: target formats and conservative interval arithmetic
//! - [`value`] and [`traits`]: value shapes and the operations generic over them
//! - [`expr`] and [`funcs`]: expressions over builtins, printed as GLSL and evaluated over intervals
//! - [`sampling`] and [`inputs`]: test input generation
//! - [`executor`], [`case`] and [`registry`]: the shader boundary, the test case state machine
//!   and the catalogue of cases

pub mod case;
pub mod config;
pub mod error;
pub mod executor;
pub mod expr;
pub mod float_format;
pub mod funcs;
pub mod inputs;
pub mod interval;
pub mod registry;
pub mod sampling;
pub mod traits;
pub mod value;

pub use case::{CaseContext, FuncCase, IterateResult, TestCase, TestStatus};
pub use config::SuiteConfig;
pub use error::{ConfigError, ExecutorError};
pub use executor::{ExecutorFactory, ShaderExecutor, ShaderSpec, ShaderType, Symbol};
pub use float_format::{FloatFormat, Precision, YesNoMaybe};
pub use interval::Interval;
pub use registry::{TestGroup, TestNode, add_builtin_precision_tests, create_builtin_cases};
pub use value::{IVal, Value, ValueType};
