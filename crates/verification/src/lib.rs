//! GPU execution of GLSL builtin precision cases
//!
//! Implements the [`builtin_precision::ExecutorFactory`] boundary on top of wgpu: cases are
//! compiled into GLSL compute shaders and their results are read back for verification.

pub mod compute_shader;
pub mod wgpu_executor;
pub mod wgpu_helpers;

pub use wgpu_executor::{WgpuExecutorFactory, WgpuShaderExecutor};
