//! Shader executor backed by a wgpu device
//!
//! Each precision case is compiled into a GLSL compute shader (see [`crate::compute_shader`])
//! and run with one invocation per input value. Compilation failures are captured through a
//! validation error scope and reported through [`ShaderExecutor::info_log`] instead of
//! aborting the run.

use builtin_precision::executor::check_input_sizes;
use builtin_precision::{ExecutorError, ExecutorFactory, ShaderExecutor, ShaderSpec, ShaderType, Symbol};

use crate::compute_shader::{COMPUTE_WORKGROUP_SIZE_X, PARAMS_BINDING, generate_compute_shader, input_binding, output_binding};
use crate::wgpu_helpers::{BUFFER_USAGE_OUTPUT, BUFFER_USAGE_READBACK, Params, create_input_buffer, create_params_buffer, create_word_buffer, read_words, word_buffer_size};

/// Calculates the number of workgroups needed to cover `size` invocations
fn calculate_workgroup_count(size: u32, workgroup_size: u32) -> u32 {
    size.div_ceil(workgroup_size)
}

/// Creates [`WgpuShaderExecutor`]s on a shared device
///
/// Only compute shaders are supported; vertex and fragment cases are reported as not
/// supported by the case runner.
pub struct WgpuExecutorFactory {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
}

impl WgpuExecutorFactory {
    /// Creates a factory on the highest-performance adapter available
    ///
    /// # Returns
    /// A new factory or an error if no adapter or device could be obtained
    pub async fn new() -> Result<Self, ExecutorError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // No surface is needed for compute-only work
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ExecutorError::Device(e.to_string()))?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Precision Test Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| ExecutorError::Device(e.to_string()))?;

        tracing::info!(adapter = %adapter_info.name, backend = ?adapter_info.backend, "Created precision test device");
        Ok(Self { device, queue, adapter_info })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }
}

impl ExecutorFactory for WgpuExecutorFactory {
    fn supports(&self, shader_type: ShaderType) -> bool {
        shader_type == ShaderType::Compute
    }

    fn create_executor(&mut self, shader_type: ShaderType, spec: &ShaderSpec) -> Result<Box<dyn ShaderExecutor>, ExecutorError> {
        if !self.supports(shader_type) {
            return Err(ExecutorError::UnsupportedStage(shader_type.to_string()));
        }
        Ok(Box::new(WgpuShaderExecutor::new(self.device.clone(), self.queue.clone(), spec)))
    }
}

/// A compiled compute pipeline evaluating one [`ShaderSpec`]
pub struct WgpuShaderExecutor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    inputs: Vec<Symbol>,
    outputs: Vec<Symbol>,
    /// None when compilation failed
    pipeline: Option<wgpu::ComputePipeline>,
    info_log: String,
}

impl WgpuShaderExecutor {
    /// Compiles `spec` into a compute pipeline
    ///
    /// Never fails: compilation errors are recorded and exposed through `is_ok` and `info_log`.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, spec: &ShaderSpec) -> Self {
        let source = generate_compute_shader(spec);
        tracing::trace!("Generated compute shader:\n{source}");

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("precision_shader_module"),
            source: wgpu::ShaderSource::Glsl {
                shader: source.as_str().into(),
                stage: wgpu::naga::ShaderStage::Compute,
                defines: Default::default(),
            },
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("precision_pipeline"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });
        let error = pollster::block_on(device.pop_error_scope());

        let (pipeline, info_log) = match error {
            None => (Some(pipeline), String::new()),
            Some(error) => {
                tracing::debug!("Compilation failed: {error}");
                (None, format!("{error}\n\n{source}"))
            }
        };

        Self {
            device,
            queue,
            inputs: spec.inputs.clone(),
            outputs: spec.outputs.clone(),
            pipeline,
            info_log,
        }
    }
}

impl ShaderExecutor for WgpuShaderExecutor {
    fn is_ok(&self) -> bool {
        self.pipeline.is_some()
    }

    fn info_log(&self) -> String {
        self.info_log.clone()
    }

    fn execute(&mut self, num_values: usize, inputs: &[Vec<u32>]) -> Result<Vec<Vec<u32>>, ExecutorError> {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(ExecutorError::Compile { info_log: self.info_log.clone() });
        };
        check_input_sizes(&self.inputs, num_values, inputs)?;
        if num_values == 0 {
            return Ok(vec![Vec::new(); self.outputs.len()]);
        }
        let value_count = u32::try_from(num_values).map_err(|_| ExecutorError::Device(format!("{num_values} values exceed a single dispatch")))?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = create_params_buffer(&self.device, Params::new(value_count));
        let input_buffers: Vec<wgpu::Buffer> = self.inputs.iter().zip(inputs).map(|(symbol, words)| create_input_buffer(&self.device, &symbol.name, words)).collect();
        let output_sizes: Vec<usize> = self.outputs.iter().map(|symbol| num_values * symbol.ty.scalar_count()).collect();
        let output_buffers: Vec<wgpu::Buffer> = self.outputs.iter().zip(&output_sizes).map(|(symbol, &size)| create_word_buffer(&self.device, &symbol.name, size, BUFFER_USAGE_OUTPUT)).collect();
        let readback_buffers: Vec<wgpu::Buffer> = self
            .outputs
            .iter()
            .zip(&output_sizes)
            .map(|(symbol, &size)| create_word_buffer(&self.device, &format!("{}_readback", symbol.name), size, BUFFER_USAGE_READBACK))
            .collect();

        let mut bind_group_entries = vec![wgpu::BindGroupEntry {
            binding: PARAMS_BINDING,
            resource: params_buffer.as_entire_binding(),
        }];
        for (index, buffer) in input_buffers.iter().enumerate() {
            bind_group_entries.push(wgpu::BindGroupEntry {
                binding: input_binding(index),
                resource: buffer.as_entire_binding(),
            });
        }
        for (index, buffer) in output_buffers.iter().enumerate() {
            bind_group_entries.push(wgpu::BindGroupEntry {
                binding: output_binding(self.inputs.len(), index),
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("precision_bind_group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &bind_group_entries,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("precision_encoder") });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("precision_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(calculate_workgroup_count(value_count, COMPUTE_WORKGROUP_SIZE_X), 1, 1);
        }
        for ((output, readback), &size) in output_buffers.iter().zip(&readback_buffers).zip(&output_sizes) {
            encoder.copy_buffer_to_buffer(output, 0, readback, 0, word_buffer_size(size));
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ExecutorError::Device(error.to_string()));
        }

        readback_buffers.iter().map(|buffer| read_words(&self.device, buffer)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_workgroup_count() {
        assert_eq!(calculate_workgroup_count(1, 64), 1);
        assert_eq!(calculate_workgroup_count(64, 64), 1);
        assert_eq!(calculate_workgroup_count(65, 64), 2);
        assert_eq!(calculate_workgroup_count(16404, 64), 257);
    }
}
