//! wgpu utility functions for executing precision shaders
//!
//! This module provides helpers for creating the word buffers that carry values between
//! the host and a compute shader, and for reading results back.

use builtin_precision::ExecutorError;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Buffer usage flags for input word buffers
pub const BUFFER_USAGE_INPUT: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::COPY_DST);

/// Buffer usage flags for output word buffers
///
/// Includes storage binding and copy source so results can be copied into a readback buffer
pub const BUFFER_USAGE_OUTPUT: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE.union(wgpu::BufferUsages::COPY_SRC);

/// Buffer usage flags for host-visible readback buffers
pub const BUFFER_USAGE_READBACK: wgpu::BufferUsages = wgpu::BufferUsages::MAP_READ.union(wgpu::BufferUsages::COPY_DST);

/// Contents of the parameter uniform block, padded to 16 bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Params {
    pub num_values: u32,
    pub _padding: [u32; 3],
}

impl Params {
    pub fn new(num_values: u32) -> Self {
        Self { num_values, _padding: [0; 3] }
    }
}

/// Size in bytes of `num_words` 32-bit words
pub fn word_buffer_size(num_words: usize) -> wgpu::BufferAddress {
    (num_words * std::mem::size_of::<u32>()) as wgpu::BufferAddress
}

/// Creates the uniform buffer holding `params`
pub fn create_params_buffer(device: &wgpu::Device, params: Params) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("precision_params"),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM.union(wgpu::BufferUsages::COPY_DST),
    })
}

/// Creates a storage buffer initialized with `words`
///
/// # Arguments
/// * `device` - The wgpu device to create the buffer on
/// * `label` - Debug label of the buffer
/// * `words` - Initial contents
pub fn create_input_buffer(device: &wgpu::Device, label: &str, words: &[u32]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(words),
        usage: BUFFER_USAGE_INPUT,
    })
}

/// Creates an uninitialized buffer of `num_words` words with the given usage
pub fn create_word_buffer(device: &wgpu::Device, label: &str, num_words: usize, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: word_buffer_size(num_words),
        usage,
        mapped_at_creation: false,
    })
}

/// Maps a filled readback buffer and copies its words out
///
/// The copy into `buffer` must already have been submitted.
///
/// # Arguments
/// * `device` - The device owning the buffer, polled until the mapping completes
/// * `buffer` - A buffer created with [`BUFFER_USAGE_READBACK`]
///
/// # Returns
/// The buffer contents as words, or a mapping error
pub fn read_words(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u32>, ExecutorError> {
    let buffer_slice = buffer.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device.poll(wgpu::PollType::Wait).map_err(|e| ExecutorError::Device(e.to_string()))?;
    pollster::block_on(receiver.receive())
        .ok_or_else(|| ExecutorError::Mapping("mapping callback was dropped".to_string()))?
        .map_err(|e| ExecutorError::Mapping(e.to_string()))?;

    let words = {
        let data = buffer_slice.get_mapped_range();
        bytemuck::cast_slice::<u8, u32>(&data).to_vec()
    };
    buffer.unmap();
    Ok(words)
}
