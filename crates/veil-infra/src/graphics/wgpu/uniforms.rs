// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-draw transforms packed into one uniform buffer read at dynamic offsets.

use std::num::NonZeroU64;

/// Size of one column-major `mat4x4<f32>`.
const TRANSFORM_SIZE: u64 = 64;

/// Distance between two transform slots for the device's offset alignment.
pub(crate) fn slot_stride(min_uniform_offset_alignment: u32) -> u32 {
    let alignment = min_uniform_offset_alignment.max(1) as u64;
    (TRANSFORM_SIZE.div_ceil(alignment) * alignment) as u32
}

/// Lays `transforms` out one per slot, `stride` bytes apart.
pub(crate) fn pack_transforms(transforms: &[[[f32; 4]; 4]], stride: u32) -> Vec<u8> {
    let stride = stride as usize;
    let mut bytes = vec![0u8; transforms.len() * stride];
    for (slot, transform) in transforms.iter().enumerate() {
        let start = slot * stride;
        bytes[start..start + TRANSFORM_SIZE as usize].copy_from_slice(bytemuck::cast_slice(transform));
    }
    bytes
}

/// The bind group layout shared by every transform ring (group 0).
pub(crate) fn transform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Veil Transform Bind Group Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(TRANSFORM_SIZE),
            },
            count: None,
        }],
    })
}

/// A growable ring of transform slots, rewritten once per frame.
#[derive(Debug)]
pub(crate) struct TransformRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u32,
    stride: u32,
}

impl TransformRing {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u32,
        min_uniform_offset_alignment: u32,
    ) -> Self {
        let stride = slot_stride(min_uniform_offset_alignment);
        let capacity = capacity.max(1);
        let (buffer, bind_group) = Self::allocate(device, layout, capacity, stride);
        Self {
            buffer,
            bind_group,
            capacity,
            stride,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: u32,
        stride: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Veil Transform Ring"),
            size: capacity as u64 * stride as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Veil Transform Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(TRANSFORM_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads this frame's transforms, growing the ring when it is too small.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        transforms: &[[[f32; 4]; 4]],
    ) {
        if transforms.is_empty() {
            return;
        }
        let needed = transforms.len() as u32;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            log::debug!("TransformRing: growing from {} to {capacity} slots", self.capacity);
            let (buffer, bind_group) = Self::allocate(device, layout, capacity, self.stride);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }
        queue.write_buffer(&self.buffer, 0, &pack_transforms(transforms, self.stride));
    }

    /// Dynamic offset of `slot`.
    pub fn offset(&self, slot: u32) -> u32 {
        slot * self.stride
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::IDENTITY;

    #[test]
    fn test_slot_stride_respects_alignment() {
        assert_eq!(slot_stride(256), 256);
        assert_eq!(slot_stride(64), 64);
        assert_eq!(slot_stride(32), 64);
        assert_eq!(slot_stride(0), 64);
    }

    #[test]
    fn test_pack_places_each_transform_at_its_slot() {
        let mut scaled = IDENTITY;
        scaled[0][0] = 2.0;
        let bytes = pack_transforms(&[IDENTITY, scaled], 256);
        assert_eq!(bytes.len(), 512);

        let second: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&bytes[256..256 + 64]);
        assert_eq!(second, scaled);
        assert!(bytes[64..256].iter().all(|&b| b == 0), "padding stays zeroed");
    }
}
