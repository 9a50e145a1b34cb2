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

//! Native objects owned by the wgpu backend, keyed by [`NativeHandle`].

use std::collections::HashMap;
use std::sync::Arc;
use veil_core::{
    BackendError, BufferKind, NativeHandle, ShaderSource, TextureDescriptor, TextureRegion,
};
use wgpu::util::DeviceExt;

use super::conversions::IntoWgpu;
use super::pipeline::ProgramEntry;

#[derive(Debug)]
pub(crate) struct BufferEntry {
    pub buffer: Arc<wgpu::Buffer>,
    pub kind: BufferKind,
    pub size: u64, // To track VRAM accurately on destruction
}

#[derive(Debug)]
pub(crate) struct TextureEntry {
    pub texture: wgpu::Texture,
    pub descriptor: TextureDescriptor,
    /// Created on first sample.
    pub bind_group: Option<Arc<wgpu::BindGroup>>,
}

/// Checks `region` against `descriptor` and `data` against `region`.
pub(crate) fn validate_region(
    descriptor: &TextureDescriptor,
    region: &TextureRegion,
    data: &[u8],
) -> Result<(), BackendError> {
    let (mip_width, mip_height) = descriptor.mip_size(region.mip_level).ok_or_else(|| {
        BackendError::Validation(format!(
            "mip level {} out of range ({} levels)",
            region.mip_level, descriptor.mip_level_count
        ))
    })?;
    let fits = region.x.checked_add(region.width).is_some_and(|right| right <= mip_width)
        && region.y.checked_add(region.height).is_some_and(|bottom| bottom <= mip_height);
    if !fits || region.width == 0 || region.height == 0 {
        return Err(BackendError::Validation(format!(
            "region {region:?} does not fit mip {} ({mip_width}x{mip_height})",
            region.mip_level
        )));
    }
    let needed = region.texel_count() * descriptor.format.bytes_per_pixel() as u64;
    if (data.len() as u64) < needed {
        return Err(BackendError::Validation(format!(
            "{} bytes supplied for a region needing {needed}",
            data.len()
        )));
    }
    Ok(())
}

/// All live buffers, textures and programs of one device session.
#[derive(Debug)]
pub(crate) struct ResourceTable {
    next_handle: u64,
    buffers: HashMap<NativeHandle, BufferEntry>,
    textures: HashMap<NativeHandle, TextureEntry>,
    programs: HashMap<NativeHandle, ProgramEntry>,

    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    // Bound when a draw samples no texture.
    _white_texture: wgpu::Texture,
    white_bind_group: Arc<wgpu::BindGroup>,

    // VRAM Tracking
    vram_allocated_bytes: u64,
}

impl ResourceTable {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Veil Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Veil Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white_texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Veil White Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0xFF; 4],
        );
        let white_bind_group = Arc::new(Self::make_bind_group(
            device,
            &texture_layout,
            &sampler,
            &white_texture,
        ));

        Self {
            next_handle: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            texture_layout,
            sampler,
            _white_texture: white_texture,
            white_bind_group,
            vram_allocated_bytes: 0,
        }
    }

    fn make_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        texture: &wgpu::Texture,
    ) -> wgpu::BindGroup {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Veil Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn allocate_handle(&mut self) -> NativeHandle {
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    // --- Buffers ---

    pub fn create_buffer(&mut self, device: &wgpu::Device, kind: &BufferKind, data: &[u8]) -> NativeHandle {
        let usage = match kind {
            BufferKind::Vertex(_) => wgpu::BufferUsages::VERTEX,
            BufferKind::Index(_) => wgpu::BufferUsages::INDEX,
        };
        // Zero-sized buffers cannot be bound.
        let contents = if data.is_empty() { &[0u8; 4][..] } else { data };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match kind {
                BufferKind::Vertex(_) => "Veil Vertex Buffer",
                BufferKind::Index(_) => "Veil Index Buffer",
            }),
            contents,
            usage,
        });
        let handle = self.allocate_handle();
        let size = contents.len() as u64;
        self.vram_allocated_bytes += size;
        self.buffers.insert(
            handle,
            BufferEntry {
                buffer: Arc::new(buffer),
                kind: kind.clone(),
                size,
            },
        );
        log::debug!("WgpuBackend: created {kind:?} buffer {handle:?} ({size} bytes)");
        handle
    }

    pub fn destroy_buffer(&mut self, handle: NativeHandle) -> bool {
        match self.buffers.remove(&handle) {
            Some(entry) => {
                self.vram_allocated_bytes = self.vram_allocated_bytes.saturating_sub(entry.size);
                true
            }
            None => false,
        }
    }

    pub fn buffer(&self, handle: NativeHandle) -> Option<&BufferEntry> {
        self.buffers.get(&handle)
    }

    // --- Textures ---

    pub fn create_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError> {
        if descriptor.width == 0 || descriptor.height == 0 || descriptor.mip_level_count == 0 {
            return Err(BackendError::Validation(format!(
                "texture {}x{} with {} mips",
                descriptor.width, descriptor.height, descriptor.mip_level_count
            )));
        }
        let is_depth = descriptor.format.is_depth();
        let usage = if is_depth {
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
        } else {
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Veil Texture"),
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: descriptor.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: descriptor.format.into_wgpu(),
            usage,
            view_formats: &[],
        });

        if let Some(data) = data {
            if is_depth {
                log::warn!("WgpuBackend: dropping initial data for depth texture");
            } else {
                let region = TextureRegion::full(descriptor.width, descriptor.height);
                validate_region(descriptor, &region, data)?;
                Self::write(queue, &texture, descriptor, &region, data);
            }
        }

        let handle = self.allocate_handle();
        self.vram_allocated_bytes += descriptor.byte_size();
        self.textures.insert(
            handle,
            TextureEntry {
                texture,
                descriptor: *descriptor,
                bind_group: None,
            },
        );
        log::debug!(
            "WgpuBackend: created {}x{} {:?} texture {handle:?}",
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        Ok(handle)
    }

    fn write(
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        descriptor: &TextureDescriptor,
        region: &TextureRegion,
        data: &[u8],
    ) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: region.mip_level,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * descriptor.format.bytes_per_pixel()),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
    }

    pub fn update_texture(
        &mut self,
        queue: &wgpu::Queue,
        handle: NativeHandle,
        region: &TextureRegion,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let entry = self
            .textures
            .get(&handle)
            .ok_or(BackendError::InvalidHandle(handle))?;
        if entry.descriptor.format.is_depth() {
            return Err(BackendError::Unsupported("CPU upload to a depth texture".to_owned()));
        }
        validate_region(&entry.descriptor, region, data)?;
        Self::write(queue, &entry.texture, &entry.descriptor, region, data);
        log::trace!("WgpuBackend: updated {region:?} of texture {handle:?}");
        Ok(())
    }

    pub fn destroy_texture(&mut self, handle: NativeHandle) -> bool {
        match self.textures.remove(&handle) {
            Some(entry) => {
                self.vram_allocated_bytes = self
                    .vram_allocated_bytes
                    .saturating_sub(entry.descriptor.byte_size());
                true
            }
            None => false,
        }
    }

    /// The group 1 bind group for sampling `handle`.
    ///
    /// Unknown handles and depth textures fall back to the white texture.
    pub fn texture_bind_group(&mut self, device: &wgpu::Device, handle: NativeHandle) -> Arc<wgpu::BindGroup> {
        if !handle.is_valid() {
            return Arc::clone(&self.white_bind_group);
        }
        let Some(entry) = self.textures.get_mut(&handle) else {
            log::warn!("WgpuBackend: draw samples unknown texture {handle:?}, using white");
            return Arc::clone(&self.white_bind_group);
        };
        if entry.descriptor.format.is_depth() {
            log::debug!("WgpuBackend: depth texture {handle:?} cannot be sampled here, using white");
            return Arc::clone(&self.white_bind_group);
        }
        let layout = &self.texture_layout;
        let sampler = &self.sampler;
        let texture = &entry.texture;
        Arc::clone(
            entry
                .bind_group
                .get_or_insert_with(|| Arc::new(Self::make_bind_group(device, layout, sampler, texture))),
        )
    }

    // --- Programs ---

    /// Registers a program. `Binary` sources are WGSL text.
    pub fn create_program(&mut self, device: &wgpu::Device, source: &ShaderSource) -> Result<NativeHandle, BackendError> {
        let entry = match source {
            ShaderSource::Builtin(kind) => ProgramEntry::Builtin(*kind),
            ShaderSource::Binary(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| BackendError::Validation(format!("program is not UTF-8 WGSL: {e}")))?;
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("Veil Custom Program"),
                    source: wgpu::ShaderSource::Wgsl(text.into()),
                });
                ProgramEntry::Custom(Arc::new(module))
            }
        };
        let handle = self.allocate_handle();
        log::debug!("WgpuBackend: created program {handle:?} ({:?})", source_label(source));
        self.programs.insert(handle, entry);
        Ok(handle)
    }

    pub fn destroy_program(&mut self, handle: NativeHandle) -> bool {
        self.programs.remove(&handle).is_some()
    }

    pub fn program(&self, handle: NativeHandle) -> Option<&ProgramEntry> {
        self.programs.get(&handle)
    }

    /// Number of live native objects.
    pub fn live_objects(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.programs.len()
    }

    pub fn vram_allocated_bytes(&self) -> u64 {
        self.vram_allocated_bytes
    }
}

fn source_label(source: &ShaderSource) -> String {
    match source {
        ShaderSource::Builtin(kind) => format!("{kind:?}"),
        ShaderSource::Binary(bytes) => format!("{} bytes of WGSL", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::TextureFormat;

    fn descriptor() -> TextureDescriptor {
        TextureDescriptor {
            width: 64,
            height: 32,
            format: TextureFormat::Rgba8Unorm,
            mip_level_count: 2,
        }
    }

    #[test]
    fn test_region_inside_mip_is_accepted() {
        let region = TextureRegion {
            mip_level: 1,
            x: 30,
            y: 14,
            width: 2,
            height: 2,
        };
        assert_eq!(validate_region(&descriptor(), &region, &[0; 16]), Ok(()));
    }

    #[test]
    fn test_region_outside_mip_is_rejected() {
        let region = TextureRegion {
            mip_level: 1,
            x: 31,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(matches!(
            validate_region(&descriptor(), &region, &[0; 8]),
            Err(BackendError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_mip_is_rejected() {
        let region = TextureRegion {
            mip_level: 2,
            ..TextureRegion::full(1, 1)
        };
        assert!(validate_region(&descriptor(), &region, &[0; 4]).is_err());
    }

    #[test]
    fn test_short_data_is_rejected() {
        let region = TextureRegion::full(4, 4);
        assert!(validate_region(&descriptor(), &region, &[0; 63]).is_err());
        assert!(validate_region(&descriptor(), &region, &[0; 64]).is_ok());
    }

    #[test]
    fn test_overflowing_region_is_rejected() {
        let region = TextureRegion {
            mip_level: 0,
            x: u32::MAX,
            y: 0,
            width: 2,
            height: 1,
        };
        assert!(validate_region(&descriptor(), &region, &[0; 8]).is_err());
    }
}
