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

//! The [`GraphicsBackend`] implementation over `wgpu`.

use std::collections::BTreeMap;
use std::sync::Arc;
use veil_core::{
    BackendError, BackendInfo, BufferKind, ClearValues, DrawCommand, DrawKind, GraphicsBackend,
    InitRequest, InitStrategy, NativeHandle, Rect, ShaderSource, StateField, StateSnapshot,
    TextureDescriptor, TextureFormat, TextureRegion, ViewId,
};

use super::context::WgpuGraphicsContext;
use super::conversions::IntoWgpu;
use super::pipeline::{culls_everything, PipelineCache, PipelineCacheStats, PipelineKey};
use super::resources::ResourceTable;
use super::strategy::{backend_name, AdapterPlan};
use super::uniforms::{transform_bind_group_layout, TransformRing};

/// Tunables of the `wgpu` backend.
#[derive(Debug, Clone)]
pub struct WgpuBackendConfig {
    /// Native APIs the windowed and minimal strategies may pick from.
    pub backends: wgpu::Backends,
    /// Adapter preference of the windowed strategy.
    pub power_preference: wgpu::PowerPreference,
    /// Present with mailbox when the surface supports it, FIFO otherwise.
    pub prefer_mailbox: bool,
    /// Depth buffer shared by every view.
    pub depth_format: TextureFormat,
    /// Initial number of per-draw transform slots. Grows on demand.
    pub transform_capacity: u32,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_mailbox: true,
            depth_format: TextureFormat::Depth32Float,
            transform_capacity: 4096,
        }
    }
}

/// Counters of the last presented frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WgpuFrameStats {
    /// Frames presented since initialization.
    pub frame_number: u64,
    /// Draws executed in the last frame.
    pub draw_calls: u32,
    /// Draws dropped while recording or replaying the last frame.
    pub dropped_draws: u32,
    /// Render passes encoded in the last frame.
    pub passes: u32,
}

/// A draw with every native object it needs resolved at submission time.
#[derive(Debug)]
struct RecordedDraw {
    pipeline: Arc<wgpu::RenderPipeline>,
    vertex_buffer: Arc<wgpu::Buffer>,
    index_buffer: Option<(Arc<wgpu::Buffer>, wgpu::IndexFormat)>,
    texture: Arc<wgpu::BindGroup>,
    transform_slot: u32,
    viewport: Rect,
    scissor: Option<Rect>,
    kind: DrawKind,
}

/// Clips `rect` to a `width` x `height` target.
///
/// Returns `(x, y, width, height)`, or `None` when nothing is left.
fn clip_rect(rect: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (i64::from(width), i64::from(height));
    let left = i64::from(rect.x).clamp(0, w);
    let top = i64::from(rect.y).clamp(0, h);
    let right = (i64::from(rect.x) + i64::from(rect.width)).clamp(0, w);
    let bottom = (i64::from(rect.y) + i64::from(rect.height)).clamp(0, h);
    (right > left && bottom > top).then(|| {
        (
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        )
    })
}

/// The viewport a draw renders to. A zero-sized viewport covers the target.
fn resolve_viewport(viewport: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if viewport.width == 0 || viewport.height == 0 {
        return Some((0, 0, width, height));
    }
    clip_rect(viewport, width, height)
}

fn create_depth_view(
    device: &wgpu::Device,
    format: TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Veil Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: format.into_wgpu(),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Everything that lives as long as one device.
#[derive(Debug)]
struct DeviceState {
    context: WgpuGraphicsContext,
    resources: ResourceTable,
    transform_layout: wgpu::BindGroupLayout,
    pipelines: PipelineCache,
    transforms: TransformRing,
    depth_view: wgpu::TextureView,
    clears: BTreeMap<ViewId, ClearValues>,
    recorded: BTreeMap<ViewId, Vec<RecordedDraw>>,
    frame_transforms: Vec<[[f32; 4]; 4]>,
}

impl DeviceState {
    fn new(context: WgpuGraphicsContext, config: &WgpuBackendConfig) -> Self {
        let device = &context.device;
        let resources = ResourceTable::new(device, &context.queue);
        let transform_layout = transform_bind_group_layout(device);
        let pipelines = PipelineCache::new(
            device,
            &[&transform_layout, resources.texture_layout()],
            context.color_format,
            config.depth_format.into_wgpu(),
        );
        let transforms = TransformRing::new(
            device,
            &transform_layout,
            config.transform_capacity,
            device.limits().min_uniform_buffer_offset_alignment,
        );
        let depth_view = create_depth_view(device, config.depth_format, context.width, context.height);
        Self {
            context,
            resources,
            transform_layout,
            pipelines,
            transforms,
            depth_view,
            clears: BTreeMap::new(),
            recorded: BTreeMap::new(),
            frame_transforms: Vec::new(),
        }
    }

    /// Resolves every native object `command` needs.
    fn record(&mut self, command: &DrawCommand) -> Result<RecordedDraw, BackendError> {
        let device = &self.context.device;
        let vertex = self
            .resources
            .buffer(command.vertex_buffer)
            .ok_or(BackendError::InvalidHandle(command.vertex_buffer))?;
        let BufferKind::Vertex(layout) = &vertex.kind else {
            return Err(BackendError::Validation(format!(
                "{:?} is not a vertex buffer",
                command.vertex_buffer
            )));
        };
        let layout = Arc::clone(layout);
        let vertex_buffer = Arc::clone(&vertex.buffer);

        let index_buffer = match command.kind {
            DrawKind::Indexed {
                index_buffer,
                index_format,
                ..
            } => {
                let entry = self
                    .resources
                    .buffer(index_buffer)
                    .ok_or(BackendError::InvalidHandle(index_buffer))?;
                if !matches!(entry.kind, BufferKind::Index(_)) {
                    return Err(BackendError::Validation(format!(
                        "{index_buffer:?} is not an index buffer"
                    )));
                }
                Some((Arc::clone(&entry.buffer), index_format))
            }
            DrawKind::NonIndexed { .. } => None,
        };

        let program = self
            .resources
            .program(command.program)
            .ok_or(BackendError::InvalidHandle(command.program))?
            .clone();
        let snapshot = command.state.snapshot();
        let key = PipelineKey::new(
            command.program,
            layout,
            &command.state,
            command.topology,
            index_buffer.as_ref().map(|(_, format)| *format),
        );
        let pipeline = self.pipelines.get_or_create(device, key, &program, &snapshot);
        let texture = self.resources.texture_bind_group(device, command.texture);

        let transform_slot = self.frame_transforms.len() as u32;
        self.frame_transforms.push(command.transform);

        Ok(RecordedDraw {
            pipeline,
            vertex_buffer,
            index_buffer: index_buffer.map(|(buffer, format)| (buffer, format.into_wgpu())),
            texture,
            transform_slot,
            viewport: snapshot.viewport,
            scissor: snapshot.scissor.enabled.then_some(snapshot.scissor.rect),
            kind: command.kind,
        })
    }
}

/// A [`GraphicsBackend`] rendering through `wgpu`.
///
/// Draws are recorded per view as they are submitted and replayed by
/// [`GraphicsBackend::frame`], one render pass per view in ascending view
/// order, all onto the same color target.
#[derive(Debug)]
pub struct WgpuBackend {
    config: WgpuBackendConfig,
    state: Option<DeviceState>,
    applied: StateSnapshot,
    stats: WgpuFrameStats,
    dropped_this_frame: u32,
}

impl WgpuBackend {
    /// Creates an uninitialized backend.
    pub fn new(config: WgpuBackendConfig) -> Self {
        Self {
            config,
            state: None,
            applied: StateSnapshot::default(),
            stats: WgpuFrameStats::default(),
            dropped_this_frame: 0,
        }
    }

    /// `true` while a device is alive.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// The state assembled from individual [`GraphicsBackend::set_state`] calls.
    ///
    /// Draws carry their full state, so this only mirrors what the caller asserted.
    pub fn applied_state(&self) -> &StateSnapshot {
        &self.applied
    }

    /// Pipeline cache counters of the current device.
    pub fn pipeline_stats(&self) -> PipelineCacheStats {
        self.state
            .as_ref()
            .map(|state| state.pipelines.stats())
            .unwrap_or_default()
    }

    /// Counters of the last presented frame.
    pub fn frame_stats(&self) -> WgpuFrameStats {
        self.stats
    }

    /// Number of live native buffers, textures and programs.
    pub fn live_objects(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |state| state.resources.live_objects())
    }

    /// Bytes held by live buffers and textures.
    pub fn vram_allocated_bytes(&self) -> u64 {
        self.state
            .as_ref()
            .map_or(0, |state| state.resources.vram_allocated_bytes())
    }

    fn device_state(&mut self) -> Result<&mut DeviceState, BackendError> {
        self.state.as_mut().ok_or(BackendError::NotInitialized)
    }
}

impl Default for WgpuBackend {
    fn default() -> Self {
        Self::new(WgpuBackendConfig::default())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn init(&mut self, strategy: InitStrategy, request: &InitRequest) -> Result<BackendInfo, BackendError> {
        // Strategies never share state with an earlier attempt.
        if self.state.take().is_some() {
            log::debug!("WgpuBackend: dropping the previous device before {strategy:?}");
        }
        let plan = AdapterPlan::for_strategy(strategy, &self.config);
        log::info!("WgpuBackend: trying {strategy:?} ({:?})", plan.backends);

        let context = pollster::block_on(WgpuGraphicsContext::new(
            plan,
            &self.config,
            request.window.clone(),
            request.width,
            request.height,
            &request.cancel,
        ))
        .map_err(|e| {
            log::warn!("WgpuBackend: {strategy:?} failed: {e:#}");
            BackendError::Unsupported(format!("{e:#}"))
        })?;

        let info = BackendInfo {
            adapter_name: context.adapter_name.clone(),
            api: backend_name(context.adapter_backend).to_owned(),
            strategy,
        };
        log::info!(
            "WgpuBackend: initialized on \"{}\" ({}) with {strategy:?}, {}",
            info.adapter_name,
            info.api,
            if context.presents() { "presenting to the window" } else { "rendering offscreen" }
        );
        self.state = Some(DeviceState::new(context, &self.config));
        self.applied = StateSnapshot::default();
        self.stats = WgpuFrameStats::default();
        Ok(info)
    }

    fn reset(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        let depth_format = self.config.depth_format;
        let state = self.device_state()?;
        if width == 0 || height == 0 {
            log::debug!("WgpuBackend: ignoring reset to {width}x{height}");
            return Ok(());
        }
        state.context.resize(width, height);
        state.depth_view = create_depth_view(&state.context.device, depth_format, width, height);
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            log::info!(
                "WgpuBackend: shutting down \"{}\" ({} live objects)",
                state.context.adapter_name,
                state.resources.live_objects()
            );
        }
    }

    fn create_buffer(&mut self, kind: &BufferKind, data: &[u8]) -> Result<NativeHandle, BackendError> {
        let state = self.device_state()?;
        Ok(state.resources.create_buffer(&state.context.device, kind, data))
    }

    fn destroy_buffer(&mut self, handle: NativeHandle) {
        if let Some(state) = self.state.as_mut() {
            if !state.resources.destroy_buffer(handle) {
                log::warn!("WgpuBackend: destroy of unknown buffer {handle:?}");
            }
        }
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError> {
        let state = self.device_state()?;
        state
            .resources
            .create_texture(&state.context.device, &state.context.queue, descriptor, data)
    }

    fn update_texture(
        &mut self,
        handle: NativeHandle,
        region: &TextureRegion,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let state = self.device_state()?;
        state
            .resources
            .update_texture(&state.context.queue, handle, region, data)
    }

    fn destroy_texture(&mut self, handle: NativeHandle) {
        if let Some(state) = self.state.as_mut() {
            if !state.resources.destroy_texture(handle) {
                log::warn!("WgpuBackend: destroy of unknown texture {handle:?}");
            }
        }
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<NativeHandle, BackendError> {
        let state = self.device_state()?;
        state.resources.create_program(&state.context.device, source)
    }

    fn destroy_program(&mut self, handle: NativeHandle) {
        if let Some(state) = self.state.as_mut() {
            if state.resources.destroy_program(handle) {
                state.pipelines.forget_program(handle);
            } else {
                log::warn!("WgpuBackend: destroy of unknown program {handle:?}");
            }
        }
    }

    fn set_state(&mut self, field: StateField) {
        log::trace!("WgpuBackend: state {field:?}");
        self.applied = self.applied.with(field);
    }

    fn set_clear(&mut self, view: ViewId, clear: ClearValues) {
        if let Some(state) = self.state.as_mut() {
            state.clears.insert(view, clear);
        }
    }

    fn submit(&mut self, command: &DrawCommand) {
        let Some(state) = self.state.as_mut() else {
            log::warn!("WgpuBackend: draw submitted without a device");
            return;
        };
        if culls_everything(&command.state.snapshot(), command.topology) {
            log::trace!("WgpuBackend: front-and-back culling drops {:?}", command.kind);
            return;
        }
        match state.record(command) {
            Ok(draw) => state.recorded.entry(command.view).or_default().push(draw),
            Err(e) => {
                log::warn!("WgpuBackend: dropping draw on {:?}: {e}", command.view);
                self.dropped_this_frame += 1;
            }
        }
    }

    fn frame(&mut self) -> Result<(), BackendError> {
        let mut dropped = std::mem::take(&mut self.dropped_this_frame);
        let state = self.state.as_mut().ok_or(BackendError::NotInitialized)?;
        let recorded = std::mem::take(&mut state.recorded);
        let transforms = std::mem::take(&mut state.frame_transforms);

        let target = state.context.acquire().map_err(|e| {
            log::error!("WgpuBackend: cannot acquire a frame: {e:#}");
            BackendError::Native(format!("{e:#}"))
        })?;

        let device = &state.context.device;
        let queue = &state.context.queue;
        state
            .transforms
            .upload(device, queue, &state.transform_layout, &transforms);

        let mut views: Vec<ViewId> = recorded.keys().chain(state.clears.keys()).copied().collect();
        views.sort_unstable();
        views.dedup();
        if views.is_empty() {
            // Still clear the target so the presented image is defined.
            views.push(ViewId::default());
        }

        let (width, height) = (state.context.width, state.context.height);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Veil Frame Encoder"),
        });
        let mut draw_calls = 0u32;
        for (pass_index, view) in views.iter().enumerate() {
            let clear = state.clears.get(view).copied();
            let color_load = match clear {
                Some(values) => wgpu::LoadOp::Clear(values.into_wgpu()),
                None if pass_index == 0 => wgpu::LoadOp::Clear(ClearValues::default().into_wgpu()),
                None => wgpu::LoadOp::Load,
            };
            let depth_load = match clear {
                Some(values) => wgpu::LoadOp::Clear(values.depth),
                None if pass_index == 0 => wgpu::LoadOp::Clear(ClearValues::default().depth),
                None => wgpu::LoadOp::Load,
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Veil View Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &state.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in recorded.get(view).map(Vec::as_slice).unwrap_or_default() {
                let Some((vx, vy, vw, vh)) = resolve_viewport(draw.viewport, width, height) else {
                    log::trace!("WgpuBackend: viewport {:?} is off target", draw.viewport);
                    dropped += 1;
                    continue;
                };
                let scissor = match draw.scissor {
                    Some(rect) => match clip_rect(rect, width, height) {
                        Some(clipped) => clipped,
                        None => {
                            log::trace!("WgpuBackend: empty scissor {rect:?}");
                            dropped += 1;
                            continue;
                        }
                    },
                    None => (0, 0, width, height),
                };

                render_pass.set_pipeline(&draw.pipeline);
                render_pass.set_bind_group(
                    0,
                    state.transforms.bind_group(),
                    &[state.transforms.offset(draw.transform_slot)],
                );
                render_pass.set_bind_group(1, draw.texture.as_ref(), &[]);
                render_pass.set_viewport(vx as f32, vy as f32, vw as f32, vh as f32, 0.0, 1.0);
                render_pass.set_scissor_rect(scissor.0, scissor.1, scissor.2, scissor.3);
                render_pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
                match (draw.kind, &draw.index_buffer) {
                    (
                        DrawKind::Indexed {
                            first_index,
                            index_count,
                            base_vertex,
                            ..
                        },
                        Some((buffer, format)),
                    ) => {
                        render_pass.set_index_buffer(buffer.slice(..), *format);
                        render_pass.draw_indexed(first_index..first_index + index_count, base_vertex, 0..1);
                    }
                    (
                        DrawKind::NonIndexed {
                            first_vertex,
                            vertex_count,
                        },
                        _,
                    ) => render_pass.draw(first_vertex..first_vertex + vertex_count, 0..1),
                    (DrawKind::Indexed { .. }, None) => {
                        dropped += 1;
                        continue;
                    }
                }
                draw_calls += 1;
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        if let Some(surface_texture) = target.surface_texture {
            surface_texture.present();
        }

        self.stats = WgpuFrameStats {
            frame_number: self.stats.frame_number + 1,
            draw_calls,
            dropped_draws: dropped,
            passes: views.len() as u32,
        };
        log::trace!("WgpuBackend: frame {:?}", self.stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{
        AttributeConversion, CancelToken, CompiledLayout, ComponentType, IndexFormat,
        NativeVertexAttribute, PrimitiveTopology, ProgramKind, StateToken,
        VertexAttributeDescriptor, VertexFormat, VertexLayout, VertexSemantic, IDENTITY,
    };

    #[test]
    fn test_clip_rect_trims_to_target() {
        assert_eq!(clip_rect(Rect::new(-10, -10, 50, 50), 32, 32), Some((0, 0, 32, 32)));
        assert_eq!(clip_rect(Rect::new(8, 4, 8, 8), 32, 32), Some((8, 4, 8, 8)));
    }

    #[test]
    fn test_clip_rect_off_target_is_empty() {
        assert_eq!(clip_rect(Rect::new(40, 0, 8, 8), 32, 32), None);
        assert_eq!(clip_rect(Rect::new(-8, 0, 8, 8), 32, 32), None);
        assert_eq!(clip_rect(Rect::new(0, 0, 0, 8), 32, 32), None);
    }

    #[test]
    fn test_zero_viewport_covers_target() {
        assert_eq!(resolve_viewport(Rect::default(), 640, 480), Some((0, 0, 640, 480)));
        assert_eq!(resolve_viewport(Rect::new(0, 0, 320, 240), 640, 480), Some((0, 0, 320, 240)));
    }

    #[test]
    fn test_calls_without_device_report_not_initialized() {
        let mut backend = WgpuBackend::default();
        assert!(!backend.is_initialized());
        assert_eq!(
            backend.create_program(&ShaderSource::Builtin(ProgramKind::Minimal)),
            Err(BackendError::NotInitialized)
        );
        assert_eq!(backend.frame(), Err(BackendError::NotInitialized));
        assert_eq!(backend.reset(800, 600), Err(BackendError::NotInitialized));
        // Destroys and draws without a device are no-ops.
        backend.destroy_buffer(NativeHandle(0));
        backend.shutdown();
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_set_state_is_mirrored() {
        let mut backend = WgpuBackend::default();
        backend.set_state(StateField::DepthTest(true));
        backend.set_state(StateField::Blend(true));
        assert!(backend.applied_state().depth_test_enabled);
        assert!(backend.applied_state().blend_enabled);
    }

    fn offscreen_request() -> InitRequest {
        InitRequest {
            width: 64,
            height: 64,
            window: None,
            cancel: CancelToken::new(),
        }
    }

    #[test]
    #[ignore = "needs a GPU adapter"]
    fn test_minimal_strategy_renders_offscreen() {
        let mut backend = WgpuBackend::default();
        let info = backend
            .init(InitStrategy::Minimal, &offscreen_request())
            .expect("minimal strategy should find an adapter");
        assert_eq!(info.strategy, InitStrategy::Minimal);

        let source = VertexAttributeDescriptor::new(VertexSemantic::Position, 3, ComponentType::Float32, false);
        let layout = Arc::new(CompiledLayout {
            signature: VertexLayout::new(vec![source]).signature(),
            array_stride: 12,
            source_stride: 12,
            attributes: vec![NativeVertexAttribute {
                shader_location: 0,
                format: VertexFormat::Float32x3,
                offset: 0,
                source,
                source_offset: 0,
                conversion: AttributeConversion::Copy,
            }],
        });
        let vertices: [[f32; 3]; 3] = [[0.0, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];
        let vertex_buffer = backend
            .create_buffer(&BufferKind::Vertex(layout), bytemuck::cast_slice(&vertices))
            .expect("vertex buffer");
        let index_buffer = backend
            .create_buffer(&BufferKind::Index(IndexFormat::Uint16), bytemuck::cast_slice(&[0u16, 1, 2, 0]))
            .expect("index buffer");
        let program = backend
            .create_program(&ShaderSource::Builtin(ProgramKind::Minimal))
            .expect("program");

        backend.set_clear(ViewId(0), ClearValues::default());
        let token = StateToken::from_snapshot(&StateSnapshot::default());
        let draw = DrawCommand {
            view: ViewId(0),
            program,
            vertex_buffer,
            state: token,
            topology: PrimitiveTopology::TriangleList,
            kind: DrawKind::NonIndexed {
                first_vertex: 0,
                vertex_count: 3,
            },
            texture: NativeHandle::INVALID,
            transform: IDENTITY,
        };
        backend.submit(&draw);
        backend.submit(&DrawCommand {
            view: ViewId(1),
            kind: DrawKind::Indexed {
                index_buffer,
                index_format: IndexFormat::Uint16,
                first_index: 0,
                index_count: 3,
                base_vertex: 0,
            },
            ..draw
        });
        backend.frame().expect("frame");

        let stats = backend.frame_stats();
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.passes, 2);
        assert_eq!(backend.pipeline_stats().misses, 1, "both draws share one pipeline");

        backend.shutdown();
        assert!(!backend.is_initialized());
    }

    #[test]
    #[ignore = "needs a GPU adapter"]
    fn test_texture_update_validates_region() {
        let mut backend = WgpuBackend::default();
        backend
            .init(InitStrategy::Minimal, &offscreen_request())
            .expect("minimal strategy should find an adapter");
        let descriptor = TextureDescriptor {
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8Unorm,
            mip_level_count: 1,
        };
        let texture = backend
            .create_texture(&descriptor, Some(&[0u8; 64]))
            .expect("texture");
        let region = TextureRegion {
            mip_level: 0,
            x: 2,
            y: 2,
            width: 2,
            height: 2,
        };
        assert_eq!(backend.update_texture(texture, &region, &[0xFF; 16]), Ok(()));
        assert!(matches!(
            backend.update_texture(texture, &TextureRegion { x: 3, ..region }, &[0xFF; 16]),
            Err(BackendError::Validation(_))
        ));
        backend.destroy_texture(texture);
        assert_eq!(backend.vram_allocated_bytes(), 0);
    }
}
