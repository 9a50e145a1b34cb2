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

//! Render pipelines built from (program, vertex layout, state bits, topology).

use std::collections::HashMap;
use std::sync::Arc;
use veil_core::{
    CompiledLayoutRef, CullFace, IndexFormat, LayoutSignature, NativeHandle, PrimitiveTopology,
    ProgramKind, StateSnapshot, StateToken,
};

use super::conversions::IntoWgpu;
use super::shaders::{builtin_wgsl, FRAGMENT_ENTRY, VERTEX_ENTRY};

/// What a native program handle stands for.
#[derive(Debug, Clone)]
pub(crate) enum ProgramEntry {
    /// Generated per vertex layout at pipeline creation.
    Builtin(ProgramKind),
    /// Caller-supplied WGSL, compiled once.
    Custom(Arc<wgpu::ShaderModule>),
}

/// Everything that selects a distinct render pipeline.
///
/// Viewport and scissor are dynamic and therefore not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: NativeHandle,
    pub layout: CompiledLayoutRef,
    pub state_bits: u64,
    pub topology: PrimitiveTopology,
    /// Set for indexed strip draws only.
    pub strip_index_format: Option<IndexFormat>,
}

impl PipelineKey {
    pub fn new(
        program: NativeHandle,
        layout: CompiledLayoutRef,
        state: &StateToken,
        topology: PrimitiveTopology,
        index_format: Option<IndexFormat>,
    ) -> Self {
        let is_strip = matches!(
            topology,
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip
        );
        Self {
            program,
            layout,
            state_bits: state.pipeline_bits(),
            topology,
            strip_index_format: index_format.filter(|_| is_strip),
        }
    }
}

/// The fixed-function part of a pipeline, translated from a state snapshot.
#[derive(Debug, Clone)]
pub(crate) struct FixedFunctionState {
    pub primitive: wgpu::PrimitiveState,
    pub depth_stencil: wgpu::DepthStencilState,
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: wgpu::ColorWrites,
}

/// `true` when the state culls every triangle the draw could produce.
pub(crate) fn culls_everything(state: &StateSnapshot, topology: PrimitiveTopology) -> bool {
    let triangles = matches!(
        topology,
        PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip
    );
    triangles && state.cull_enabled && state.cull_mode == CullFace::FrontAndBack
}

/// Translates a snapshot into `wgpu` pipeline state.
pub(crate) fn fixed_function_state(
    state: &StateSnapshot,
    topology: PrimitiveTopology,
    strip_index_format: Option<IndexFormat>,
    depth_format: wgpu::TextureFormat,
) -> FixedFunctionState {
    let cull_mode = if state.cull_enabled {
        state.cull_mode.into_wgpu()
    } else {
        None
    };
    let primitive = wgpu::PrimitiveState {
        topology: topology.into_wgpu(),
        strip_index_format: strip_index_format.map(|f| f.into_wgpu()),
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    };

    // Disabling the depth test also disables depth writes.
    let depth_stencil = wgpu::DepthStencilState {
        format: depth_format,
        depth_write_enabled: state.depth_test_enabled && state.depth_write_enabled,
        depth_compare: if state.depth_test_enabled {
            state.depth_func.into_wgpu()
        } else {
            wgpu::CompareFunction::Always
        },
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    };

    let blend = state.blend_enabled.then(|| {
        let component = wgpu::BlendComponent {
            src_factor: state.blend_src.into_wgpu(),
            dst_factor: state.blend_dst.into_wgpu(),
            operation: wgpu::BlendOperation::Add,
        };
        wgpu::BlendState {
            color: component,
            alpha: component,
        }
    });

    FixedFunctionState {
        primitive,
        depth_stencil,
        blend,
        write_mask: state.color_mask.into_wgpu(),
    }
}

/// Hit/miss counters of the pipeline cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Pipelines created.
    pub misses: u64,
}

/// Caches render pipelines and the built-in shader modules they use.
#[derive(Debug)]
pub(crate) struct PipelineCache {
    layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    modules: HashMap<(ProgramKind, LayoutSignature), Arc<wgpu::ShaderModule>>,
    pipelines: HashMap<PipelineKey, Arc<wgpu::RenderPipeline>>,
    stats: PipelineCacheStats,
}

impl PipelineCache {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Veil Pipeline Layout"),
            bind_group_layouts,
            push_constant_ranges: &[],
        });
        Self {
            layout,
            color_format,
            depth_format,
            modules: HashMap::new(),
            pipelines: HashMap::new(),
            stats: PipelineCacheStats::default(),
        }
    }

    /// Returns the pipeline for `key`, creating it on first use.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        key: PipelineKey,
        program: &ProgramEntry,
        state: &StateSnapshot,
    ) -> Arc<wgpu::RenderPipeline> {
        if let Some(pipeline) = self.pipelines.get(&key) {
            self.stats.hits += 1;
            return Arc::clone(pipeline);
        }
        self.stats.misses += 1;

        let module = match program {
            ProgramEntry::Custom(module) => Arc::clone(module),
            ProgramEntry::Builtin(kind) => {
                let signature = key.layout.signature.clone();
                let layout = &key.layout;
                Arc::clone(self.modules.entry((*kind, signature)).or_insert_with(|| {
                    log::debug!("PipelineCache: generating {kind:?} program for a new layout");
                    Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
                        label: Some("Veil Builtin Program"),
                        source: wgpu::ShaderSource::Wgsl(builtin_wgsl(*kind, layout).into()),
                    }))
                }))
            }
        };

        let fixed = fixed_function_state(state, key.topology, key.strip_index_format, self.depth_format);
        let attributes: Vec<wgpu::VertexAttribute> = key
            .layout
            .attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: attribute.format.into_wgpu(),
                offset: attribute.offset as u64,
                shader_location: attribute.shader_location,
            })
            .collect();
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: key.layout.array_stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];
        let targets = [Some(wgpu::ColorTargetState {
            format: self.color_format,
            blend: fixed.blend,
            write_mask: fixed.write_mask,
        })];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Veil Render Pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &vertex_buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: fixed.primitive,
            depth_stencil: Some(fixed.depth_stencil),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        log::debug!(
            "PipelineCache: created pipeline #{} for program {:?} ({:?}, state {:#x})",
            self.pipelines.len() + 1,
            key.program,
            key.topology,
            key.state_bits
        );

        let pipeline = Arc::new(pipeline);
        self.pipelines.insert(key, Arc::clone(&pipeline));
        pipeline
    }

    /// Drops every pipeline built from `program`.
    pub fn forget_program(&mut self, program: NativeHandle) {
        self.pipelines.retain(|key, _| key.program != program);
    }

    pub fn stats(&self) -> PipelineCacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_core::{BlendFactor, CompareFunction, StateField};

    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    #[test]
    fn test_disabled_depth_test_always_passes_and_never_writes() {
        let state = StateSnapshot {
            depth_test_enabled: false,
            depth_write_enabled: true,
            depth_func: CompareFunction::Greater,
            ..StateSnapshot::default()
        };
        let fixed = fixed_function_state(&state, PrimitiveTopology::TriangleList, None, DEPTH);
        assert_eq!(fixed.depth_stencil.depth_compare, wgpu::CompareFunction::Always);
        assert!(!fixed.depth_stencil.depth_write_enabled);
    }

    #[test]
    fn test_enabled_depth_test_uses_configured_function() {
        let state = StateSnapshot::default()
            .with(StateField::DepthTest(true))
            .with(StateField::DepthFunc(CompareFunction::LessEqual));
        let fixed = fixed_function_state(&state, PrimitiveTopology::TriangleList, None, DEPTH);
        assert_eq!(fixed.depth_stencil.depth_compare, wgpu::CompareFunction::LessEqual);
        assert!(fixed.depth_stencil.depth_write_enabled);
    }

    #[test]
    fn test_blend_only_when_enabled() {
        let state = StateSnapshot::default()
            .with(StateField::BlendSrc(BlendFactor::SrcAlpha))
            .with(StateField::BlendDst(BlendFactor::OneMinusSrcAlpha));
        let off = fixed_function_state(&state, PrimitiveTopology::TriangleList, None, DEPTH);
        assert!(off.blend.is_none());

        let on = fixed_function_state(
            &state.with(StateField::Blend(true)),
            PrimitiveTopology::TriangleList,
            None,
            DEPTH,
        );
        let blend = on.blend.expect("blend state");
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn test_cull_mode_follows_enable_flag() {
        let state = StateSnapshot::default().with(StateField::CullMode(CullFace::Front));
        let fixed = fixed_function_state(&state, PrimitiveTopology::TriangleList, None, DEPTH);
        assert_eq!(fixed.primitive.cull_mode, None);

        let culled = fixed_function_state(
            &state.with(StateField::Cull(true)),
            PrimitiveTopology::TriangleList,
            None,
            DEPTH,
        );
        assert_eq!(culled.primitive.cull_mode, Some(wgpu::Face::Front));
    }

    #[test]
    fn test_front_and_back_culling_drops_only_triangles() {
        let state = StateSnapshot::default()
            .with(StateField::Cull(true))
            .with(StateField::CullMode(CullFace::FrontAndBack));
        assert!(culls_everything(&state, PrimitiveTopology::TriangleStrip));
        assert!(!culls_everything(&state, PrimitiveTopology::LineList));
        assert!(!culls_everything(&StateSnapshot::default(), PrimitiveTopology::TriangleList));
    }

    #[test]
    fn test_strip_index_format_only_kept_for_strips() {
        let layout = std::sync::Arc::new(veil_core::CompiledLayout {
            signature: veil_core::VertexLayout::default().signature(),
            array_stride: 0,
            source_stride: 0,
            attributes: Vec::new(),
        });
        let token = StateToken::from_snapshot(&StateSnapshot::default());
        let list = PipelineKey::new(
            NativeHandle(1),
            layout.clone(),
            &token,
            PrimitiveTopology::TriangleList,
            Some(IndexFormat::Uint16),
        );
        let strip = PipelineKey::new(
            NativeHandle(1),
            layout,
            &token,
            PrimitiveTopology::TriangleStrip,
            Some(IndexFormat::Uint16),
        );
        assert_eq!(list.strip_index_format, None);
        assert_eq!(strip.strip_index_format, Some(IndexFormat::Uint16));
    }

    #[test]
    fn test_scissor_does_not_split_pipeline_keys() {
        let layout = std::sync::Arc::new(veil_core::CompiledLayout {
            signature: veil_core::VertexLayout::default().signature(),
            array_stride: 0,
            source_stride: 0,
            attributes: Vec::new(),
        });
        let plain = StateSnapshot::default();
        let scissored = plain.with(StateField::Scissor(veil_core::Scissor {
            enabled: true,
            rect: veil_core::Rect::new(0, 0, 4, 4),
        }));
        let a = PipelineKey::new(
            NativeHandle(0),
            layout.clone(),
            &StateToken::from_snapshot(&plain),
            PrimitiveTopology::TriangleList,
            None,
        );
        let b = PipelineKey::new(
            NativeHandle(0),
            layout,
            &StateToken::from_snapshot(&scissored),
            PrimitiveTopology::TriangleList,
            None,
        );
        assert_eq!(a, b);
    }
}
