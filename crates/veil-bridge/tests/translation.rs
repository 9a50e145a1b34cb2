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

//! End-to-end behaviour of the translation components behind the bridge.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use veil_bridge::layout::LayoutTranslator;
use veil_bridge::SubmitOutcome;
use veil_core::{
    CallOutcome, ComponentType, DrawKind, DrawState, IndexFormat, InterceptedCall, MeshDraw, MeshId,
    MissReason, NativeHandle, ProgramKind, ResourceRequest, ShaderSource, SourceFormat, StateField,
    StateSnapshot, TextureRegion, VertexLayout, VertexSemantic,
};

#[test]
fn test_identical_layouts_share_one_compiled_layout() {
    let mut translator = LayoutTranslator::new();
    let make = || {
        VertexLayout::new(vec![
            attr(VertexSemantic::Position, 3, ComponentType::Float32, false),
            attr(VertexSemantic::TexCoord0, 2, ComponentType::Float32, false),
        ])
    };
    let a = translator.compile(&make());
    let b = translator.compile(&make());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(translator.stats().hits, 1);
}

#[test]
fn test_vertex_buffers_with_repeated_layouts_hit_the_layout_cache() {
    let (mut bridge, _backend) = running_bridge();
    let layout = VertexLayout::new(vec![attr(VertexSemantic::Position, 3, ComponentType::Float32, false)]);
    for _ in 0..10 {
        let id = bridge.create_resource(ResourceRequest::Vertex {
            data: vec![0; 12 * 4],
            layout: layout.clone(),
        });
        assert!(id.is_valid());
    }
    let stats = bridge.layout_stats();
    assert_eq!((stats.misses, stats.hits), (1, 9));
}

#[test]
fn test_reasserting_the_same_snapshot_forwards_nothing() {
    let (mut bridge, backend) = running_bridge();
    let snapshot = StateSnapshot {
        depth_test_enabled: true,
        blend_enabled: true,
        ..StateSnapshot::default()
    };
    bridge.apply_state(snapshot);
    let forwarded = backend.lock().state_calls.len();
    let suppressed = bridge.frame_stats().state_changes_suppressed;

    for _ in 0..1000 {
        bridge.apply_state(snapshot);
    }
    assert_eq!(backend.lock().state_calls.len(), forwarded);
    assert_eq!(
        bridge.frame_stats().state_changes_suppressed - suppressed,
        1000 * StateSnapshot::FIELD_COUNT as u64
    );
}

#[test]
fn test_created_then_destroyed_resource_resolves_to_invalid() {
    let (mut bridge, backend) = running_bridge();
    let outcome = bridge.handle(InterceptedCall::ResourceCreate(ResourceRequest::Index {
        data: vec![0, 0, 1, 0, 2, 0],
        format: IndexFormat::Uint16,
    }));
    let CallOutcome::Created(id) = outcome else {
        panic!("expected a created resource, got {outcome:?}");
    };
    assert!(bridge.resolve(id).is_valid());

    bridge.handle(InterceptedCall::ResourceDestroy(id));
    bridge.handle(InterceptedCall::ResourceDestroy(id));
    assert_eq!(bridge.resolve(id), NativeHandle::INVALID);
    assert_eq!(backend.lock().live_objects(), 0);
    assert_eq!(backend.lock().frees, 1);
}

#[test]
fn test_native_allocation_failure_returns_null_id() {
    let mock = MockBackend {
        fail_allocations: true,
        ..MockBackend::default()
    };
    let (mut bridge, _backend) = bridge_with(mock, inline_settings());
    bridge.begin_frame(64, 64);
    let outcome = bridge.handle(InterceptedCall::ResourceCreate(ResourceRequest::Shader(
        ShaderSource::Binary(vec![1, 2, 3]),
    )));
    assert_eq!(outcome, CallOutcome::Failed);
    assert_eq!(bridge.registry_stats().live, 0);
}

#[test]
fn test_draw_with_destroyed_program_never_reaches_backend() {
    let (mut bridge, backend) = running_bridge();
    let program = bridge.create_resource(ResourceRequest::Shader(ShaderSource::Binary(vec![0])));
    bridge.destroy_resource(program);

    let mut draw = position_mesh(1, &TRIANGLE);
    draw.draw_state.program_override = Some(program);
    assert!(matches!(bridge.draw(&draw), SubmitOutcome::Skipped(_)));
    assert!(backend.lock().submitted.is_empty());
    assert_eq!(bridge.frame_stats().draws_skipped, 1);
}

#[test]
fn test_zero_vertex_draw_is_skipped() {
    let (mut bridge, backend) = running_bridge();
    let mut draw = position_mesh(1, &TRIANGLE);
    draw.draw_state.vertex_count = 0;
    assert_eq!(bridge.handle(InterceptedCall::Draw(draw)), CallOutcome::Skipped);
    assert!(backend.lock().submitted.is_empty());
}

#[test]
fn test_draw_past_end_of_vertex_buffer_is_skipped_alone() {
    let (mut bridge, backend) = running_bridge();
    let mut overrun = position_mesh(1, &TRIANGLE);
    overrun.draw_state.vertex_count = 1000;
    assert_eq!(bridge.draw(&overrun), SubmitOutcome::Skipped(MissReason::OutOfRange));

    let mut overrun_indices = position_mesh(2, &TRIANGLE);
    overrun_indices.index_data = Some(Arc::from(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2])));
    overrun_indices.draw_state.index_count = 6;
    assert_eq!(bridge.draw(&overrun_indices), SubmitOutcome::Skipped(MissReason::OutOfRange));

    assert_eq!(bridge.draw(&position_mesh(3, &TRIANGLE)), SubmitOutcome::Submitted);
    let log = backend.lock();
    assert_eq!(log.submitted.len(), 1);
    assert_eq!(
        log.submitted[0].kind,
        DrawKind::NonIndexed {
            first_vertex: 0,
            vertex_count: 3
        }
    );
}

#[test]
fn test_partial_texture_update_only_touches_its_region() {
    let (mut bridge, backend) = running_bridge();
    let base: Vec<u8> = (0..64 * 64 * 4).map(|i| (i % 251) as u8).collect();
    let id = bridge.create_resource(ResourceRequest::Texture {
        width: 64,
        height: 64,
        format: SourceFormat::Rgba8,
        mip_levels: 1,
        data: Some(base.clone()),
    });
    let native = bridge.resolve(id);
    let allocations = backend.lock().allocations;

    let region = TextureRegion {
        mip_level: 0,
        x: 10,
        y: 10,
        width: 4,
        height: 4,
    };
    let outcome = bridge.handle(InterceptedCall::TextureUpload {
        id,
        region,
        pixels: vec![0xEE; 4 * 4 * 4],
    });
    assert_eq!(outcome, CallOutcome::Applied);

    let log = backend.lock();
    assert_eq!(log.allocations, allocations, "update must not reallocate");
    let texels = log.texels(native).unwrap();
    for y in 0..64usize {
        for x in 0..64usize {
            let at = (y * 64 + x) * 4;
            let inside = (10..14).contains(&x) && (10..14).contains(&y);
            let expected: &[u8] = if inside { &[0xEE; 4] } else { &base[at..at + 4] };
            assert_eq!(&texels[at..at + 4], expected, "texel ({x}, {y})");
        }
    }
}

#[test]
fn test_position_color_uv0_mesh_uses_textured_color_program() {
    let (mut bridge, backend) = running_bridge();
    let layout = VertexLayout::new(vec![
        attr(VertexSemantic::Position, 3, ComponentType::Float32, false),
        attr(VertexSemantic::Color, 4, ComponentType::UInt8, true),
        attr(VertexSemantic::TexCoord0, 2, ComponentType::Float32, false),
    ]);
    let stride = 12 + 4 + 8;
    let draw = MeshDraw {
        mesh_id: MeshId(42),
        vertex_data: Arc::from(vec![0u8; stride * 3]),
        index_data: None,
        layout,
        draw_state: DrawState {
            vertex_count: 3,
            ..DrawState::default()
        },
    };
    assert_eq!(bridge.draw(&draw), SubmitOutcome::Submitted);

    let log = backend.lock();
    let program = log.submitted[0].program;
    assert_eq!(log.programs[&program], ShaderSource::Builtin(ProgramKind::TexturedColor));
}

#[test]
fn test_indexed_mesh_is_drawn_indexed_and_reused() {
    let (mut bridge, backend) = running_bridge();
    let quad = [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let mut draw = position_mesh(5, &quad);
    draw.index_data = Some(Arc::from(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2, 2, 3, 0])));
    draw.draw_state.index_count = 6;

    bridge.draw(&draw);
    let allocations = backend.lock().allocations;
    bridge.draw(&draw);

    let log = backend.lock();
    assert_eq!(log.allocations, allocations);
    assert_eq!(log.submitted.len(), 2);
    assert!(matches!(
        log.submitted[1].kind,
        DrawKind::Indexed {
            index_count: 6,
            index_format: IndexFormat::Uint16,
            ..
        }
    ));
    assert_eq!(bridge.mesh_stats().hits, 1);
}

#[test]
fn test_released_mesh_frees_its_buffers() {
    let (mut bridge, backend) = running_bridge();
    bridge.draw(&position_mesh(9, &TRIANGLE));
    let live = backend.lock().live_objects();
    bridge.handle(InterceptedCall::MeshRelease(MeshId(9)));
    assert_eq!(backend.lock().live_objects(), live - 1);
}

#[test]
fn test_draw_order_is_preserved() {
    let (mut bridge, backend) = running_bridge();
    for mesh in [3u64, 1, 2] {
        bridge.draw(&position_mesh(mesh, &TRIANGLE));
    }
    let log = backend.lock();
    let buffers: Vec<NativeHandle> = log.submitted.iter().map(|d| d.vertex_buffer).collect();
    let mut sorted = buffers.clone();
    sorted.sort();
    assert_eq!(log.submitted.len(), 3);
    assert_eq!(buffers, sorted, "buffers are allocated in draw order");
}

#[test]
fn test_draw_carries_full_state_token() {
    let (mut bridge, backend) = running_bridge();
    bridge.set_state(StateField::DepthTest(true));
    bridge.set_state(StateField::Blend(true));
    bridge.draw(&position_mesh(1, &TRIANGLE));

    let token = backend.lock().submitted[0].state;
    let snapshot = token.snapshot();
    assert!(snapshot.depth_test_enabled);
    assert!(snapshot.blend_enabled);
    assert_eq!(token, bridge.current_state());
}
