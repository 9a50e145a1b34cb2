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

//! Shared fixtures for the bridge integration tests.

#![allow(dead_code)]

#[path = "../../src/testing.rs"]
mod testing;

pub use testing::{MockBackend, SharedBackend};

use std::sync::Arc;
use veil_bridge::Bridge;
use veil_core::{
    BridgeSettings, ComponentType, DrawState, MeshDraw, MeshId, VertexAttributeDescriptor,
    VertexLayout, VertexSemantic,
};

/// Settings that keep device creation on the calling thread.
pub fn inline_settings() -> BridgeSettings {
    BridgeSettings {
        init_on_worker: false,
        ..BridgeSettings::default()
    }
}

/// A bridge over a fresh mock backend, plus a handle to its log.
pub fn bridge_with(mock: MockBackend, settings: BridgeSettings) -> (Bridge, SharedBackend) {
    let backend = SharedBackend::new(mock);
    let bridge = Bridge::new(Box::new(backend.clone()), settings);
    (bridge, backend)
}

/// A bridge whose device is already up.
pub fn running_bridge() -> (Bridge, SharedBackend) {
    let (mut bridge, backend) = bridge_with(MockBackend::default(), inline_settings());
    bridge.begin_frame(640, 480);
    (bridge, backend)
}

pub fn attr(semantic: VertexSemantic, count: u8, ty: ComponentType, normalized: bool) -> VertexAttributeDescriptor {
    VertexAttributeDescriptor::new(semantic, count, ty, normalized)
}

/// A non-indexed mesh of `vertices` 2D positions.
pub fn position_mesh(mesh: u64, vertices: &[[f32; 2]]) -> MeshDraw {
    MeshDraw {
        mesh_id: MeshId(mesh),
        vertex_data: Arc::from(bytemuck::cast_slice::<[f32; 2], u8>(vertices)),
        index_data: None,
        layout: VertexLayout::new(vec![attr(VertexSemantic::Position, 2, ComponentType::Float32, false)]),
        draw_state: DrawState {
            vertex_count: vertices.len() as i32,
            ..DrawState::default()
        },
    }
}

pub const TRIANGLE: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
