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

//! Draw commands as they reach the backend.

use crate::handle::{NativeHandle, ViewId};
use crate::mesh::{IndexFormat, PrimitiveTopology};
use crate::state::StateToken;

/// A range of vertices or indices as the application expressed it.
///
/// Counts are signed so that malformed ranges reach the submission guard
/// instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DrawRange {
    /// First element (or base vertex for indexed draws).
    pub first: i32,
    /// Number of elements.
    pub count: i32,
}

impl DrawRange {
    /// Shorthand constructor.
    pub const fn new(first: i32, count: i32) -> Self {
        Self { first, count }
    }
}

/// What the backend should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawKind {
    /// Draw `vertex_count` vertices starting at `first_vertex`.
    NonIndexed {
        /// First vertex.
        first_vertex: u32,
        /// Vertex count.
        vertex_count: u32,
    },
    /// Draw `index_count` indices from `index_buffer`.
    Indexed {
        /// Native index buffer.
        index_buffer: NativeHandle,
        /// Width of each index.
        index_format: IndexFormat,
        /// First index.
        first_index: u32,
        /// Index count.
        index_count: u32,
        /// Value added to every index.
        base_vertex: i32,
    },
}

/// A fully resolved draw, handed to the backend in submission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCommand {
    /// Target view.
    pub view: ViewId,
    /// Native program.
    pub program: NativeHandle,
    /// Native vertex buffer.
    pub vertex_buffer: NativeHandle,
    /// Full render state at the time of the draw.
    pub state: StateToken,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
    /// Indexed or non-indexed range.
    pub kind: DrawKind,
    /// Sampled texture, [`NativeHandle::INVALID`] when none is bound.
    pub texture: NativeHandle,
    /// Column-major model-view-projection matrix.
    pub transform: [[f32; 4]; 4],
}
