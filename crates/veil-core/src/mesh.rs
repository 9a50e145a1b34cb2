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

//! Mesh draw parameters and the cached binding of a mesh to backend resources.

use crate::handle::{LogicalResourceId, MeshId, ViewId};
use crate::vertex::CompiledLayoutRef;
use serde::{Deserialize, Serialize};

/// Defines how vertices are connected to form a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Vertices are rendered as a list of isolated points.
    PointList,
    /// Vertices are rendered as a list of isolated lines (every two vertices form a line).
    LineList,
    /// Vertices are rendered as a connected line strip.
    LineStrip,
    /// Vertices are rendered as a list of isolated triangles (every three vertices form a triangle).
    #[default]
    TriangleList,
    /// Vertices are rendered as a connected triangle strip.
    TriangleStrip,
}

/// The format of index buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integer indices.
    #[default]
    Uint16,
    /// 32-bit unsigned integer indices.
    Uint32,
}

impl IndexFormat {
    /// Size in bytes of a single index.
    pub const fn size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Built-in shader programs, chosen from a mesh's vertex attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgramKind {
    /// Position only, drawn in a constant color.
    Minimal,
    /// Position and vertex color.
    FlatColor,
    /// Position and one texture coordinate set.
    Textured,
    /// Position, texture coordinates and vertex color.
    TexturedColor,
    /// Glyph rendering: position, color, atlas and light-map coordinates.
    Text,
    /// Fallback for any other attribute combination.
    General,
}

impl ProgramKind {
    /// Every built-in program.
    pub const ALL: [ProgramKind; 6] = [
        ProgramKind::Minimal,
        ProgramKind::FlatColor,
        ProgramKind::Textured,
        ProgramKind::TexturedColor,
        ProgramKind::Text,
        ProgramKind::General,
    ];
}

/// Column-major 4x4 identity matrix.
pub const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Draw parameters passed explicitly with every mesh draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    /// Target view.
    pub view: ViewId,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
    /// Vertices to draw. Zero or negative skips the draw.
    pub vertex_count: i32,
    /// First vertex for non-indexed draws, base vertex for indexed ones.
    pub base_vertex: i32,
    /// Indices to draw. Zero or negative falls back to a non-indexed draw.
    pub index_count: i32,
    /// First index for indexed draws.
    pub first_index: i32,
    /// Width of each index.
    pub index_format: IndexFormat,
    /// Texture sampled by textured programs.
    pub texture: Option<LogicalResourceId>,
    /// Caller-created program used instead of the built-in choice.
    pub program_override: Option<LogicalResourceId>,
    /// Column-major model-view-projection matrix.
    pub transform: [[f32; 4]; 4],
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            view: ViewId::default(),
            topology: PrimitiveTopology::TriangleList,
            vertex_count: 0,
            base_vertex: 0,
            index_count: 0,
            first_index: 0,
            index_format: IndexFormat::Uint16,
            texture: None,
            program_override: None,
            transform: IDENTITY,
        }
    }
}

/// A mesh's backend resources, cached for reuse across frames.
#[derive(Debug, Clone)]
pub struct MeshBinding {
    /// Owning mesh.
    pub mesh_id: MeshId,
    /// Vertex buffer.
    pub vertex: LogicalResourceId,
    /// Index buffer, when the mesh is indexed.
    pub index: Option<LogicalResourceId>,
    /// Program chosen for the vertex layout.
    pub program: LogicalResourceId,
    /// Which built-in program `program` is.
    pub program_kind: ProgramKind,
    /// Compiled vertex layout.
    pub layout: CompiledLayoutRef,
    /// Vertices in the buffer.
    pub vertex_count: u32,
    /// Indices in the buffer.
    pub index_count: u32,
    /// Primitive assembly mode at bind time.
    pub topology: PrimitiveTopology,
    /// Width of each index.
    pub index_format: IndexFormat,
    /// Hash of the vertex and index bytes the buffers were built from.
    pub content_hash: [u8; 32],
}
