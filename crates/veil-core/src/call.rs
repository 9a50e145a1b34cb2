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

//! Decoded calls delivered by the interception source.

use crate::backend::ShaderSource;
use crate::handle::{LogicalResourceId, MeshId, ResourceKind};
use crate::mesh::{DrawState, IndexFormat};
use crate::state::{ClearValues, StateField};
use crate::texture::{SourceFormat, TextureRegion};
use crate::vertex::VertexLayout;
use std::sync::Arc;

/// What to create for a `ResourceCreate` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    /// A static vertex buffer.
    Vertex {
        /// Interleaved vertex bytes.
        data: Vec<u8>,
        /// How `data` is laid out.
        layout: VertexLayout,
    },
    /// A static index buffer.
    Index {
        /// Packed indices.
        data: Vec<u8>,
        /// Width of each index.
        format: IndexFormat,
    },
    /// A 2D texture.
    Texture {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Application pixel format.
        format: SourceFormat,
        /// Mip levels to allocate, at least 1.
        mip_levels: u32,
        /// Mip 0 pixels, or `None` to allocate without upload.
        data: Option<Vec<u8>>,
    },
    /// A shader program.
    Shader(ShaderSource),
}

impl ResourceRequest {
    /// The kind of resource this request produces.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRequest::Vertex { .. } => ResourceKind::Vertex,
            ResourceRequest::Index { .. } => ResourceKind::Index,
            ResourceRequest::Texture { .. } => ResourceKind::Texture,
            ResourceRequest::Shader(_) => ResourceKind::Shader,
        }
    }
}

/// A mesh draw with its source data and explicit draw parameters.
#[derive(Debug, Clone)]
pub struct MeshDraw {
    /// Application mesh identity.
    pub mesh_id: MeshId,
    /// Interleaved vertex bytes.
    pub vertex_data: Arc<[u8]>,
    /// Packed indices, for indexed meshes.
    pub index_data: Option<Arc<[u8]>>,
    /// How `vertex_data` is laid out.
    pub layout: VertexLayout,
    /// Draw parameters.
    pub draw_state: DrawState,
}

/// One intercepted application call.
#[derive(Debug, Clone)]
pub enum InterceptedCall {
    /// Create a buffer, texture or program.
    ResourceCreate(ResourceRequest),
    /// Destroy a resource. Unknown ids are ignored.
    ResourceDestroy(LogicalResourceId),
    /// Change one render-state field.
    StateChange(StateField),
    /// Change the values views are cleared to.
    ClearChange(ClearValues),
    /// Overwrite a region of a texture.
    TextureUpload {
        /// Target texture.
        id: LogicalResourceId,
        /// Region to overwrite.
        region: TextureRegion,
        /// Pixels in the texture's source format.
        pixels: Vec<u8>,
    },
    /// Draw a mesh.
    Draw(MeshDraw),
    /// The application discarded a mesh.
    MeshRelease(MeshId),
    /// A frame starts with the given surface size.
    FrameBegin {
        /// Surface width.
        width: u32,
        /// Surface height.
        height: u32,
    },
    /// The current frame is complete.
    FrameEnd,
}

/// The result of handling one [`InterceptedCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// A resource was registered.
    Created(LogicalResourceId),
    /// The call took effect.
    Applied,
    /// The call was a no-op (transient miss or redundant state).
    Skipped,
    /// A native call failed; nothing was registered.
    Failed,
}
