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

//! Draw call submission.
//!
//! Turns a resolved draw into a [`DrawCommand`] and hands it to the backend.
//! Draws are never reordered or batched. Anything that cannot be drawn
//! (invalid handles, empty ranges, no device) is skipped without error.

use crate::registry::ResourceRegistry;
use crate::BackendRef;
use veil_core::{
    DrawCommand, DrawKind, DrawRange, DrawState, IndexFormat, MeshBinding, MissReason, NativeHandle,
    PrimitiveTopology, ResourceKind, StateToken, ViewId,
};

/// Everything needed to issue one draw, with handles already resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawSubmission {
    /// Target view.
    pub view: ViewId,
    /// Native program.
    pub program: NativeHandle,
    /// Native vertex buffer.
    pub vertex: NativeHandle,
    /// Native index buffer and its format, for indexed meshes.
    pub index: Option<(NativeHandle, IndexFormat)>,
    /// Full render state.
    pub state: StateToken,
    /// First vertex (base vertex when indexed) and vertex count.
    pub vertex_range: DrawRange,
    /// First index and index count.
    pub index_range: Option<DrawRange>,
    /// Vertices held by the vertex buffer.
    pub vertex_capacity: u32,
    /// Indices held by the index buffer.
    pub index_capacity: u32,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
    /// Sampled texture.
    pub texture: NativeHandle,
    /// Column-major model-view-projection matrix.
    pub transform: [[f32; 4]; 4],
}

impl DrawSubmission {
    /// Resolves a mesh draw against the registry.
    ///
    /// A `program_override` in `draw_state` replaces the binding's built-in
    /// program; an override that does not name a live shader resolves to
    /// [`NativeHandle::INVALID`] and the draw will be skipped.
    pub fn resolve(
        registry: &ResourceRegistry,
        binding: &MeshBinding,
        draw_state: &DrawState,
        state: StateToken,
    ) -> Self {
        let program = match draw_state.program_override {
            Some(id) => registry.resolve_kind(id, ResourceKind::Shader),
            None => registry.resolve_kind(binding.program, ResourceKind::Shader),
        };
        let texture = draw_state
            .texture
            .map_or(NativeHandle::INVALID, |id| registry.resolve_kind(id, ResourceKind::Texture));
        let index = binding
            .index
            .map(|id| (registry.resolve_kind(id, ResourceKind::Index), binding.index_format));

        Self {
            view: draw_state.view,
            program,
            vertex: registry.resolve_kind(binding.vertex, ResourceKind::Vertex),
            index,
            state,
            vertex_range: DrawRange::new(draw_state.base_vertex, draw_state.vertex_count),
            index_range: index.map(|_| DrawRange::new(draw_state.first_index, draw_state.index_count)),
            vertex_capacity: binding.vertex_count,
            index_capacity: binding.index_count,
            topology: draw_state.topology,
            texture,
            transform: draw_state.transform,
        }
    }

    /// Builds the backend command, or says why there is nothing to draw.
    ///
    /// Ranges past the end of their buffer are skipped here so a single bad
    /// draw never reaches the device.
    pub fn command(&self) -> Result<DrawCommand, MissReason> {
        if !self.vertex.is_valid() || !self.program.is_valid() || self.vertex_range.count <= 0 {
            return Err(MissReason::EmptyDraw);
        }

        let indexed = match (self.index, self.index_range) {
            (Some((buffer, format)), Some(range)) if buffer.is_valid() && range.count > 0 => {
                Some((buffer, format, range))
            }
            _ => None,
        };

        let kind = match indexed {
            Some((index_buffer, index_format, range)) => {
                let first_index = u32::try_from(range.first).map_err(|_| MissReason::EmptyDraw)?;
                let index_count = range.count as u32;
                if !fits(first_index, index_count, self.index_capacity) {
                    return Err(MissReason::OutOfRange);
                }
                DrawKind::Indexed {
                    index_buffer,
                    index_format,
                    first_index,
                    index_count,
                    base_vertex: self.vertex_range.first,
                }
            }
            None => {
                let first_vertex = u32::try_from(self.vertex_range.first).map_err(|_| MissReason::EmptyDraw)?;
                let vertex_count = self.vertex_range.count as u32;
                if !fits(first_vertex, vertex_count, self.vertex_capacity) {
                    return Err(MissReason::OutOfRange);
                }
                DrawKind::NonIndexed {
                    first_vertex,
                    vertex_count,
                }
            }
        };

        Ok(DrawCommand {
            view: self.view,
            program: self.program,
            vertex_buffer: self.vertex,
            state: self.state,
            topology: self.topology,
            kind,
            texture: self.texture,
            transform: self.transform,
        })
    }
}

fn fits(first: u32, count: u32, capacity: u32) -> bool {
    first.checked_add(count).is_some_and(|end| end <= capacity)
}

/// Whether a draw reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend recorded the draw.
    Submitted,
    /// Nothing was drawn.
    Skipped(MissReason),
}

/// Submission counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    /// Draws handed to the backend.
    pub submitted: u64,
    /// Draws dropped as transient misses.
    pub skipped: u64,
}

/// Forwards draws to the backend in call order.
#[derive(Debug, Default)]
pub struct DrawSubmitter {
    stats: SubmitStats,
}

impl DrawSubmitter {
    /// Creates a submitter with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues `submission`, or skips it when it cannot be drawn.
    pub fn submit(&mut self, backend: BackendRef<'_>, submission: &DrawSubmission) -> SubmitOutcome {
        let Some(backend) = backend else {
            self.stats.skipped += 1;
            return SubmitOutcome::Skipped(MissReason::NotInitialized);
        };
        match submission.command() {
            Ok(command) => {
                log::trace!("DrawSubmitter: {:?} on {:?}", command.kind, command.view);
                backend.submit(&command);
                self.stats.submitted += 1;
                SubmitOutcome::Submitted
            }
            Err(reason) => {
                log::trace!("DrawSubmitter: draw skipped ({reason:?})");
                self.stats.skipped += 1;
                SubmitOutcome::Skipped(reason)
            }
        }
    }

    /// Counts a draw dropped before it could be resolved.
    pub fn record_skip(&mut self, reason: MissReason) -> SubmitOutcome {
        self.stats.skipped += 1;
        SubmitOutcome::Skipped(reason)
    }

    /// Counters since the last [`DrawSubmitter::reset_stats`].
    pub fn stats(&self) -> SubmitStats {
        self.stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&mut self) {
        self.stats = SubmitStats::default();
    }
}
