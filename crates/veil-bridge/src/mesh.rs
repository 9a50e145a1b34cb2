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

//! Mesh binding cache.
//!
//! Associates an application mesh with its vertex buffer, index buffer and
//! program so repeated draws of unchanged content reuse them.

use crate::layout::{self, LayoutTranslator};
use crate::program::{select_program, ProgramLibrary};
use crate::registry::{ResourceRegistry, ResourceSpec};
use crate::BackendRef;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use veil_core::{MeshBinding, MeshDraw, MeshId, VertexSemantic};

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshCacheStats {
    /// Binds answered from the cache.
    pub hits: u64,
    /// Binds that created buffers.
    pub misses: u64,
    /// Misses caused by changed content for a known mesh.
    pub rebuilds: u64,
}

/// Feeds `std::hash::Hash` output into a blake3 hasher.
struct Blake3Writer<'a>(&'a mut blake3::Hasher);

impl Hasher for Blake3Writer<'_> {
    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        0
    }
}

/// Hash of everything a binding is built from: bytes, layout and topology.
fn content_hash(draw: &MeshDraw) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    {
        let mut writer = Blake3Writer(&mut hasher);
        draw.layout.signature().hash(&mut writer);
        draw.draw_state.topology.hash(&mut writer);
    }
    hasher.update(&(draw.vertex_data.len() as u64).to_le_bytes());
    hasher.update(&draw.vertex_data);
    if let Some(indices) = &draw.index_data {
        hasher.update(&[draw.draw_state.index_format.size() as u8]);
        hasher.update(indices);
    }
    *hasher.finalize().as_bytes()
}

/// Cached mesh bindings keyed by mesh id.
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: HashMap<MeshId, MeshBinding>,
    stats: MeshCacheStats,
}

impl MeshCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the binding for `draw.mesh_id`, creating buffers on first use.
    ///
    /// Byte-identical content for a known mesh returns the cached binding.
    /// Changed content releases the old buffers and builds new ones. Returns
    /// `None` when the layout has no position or a native allocation fails.
    pub fn bind(
        &mut self,
        registry: &mut ResourceRegistry,
        mut backend: BackendRef<'_>,
        layouts: &mut LayoutTranslator,
        programs: &mut ProgramLibrary,
        draw: &MeshDraw,
    ) -> Option<MeshBinding> {
        let hash = content_hash(draw);
        if let Some(binding) = self.meshes.get(&draw.mesh_id) {
            if binding.content_hash == hash {
                self.stats.hits += 1;
                return Some(binding.clone());
            }
        }

        if let Some(stale) = self.meshes.remove(&draw.mesh_id) {
            log::debug!("MeshCache: content of {:?} changed, rebuilding", draw.mesh_id);
            self.stats.rebuilds += 1;
            Self::release_binding(registry, backend.as_deref_mut(), &stale);
        }

        if !draw.layout.has(VertexSemantic::Position) {
            log::warn!(
                "MeshCache: layout of {:?} has no position attribute; mesh ignored",
                draw.mesh_id
            );
            return None;
        }

        self.stats.misses += 1;
        let compiled = layouts.compile(&draw.layout);
        let vertex_count = layout::vertex_count(&compiled, &draw.vertex_data);

        let vertex = registry.create(
            backend.as_deref_mut(),
            ResourceSpec::Vertex {
                data: Arc::clone(&draw.vertex_data),
                layout: Arc::clone(&compiled),
            },
        );
        if !vertex.is_valid() {
            return None;
        }

        let index_format = draw.draw_state.index_format;
        let (index, index_count) = match draw.index_data.as_ref().filter(|data| !data.is_empty()) {
            Some(data) => {
                let id = registry.create(
                    backend.as_deref_mut(),
                    ResourceSpec::Index {
                        data: Arc::clone(data),
                        format: index_format,
                    },
                );
                if !id.is_valid() {
                    registry.destroy(backend.as_deref_mut(), vertex);
                    return None;
                }
                (Some(id), (data.len() / index_format.size() as usize) as u32)
            }
            None => (None, 0),
        };

        let program_kind = select_program(&draw.layout);
        let program = programs.program(registry, backend.as_deref_mut(), program_kind);
        if !program.is_valid() {
            registry.destroy(backend.as_deref_mut(), vertex);
            if let Some(index) = index {
                registry.destroy(backend.as_deref_mut(), index);
            }
            return None;
        }

        let binding = MeshBinding {
            mesh_id: draw.mesh_id,
            vertex,
            index,
            program,
            program_kind,
            layout: compiled,
            vertex_count,
            index_count,
            topology: draw.draw_state.topology,
            index_format,
            content_hash: hash,
        };
        log::debug!(
            "MeshCache: bound {:?} ({vertex_count} vertices, {index_count} indices, {program_kind:?})",
            draw.mesh_id
        );
        self.meshes.insert(draw.mesh_id, binding.clone());
        Some(binding)
    }

    /// Releases the buffers of `mesh_id` and forgets it. Unknown meshes are ignored.
    pub fn release(&mut self, registry: &mut ResourceRegistry, backend: BackendRef<'_>, mesh_id: MeshId) {
        if let Some(binding) = self.meshes.remove(&mesh_id) {
            Self::release_binding(registry, backend, &binding);
            log::debug!("MeshCache: released {mesh_id:?}");
        }
    }

    fn release_binding(registry: &mut ResourceRegistry, mut backend: BackendRef<'_>, binding: &MeshBinding) {
        registry.destroy(backend.as_deref_mut(), binding.vertex);
        if let Some(index) = binding.index {
            registry.destroy(backend.as_deref_mut(), index);
        }
    }

    /// The cached binding of `mesh_id`.
    pub fn get(&self, mesh_id: MeshId) -> Option<&MeshBinding> {
        self.meshes.get(&mesh_id)
    }

    /// Number of cached meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// `true` when no mesh is cached.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Cache counters.
    pub fn stats(&self) -> MeshCacheStats {
        self.stats
    }

    /// Forgets every binding. The registry owns the buffers and frees them itself.
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use veil_core::{
        ComponentType, DrawState, PrimitiveTopology, ProgramKind, VertexAttributeDescriptor, VertexLayout,
    };

    fn quad(mesh: u64, vertices: &[f32]) -> MeshDraw {
        MeshDraw {
            mesh_id: MeshId(mesh),
            vertex_data: Arc::from(bytemuck::cast_slice::<f32, u8>(vertices)),
            index_data: Some(Arc::from(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2, 2, 3, 0]))),
            layout: VertexLayout::new(vec![VertexAttributeDescriptor::new(
                VertexSemantic::Position,
                2,
                ComponentType::Float32,
                false,
            )]),
            draw_state: DrawState {
                vertex_count: 4,
                index_count: 6,
                ..DrawState::default()
            },
        }
    }

    const CORNERS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];

    struct Fixture {
        backend: MockBackend,
        registry: ResourceRegistry,
        layouts: LayoutTranslator,
        programs: ProgramLibrary,
        cache: MeshCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: MockBackend::default(),
                registry: ResourceRegistry::new(),
                layouts: LayoutTranslator::new(),
                programs: ProgramLibrary::new(),
                cache: MeshCache::new(),
            }
        }

        fn bind(&mut self, draw: &MeshDraw) -> Option<MeshBinding> {
            self.cache.bind(
                &mut self.registry,
                Some(&mut self.backend),
                &mut self.layouts,
                &mut self.programs,
                draw,
            )
        }
    }

    #[test]
    fn test_identical_content_reuses_buffers() {
        let mut f = Fixture::new();
        let first = f.bind(&quad(1, &CORNERS)).unwrap();
        let buffers_after_first = f.backend.buffers_created;
        let second = f.bind(&quad(1, &CORNERS)).unwrap();
        assert_eq!(first.vertex, second.vertex);
        assert_eq!(f.backend.buffers_created, buffers_after_first);
        assert_eq!(first.vertex_count, 4);
        assert_eq!(first.index_count, 6);
        assert_eq!(first.program_kind, ProgramKind::Minimal);
        assert_eq!(f.cache.stats().hits, 1);
    }

    #[test]
    fn test_changed_content_replaces_buffers() {
        let mut f = Fixture::new();
        let first = f.bind(&quad(1, &CORNERS)).unwrap();
        let mut moved = CORNERS;
        moved[0] = -1.0;
        let second = f.bind(&quad(1, &moved)).unwrap();
        assert_ne!(first.vertex, second.vertex);
        assert!(!f.registry.resolve(first.vertex).is_valid());
        assert_eq!(f.cache.stats().rebuilds, 1);
        assert_eq!(f.cache.len(), 1);
    }

    #[test]
    fn test_same_bytes_under_new_layout_or_topology_rebuild() {
        let mut f = Fixture::new();
        let first = f.bind(&quad(1, &CORNERS)).unwrap();

        let mut wide = quad(1, &CORNERS);
        wide.layout.attributes[0].component_count = 4;
        let second = f.bind(&wide).unwrap();
        assert_ne!(first.vertex, second.vertex);
        assert_eq!(second.vertex_count, 2);
        assert_ne!(first.layout.signature, second.layout.signature);

        let mut strip = wide.clone();
        strip.draw_state.topology = PrimitiveTopology::TriangleStrip;
        let third = f.bind(&strip).unwrap();
        assert_eq!(third.topology, PrimitiveTopology::TriangleStrip);
        assert_eq!(f.cache.stats().rebuilds, 2);
        assert_eq!(f.cache.stats().hits, 0);
    }

    #[test]
    fn test_release_frees_buffers() {
        let mut f = Fixture::new();
        let binding = f.bind(&quad(7, &CORNERS)).unwrap();
        f.cache.release(&mut f.registry, Some(&mut f.backend), MeshId(7));
        assert!(!f.registry.resolve(binding.vertex).is_valid());
        assert!(binding.index.is_some_and(|i| !f.registry.resolve(i).is_valid()));
        assert!(f.cache.is_empty());
        // The built-in program outlives the mesh.
        assert!(f.registry.resolve(binding.program).is_valid());
    }

    #[test]
    fn test_layout_without_position_is_rejected() {
        let mut f = Fixture::new();
        let mut draw = quad(2, &CORNERS);
        draw.layout.attributes[0].semantic = VertexSemantic::TexCoord0;
        assert!(f.bind(&draw).is_none());
        assert_eq!(f.backend.buffers_created, 0);
    }

    #[test]
    fn test_index_failure_releases_vertex_buffer() {
        let mut f = Fixture::new();
        f.backend.fail_after = Some(1);
        assert!(f.bind(&quad(3, &CORNERS)).is_none());
        assert_eq!(f.registry.stats().live, 0);
        assert_eq!(f.backend.live_objects(), 0);
    }
}
