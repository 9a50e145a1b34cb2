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

//! The resource handle registry.
//!
//! Maps logical resource ids to native handles and is the only place that
//! allocates or frees native objects. Every successful native allocation is
//! matched by exactly one free.

use crate::layout;
use crate::BackendRef;
use slotmap::SlotMap;
use std::sync::Arc;
use veil_core::{
    BackendError, BufferKind, CompiledLayoutRef, GraphicsBackend, IndexFormat, LogicalResourceId,
    NativeHandle, ResourceKind, ShaderSource, TextureDescriptor, TextureRegion,
};

/// What to allocate for a logical resource.
#[derive(Debug, Clone)]
pub enum ResourceSpec {
    /// Vertex buffer with source-layout bytes.
    Vertex {
        /// Source vertex bytes, packed to the compiled layout at upload.
        data: Arc<[u8]>,
        /// Layout of `data`.
        layout: CompiledLayoutRef,
    },
    /// Index buffer.
    Index {
        /// Packed indices.
        data: Arc<[u8]>,
        /// Width of each index.
        format: IndexFormat,
    },
    /// Texture storage, with optional mip 0 contents in native format.
    Texture {
        /// Storage to allocate.
        descriptor: TextureDescriptor,
        /// Native-format texels for mip 0.
        data: Option<Vec<u8>>,
        /// Writes to deeper mip levels received while pending.
        updates: Vec<(TextureRegion, Vec<u8>)>,
    },
    /// Shader program.
    Shader(ShaderSource),
}

impl ResourceSpec {
    /// The kind of resource this spec allocates.
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Vertex { .. } => ResourceKind::Vertex,
            ResourceSpec::Index { .. } => ResourceKind::Index,
            ResourceSpec::Texture { .. } => ResourceKind::Texture,
            ResourceSpec::Shader(_) => ResourceKind::Shader,
        }
    }

    fn byte_size(&self) -> u64 {
        match self {
            ResourceSpec::Vertex { data, layout } => {
                layout::vertex_count(layout, data) as u64 * layout.array_stride as u64
            }
            ResourceSpec::Index { data, .. } => data.len() as u64,
            ResourceSpec::Texture { descriptor, .. } => descriptor.byte_size(),
            ResourceSpec::Shader(_) => 0,
        }
    }
}

/// One registered resource.
#[derive(Debug)]
pub struct ResourceEntry {
    /// Resource category.
    pub kind: ResourceKind,
    /// Native object, [`NativeHandle::INVALID`] while pending.
    pub native: NativeHandle,
    /// Bytes of backend storage.
    pub byte_size: u64,
    /// Frame number at registration.
    pub created_at_frame: u64,
    pending: Option<ResourceSpec>,
}

impl ResourceEntry {
    /// `true` while the resource waits for the backend to come up.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Registered resources, pending ones included.
    pub live: usize,
    /// Successful native allocations.
    pub allocations: u64,
    /// Native frees.
    pub releases: u64,
    /// Bytes held by live native objects.
    pub live_bytes: u64,
    /// High-water mark of `live_bytes`.
    pub peak_bytes: u64,
}

/// Owns every native handle.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: SlotMap<LogicalResourceId, ResourceEntry>,
    pending_order: Vec<LogicalResourceId>,
    stats: RegistryStats,
    frame: u64,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frame number stamped on new entries.
    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// Registers a resource.
    ///
    /// With a live backend the native object is created immediately; on a
    /// native failure nothing is registered and the null id is returned.
    /// Without one, the resource is registered as pending and materialized
    /// by [`ResourceRegistry::materialize_pending`].
    pub fn create(&mut self, backend: BackendRef<'_>, spec: ResourceSpec) -> LogicalResourceId {
        let kind = spec.kind();
        let byte_size = spec.byte_size();

        let Some(backend) = backend else {
            let id = self.entries.insert(ResourceEntry {
                kind,
                native: NativeHandle::INVALID,
                byte_size,
                created_at_frame: self.frame,
                pending: Some(spec),
            });
            self.pending_order.push(id);
            log::debug!("ResourceRegistry: {kind:?} {id:?} registered as pending");
            return id;
        };

        match Self::allocate(backend, &spec) {
            Ok(native) => {
                let id = self.entries.insert(ResourceEntry {
                    kind,
                    native,
                    byte_size,
                    created_at_frame: self.frame,
                    pending: None,
                });
                self.record_allocation(byte_size);
                log::debug!("ResourceRegistry: created {kind:?} {id:?} -> {native:?} ({byte_size} bytes)");
                id
            }
            Err(e) => {
                log::error!(
                    "ResourceRegistry: native allocation of {kind:?} ({byte_size} bytes) failed: {e}"
                );
                LogicalResourceId::null()
            }
        }
    }

    /// Removes a resource and frees its native object. Unknown ids are ignored.
    pub fn destroy(&mut self, backend: BackendRef<'_>, id: LogicalResourceId) {
        let Some(entry) = self.entries.remove(id) else {
            log::trace!("ResourceRegistry: destroy of unknown {id:?} ignored");
            return;
        };
        if entry.is_pending() {
            self.pending_order.retain(|pending| *pending != id);
            log::debug!("ResourceRegistry: dropped pending {:?} {id:?}", entry.kind);
            return;
        }
        match backend {
            Some(backend) => {
                Self::free(backend, entry.kind, entry.native);
                self.record_release(entry.byte_size);
                log::debug!("ResourceRegistry: destroyed {:?} {id:?}", entry.kind);
            }
            None => {
                log::warn!(
                    "ResourceRegistry: {:?} {id:?} removed without a backend; native handle {:?} abandoned",
                    entry.kind,
                    entry.native
                );
            }
        }
    }

    /// The native handle for `id`, or [`NativeHandle::INVALID`] if the id is
    /// unknown, destroyed or still pending.
    pub fn resolve(&self, id: LogicalResourceId) -> NativeHandle {
        self.entries
            .get(id)
            .map_or(NativeHandle::INVALID, |entry| entry.native)
    }

    /// Like [`ResourceRegistry::resolve`], but also checks the resource kind.
    pub fn resolve_kind(&self, id: LogicalResourceId, kind: ResourceKind) -> NativeHandle {
        match self.entries.get(id) {
            Some(entry) if entry.kind == kind => entry.native,
            _ => NativeHandle::INVALID,
        }
    }

    /// The entry registered for `id`.
    pub fn entry(&self, id: LogicalResourceId) -> Option<&ResourceEntry> {
        self.entries.get(id)
    }

    /// `true` if `id` is registered (pending or live).
    pub fn contains(&self, id: LogicalResourceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Applies a validated region write to a texture that is still pending.
    ///
    /// `texels` are native-format. Mip 0 writes land in the retained
    /// contents; deeper levels are replayed right after allocation. Returns
    /// `false` if `id` is not a pending texture.
    pub fn write_pending_texture(&mut self, id: LogicalResourceId, region: TextureRegion, texels: Vec<u8>) -> bool {
        let Some(ResourceSpec::Texture {
            descriptor,
            data,
            updates,
        }) = self.entries.get_mut(id).and_then(|entry| entry.pending.as_mut())
        else {
            return false;
        };
        if region.mip_level != 0 {
            updates.retain(|(queued, _)| *queued != region);
            updates.push((region, texels));
            return true;
        }

        let bpp = descriptor.format.bytes_per_pixel() as usize;
        let width = descriptor.width as usize;
        let size = width * descriptor.height as usize * bpp;
        let contents = data.get_or_insert_with(|| vec![0; size]);
        if contents.len() < size {
            contents.resize(size, 0);
        }
        let row = region.width as usize * bpp;
        for (y, src) in texels.chunks_exact(row).take(region.height as usize).enumerate() {
            let dst = ((region.y as usize + y) * width + region.x as usize) * bpp;
            contents[dst..dst + row].copy_from_slice(src);
        }
        log::trace!("ResourceRegistry: region {region:?} written into pending {id:?}");
        true
    }

    /// Creates native objects for every pending resource, in registration order.
    ///
    /// Resources whose allocation fails are removed. Returns the number
    /// materialized.
    pub fn materialize_pending(&mut self, backend: &mut dyn GraphicsBackend) -> usize {
        let mut materialized = 0;
        for id in std::mem::take(&mut self.pending_order) {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            let Some(spec) = entry.pending.take() else {
                continue;
            };
            match Self::allocate(backend, &spec) {
                Ok(native) => {
                    entry.native = native;
                    let byte_size = entry.byte_size;
                    self.record_allocation(byte_size);
                    materialized += 1;
                }
                Err(e) => {
                    log::error!(
                        "ResourceRegistry: materializing {:?} {id:?} failed: {e}",
                        spec.kind()
                    );
                    self.entries.remove(id);
                }
            }
        }
        if materialized > 0 {
            log::info!("ResourceRegistry: materialized {materialized} pending resources");
        }
        materialized
    }

    /// Frees every native object and forgets every resource.
    pub fn release_all(&mut self, mut backend: BackendRef<'_>) {
        let ids: Vec<LogicalResourceId> = self.entries.keys().collect();
        let count = ids.len();
        for id in ids {
            self.destroy(backend.as_deref_mut(), id);
        }
        self.pending_order.clear();
        if count > 0 {
            log::info!("ResourceRegistry: released {count} resources");
        }
    }

    /// Allocation counters.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            live: self.entries.len(),
            ..self.stats
        }
    }

    fn record_allocation(&mut self, bytes: u64) {
        self.stats.allocations += 1;
        self.stats.live_bytes += bytes;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.stats.live_bytes);
    }

    fn record_release(&mut self, bytes: u64) {
        self.stats.releases += 1;
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(bytes);
    }

    fn allocate(backend: &mut dyn GraphicsBackend, spec: &ResourceSpec) -> Result<NativeHandle, BackendError> {
        match spec {
            ResourceSpec::Vertex { data, layout: compiled } => {
                let packed = layout::pack_vertices(compiled, data);
                backend.create_buffer(&BufferKind::Vertex(Arc::clone(compiled)), &packed)
            }
            ResourceSpec::Index { data, format } => {
                backend.create_buffer(&BufferKind::Index(*format), data)
            }
            ResourceSpec::Texture {
                descriptor,
                data,
                updates,
            } => {
                let native = backend.create_texture(descriptor, data.as_deref())?;
                for (region, texels) in updates {
                    if let Err(e) = backend.update_texture(native, region, texels) {
                        log::warn!("ResourceRegistry: replaying {region:?} into {native:?} failed: {e}");
                    }
                }
                Ok(native)
            }
            ResourceSpec::Shader(source) => backend.create_program(source),
        }
    }

    fn free(backend: &mut dyn GraphicsBackend, kind: ResourceKind, native: NativeHandle) {
        match kind {
            ResourceKind::Vertex | ResourceKind::Index => backend.destroy_buffer(native),
            ResourceKind::Texture => backend.destroy_texture(native),
            ResourceKind::Shader => backend.destroy_program(native),
        }
    }
}
