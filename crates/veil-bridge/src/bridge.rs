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

//! The [`Bridge`]: consumes intercepted calls and drives every component.

use crate::layout::{LayoutCacheStats, LayoutTranslator};
use crate::lifecycle::{BackendSession, FrameStart, LifecycleController, LifecyclePhase};
use crate::mesh::{MeshCache, MeshCacheStats};
use crate::program::ProgramLibrary;
use crate::registry::{RegistryStats, ResourceRegistry, ResourceSpec};
use crate::staging::{StagedOp, StagingQueue, StagingSender};
use crate::state::StateTracker;
use crate::submit::{DrawSubmission, DrawSubmitter, SubmitOutcome};
use crate::texture::TextureManager;
use std::sync::Arc;
use veil_core::{
    BackendInfo, BridgeSettings, CallOutcome, ClearValues, GraphicsBackend, InitError,
    InterceptedCall, LogicalResourceId, MeshDraw, MeshId, MissReason, NativeHandle, PlatformWindow,
    ResourceRequest, StateField, StateSnapshot, StateToken, TextureRegion,
};

/// Per-frame counters, reset at every frame begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draws handed to the backend.
    pub draws_submitted: u64,
    /// Draws skipped as transient misses.
    pub draws_skipped: u64,
    /// State fields forwarded to the backend.
    pub state_changes_forwarded: u64,
    /// State fields suppressed as redundant.
    pub state_changes_suppressed: u64,
}

/// The translation layer.
///
/// Owns the backend through its lifecycle controller and routes every
/// intercepted call to the component that handles it. All methods must be
/// called from the render thread; use [`Bridge::staging_sender`] to hand
/// work over from other threads.
#[derive(Debug)]
pub struct Bridge {
    settings: BridgeSettings,
    lifecycle: LifecycleController,
    registry: ResourceRegistry,
    layouts: LayoutTranslator,
    state: StateTracker,
    textures: TextureManager,
    programs: ProgramLibrary,
    meshes: MeshCache,
    submitter: DrawSubmitter,
    staging: StagingQueue,
}

impl Bridge {
    /// Creates a bridge over `backend`. The backend is not touched until
    /// the first frame after [`Bridge::initialize`].
    pub fn new(backend: Box<dyn GraphicsBackend>, settings: BridgeSettings) -> Self {
        log::info!(
            "Bridge created: strategies {:?}, init timeout {:?}, worker {}",
            settings.strategies,
            settings.init_timeout(),
            settings.init_on_worker
        );
        let mut state = StateTracker::new(settings.clear);
        state.invalidate();
        Self {
            lifecycle: LifecycleController::new(backend, &settings),
            registry: ResourceRegistry::new(),
            layouts: LayoutTranslator::new(),
            state,
            textures: TextureManager::new(),
            programs: ProgramLibrary::new(),
            meshes: MeshCache::new(),
            submitter: DrawSubmitter::new(),
            staging: StagingQueue::new(),
            settings,
        }
    }

    // --- Lifecycle ---

    /// Requests backend initialization. See [`LifecycleController::initialize`].
    pub fn initialize(&mut self, width: u32, height: u32, window: Option<PlatformWindow>) -> bool {
        self.lifecycle.initialize(width, height, window)
    }

    /// Supplies the platform window for the next device creation.
    pub fn attach_window(&mut self, window: PlatformWindow) {
        self.lifecycle.attach_window(window);
    }

    /// Resizes the surface. Returns `true` when the backend was reset.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        self.lifecycle.resize(width, height)
    }

    /// Releases every resource, tears down the device and forgets all
    /// cached bindings. Safe to call at any time.
    pub fn shutdown(&mut self) {
        if self.lifecycle.phase() == LifecyclePhase::Uninitialized {
            return;
        }
        self.lifecycle.shutdown(&mut self.registry);
        self.meshes.clear();
        self.programs.clear();
        self.textures.clear();
        self.state.invalidate();
    }

    /// Starts a frame.
    ///
    /// Creates the device on the first frame after initialization was
    /// requested (implicitly, when `auto_initialize` is set), materializes
    /// pending resources, replays the render state and drains staged work.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> FrameStart {
        if self.settings.auto_initialize && !self.lifecycle.session().initialization_attempted {
            self.lifecycle.initialize(width, height, None);
        }

        self.state.reset_stats();
        self.submitter.reset_stats();

        let start = self.lifecycle.begin_frame(width, height);
        self.registry.begin_frame(self.lifecycle.session().frame_number);
        if start == FrameStart::Initialized {
            if let Some(backend) = self.lifecycle.backend_mut() {
                self.registry.materialize_pending(backend);
                self.state.invalidate();
                self.state.flush(backend);
            }
        }

        for op in self.staging.drain(self.settings.max_staged_per_frame) {
            self.apply_staged(op);
        }
        start
    }

    /// Finishes the frame. Returns `false` if the backend reported a failure.
    pub fn end_frame(&mut self) -> bool {
        match self.lifecycle.end_frame() {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "Bridge: frame {} failed: {e}",
                    self.lifecycle.session().frame_number
                );
                false
            }
        }
    }

    // --- Intercepted calls ---

    /// Handles one intercepted call.
    pub fn handle(&mut self, call: InterceptedCall) -> CallOutcome {
        match call {
            InterceptedCall::ResourceCreate(request) => {
                let id = self.create_resource(request);
                if id.is_valid() {
                    CallOutcome::Created(id)
                } else {
                    CallOutcome::Failed
                }
            }
            InterceptedCall::ResourceDestroy(id) => {
                self.destroy_resource(id);
                CallOutcome::Applied
            }
            InterceptedCall::StateChange(field) => {
                let before = self.state.stats().forwarded;
                self.set_state(field);
                if self.state.stats().forwarded > before {
                    CallOutcome::Applied
                } else {
                    CallOutcome::Skipped
                }
            }
            InterceptedCall::ClearChange(values) => {
                self.set_clear(values);
                CallOutcome::Applied
            }
            InterceptedCall::TextureUpload { id, region, pixels } => {
                if self.upload_texture(id, region, &pixels) {
                    CallOutcome::Applied
                } else {
                    CallOutcome::Skipped
                }
            }
            InterceptedCall::Draw(draw) => match self.draw(&draw) {
                SubmitOutcome::Submitted => CallOutcome::Applied,
                SubmitOutcome::Skipped(_) => CallOutcome::Skipped,
            },
            InterceptedCall::MeshRelease(mesh_id) => {
                self.release_mesh(mesh_id);
                CallOutcome::Applied
            }
            InterceptedCall::FrameBegin { width, height } => match self.begin_frame(width, height) {
                FrameStart::Unavailable => CallOutcome::Skipped,
                FrameStart::Ready | FrameStart::Initialized => CallOutcome::Applied,
            },
            InterceptedCall::FrameEnd => {
                if self.end_frame() {
                    CallOutcome::Applied
                } else {
                    CallOutcome::Failed
                }
            }
        }
    }

    /// Creates a buffer, texture or program. Returns the null id on failure.
    pub fn create_resource(&mut self, request: ResourceRequest) -> LogicalResourceId {
        let backend = self.lifecycle.backend_mut();
        match request {
            ResourceRequest::Vertex { data, layout } => {
                if layout.attributes.is_empty() {
                    log::warn!("Bridge: vertex buffer with an empty layout rejected");
                    return LogicalResourceId::null();
                }
                let compiled = self.layouts.compile(&layout);
                self.registry.create(
                    backend,
                    ResourceSpec::Vertex {
                        data: Arc::from(data),
                        layout: compiled,
                    },
                )
            }
            ResourceRequest::Index { data, format } => self.registry.create(
                backend,
                ResourceSpec::Index {
                    data: Arc::from(data),
                    format,
                },
            ),
            ResourceRequest::Texture {
                width,
                height,
                format,
                mip_levels,
                data,
            } => self.textures.create(
                &mut self.registry,
                backend,
                width,
                height,
                format,
                mip_levels,
                data.as_deref(),
            ),
            ResourceRequest::Shader(source) => self.registry.create(backend, ResourceSpec::Shader(source)),
        }
    }

    /// Destroys a resource. Unknown or already destroyed ids are ignored.
    pub fn destroy_resource(&mut self, id: LogicalResourceId) {
        self.textures.forget(id);
        self.registry.destroy(self.lifecycle.backend_mut(), id);
    }

    /// Changes one render-state field.
    pub fn set_state(&mut self, field: StateField) -> StateToken {
        self.state.set(self.lifecycle.backend_mut(), field)
    }

    /// Replaces the whole render state.
    pub fn apply_state(&mut self, snapshot: StateSnapshot) -> StateToken {
        self.state.apply(self.lifecycle.backend_mut(), snapshot)
    }

    /// Sets the clear values of the default view.
    pub fn set_clear(&mut self, values: ClearValues) {
        let view = self.settings.default_view;
        self.state.set_clear(self.lifecycle.backend_mut(), view, values);
    }

    /// Overwrites a region of a texture. Returns `false` when skipped.
    pub fn upload_texture(&mut self, id: LogicalResourceId, region: TextureRegion, pixels: &[u8]) -> bool {
        self.textures
            .update(&mut self.registry, self.lifecycle.backend_mut(), id, region, pixels)
    }

    /// Binds and draws a mesh with the current render state.
    pub fn draw(&mut self, draw: &MeshDraw) -> SubmitOutcome {
        let Some(binding) = self.meshes.bind(
            &mut self.registry,
            self.lifecycle.backend_mut(),
            &mut self.layouts,
            &mut self.programs,
            draw,
        ) else {
            return self.submitter.record_skip(MissReason::EmptyDraw);
        };
        let submission = DrawSubmission::resolve(&self.registry, &binding, &draw.draw_state, self.state.current());
        self.submitter.submit(self.lifecycle.backend_mut(), &submission)
    }

    /// Releases a mesh's buffers.
    pub fn release_mesh(&mut self, mesh_id: MeshId) {
        self.meshes
            .release(&mut self.registry, self.lifecycle.backend_mut(), mesh_id);
    }

    fn apply_staged(&mut self, op: StagedOp) {
        match op {
            StagedOp::BindMesh(draw) => {
                self.meshes.bind(
                    &mut self.registry,
                    self.lifecycle.backend_mut(),
                    &mut self.layouts,
                    &mut self.programs,
                    &draw,
                );
            }
            StagedOp::ReleaseMesh(mesh_id) => self.release_mesh(mesh_id),
            StagedOp::UploadTexture { id, region, pixels } => {
                self.upload_texture(id, region, &pixels);
            }
        }
    }

    // --- Queries ---

    /// A sender for staging work from other threads.
    pub fn staging_sender(&self) -> StagingSender {
        self.staging.sender()
    }

    /// Native handle of `id`, [`NativeHandle::INVALID`] when it has none.
    pub fn resolve(&self, id: LogicalResourceId) -> NativeHandle {
        self.registry.resolve(id)
    }

    /// The current render state token.
    pub fn current_state(&self) -> StateToken {
        self.state.current()
    }

    /// Session flags.
    pub fn session(&self) -> &BackendSession {
        self.lifecycle.session()
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.phase()
    }

    /// The device in use, once initialized.
    pub fn backend_info(&self) -> Option<&BackendInfo> {
        self.lifecycle.info()
    }

    /// The initialization failure, if any.
    pub fn init_failure(&self) -> Option<&InitError> {
        self.lifecycle.failure()
    }

    /// Counters for the current frame.
    pub fn frame_stats(&self) -> FrameStats {
        let state = self.state.stats();
        let draws = self.submitter.stats();
        FrameStats {
            draws_submitted: draws.submitted,
            draws_skipped: draws.skipped,
            state_changes_forwarded: state.forwarded,
            state_changes_suppressed: state.suppressed,
        }
    }

    /// Registry counters.
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Layout cache counters.
    pub fn layout_stats(&self) -> LayoutCacheStats {
        self.layouts.stats()
    }

    /// Mesh cache counters.
    pub fn mesh_stats(&self) -> MeshCacheStats {
        self.meshes.stats()
    }

    /// The settings the bridge was created with.
    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }
}
