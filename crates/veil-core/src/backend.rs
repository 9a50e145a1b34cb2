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

//! The contract a native graphics backend implements.

use crate::draw::DrawCommand;
use crate::error::BackendError;
use crate::handle::{NativeHandle, ViewId};
use crate::mesh::{IndexFormat, ProgramKind};
use crate::platform::PlatformWindow;
use crate::state::{ClearValues, StateField};
use crate::texture::{TextureDescriptor, TextureRegion};
use crate::vertex::CompiledLayoutRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One way of bringing up a backend device.
///
/// Strategies are tried in the configured order; the first that succeeds
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InitStrategy {
    /// The preferred adapter, presenting to the platform window.
    PreferredWithWindow,
    /// Any adapter, no platform data, rendering offscreen.
    Minimal,
    /// A fresh instance sharing nothing with earlier attempts.
    Isolated,
}

impl InitStrategy {
    /// The default fallback chain.
    pub const CHAIN: [InitStrategy; 3] = [
        InitStrategy::PreferredWithWindow,
        InitStrategy::Minimal,
        InitStrategy::Isolated,
    ];
}

/// A cooperative cancellation flag shared with an initialization worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything a backend needs to create its device.
#[derive(Clone)]
pub struct InitRequest {
    /// Desired surface width.
    pub width: u32,
    /// Desired surface height.
    pub height: u32,
    /// The platform window, when one exists yet.
    pub window: Option<PlatformWindow>,
    /// Set when the caller gave up waiting.
    pub cancel: CancelToken,
}

impl fmt::Debug for InitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitRequest")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("has_window", &self.window.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Describes the device a successful strategy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInfo {
    /// Adapter or implementation name.
    pub adapter_name: String,
    /// Native API in use (e.g. "Vulkan").
    pub api: String,
    /// The strategy that succeeded.
    pub strategy: InitStrategy,
}

/// What a buffer holds.
#[derive(Debug, Clone)]
pub enum BufferKind {
    /// Vertex data laid out as described.
    Vertex(CompiledLayoutRef),
    /// Index data.
    Index(IndexFormat),
}

/// The source of a shader program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderSource {
    /// One of the backend's built-in programs.
    Builtin(ProgramKind),
    /// A program in the backend's own binary or text format.
    Binary(Vec<u8>),
}

/// A native graphics API as seen by the translation layer.
///
/// The bridge is the only caller. All methods run on the render thread,
/// except [`GraphicsBackend::init`], which may run on an initialization
/// worker that owns the backend for the duration of the call.
pub trait GraphicsBackend: Send + fmt::Debug {
    /// Tries to create the device with `strategy`.
    ///
    /// ## Errors
    /// Returns an error if this strategy cannot produce a device. The caller
    /// moves on to the next strategy.
    fn init(&mut self, strategy: InitStrategy, request: &InitRequest)
        -> Result<BackendInfo, BackendError>;

    /// Recreates size-dependent targets. Resource handles stay valid.
    fn reset(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Tears down the device. Every native handle becomes invalid.
    fn shutdown(&mut self);

    /// Creates a buffer initialised with `data`.
    fn create_buffer(&mut self, kind: &BufferKind, data: &[u8]) -> Result<NativeHandle, BackendError>;

    /// Releases a buffer.
    fn destroy_buffer(&mut self, handle: NativeHandle);

    /// Creates a texture, uploading mip 0 when `data` is given.
    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError>;

    /// Writes `data` into `region` of an existing texture without reallocating it.
    fn update_texture(
        &mut self,
        handle: NativeHandle,
        region: &TextureRegion,
        data: &[u8],
    ) -> Result<(), BackendError>;

    /// Releases a texture.
    fn destroy_texture(&mut self, handle: NativeHandle);

    /// Creates a shader program.
    fn create_program(&mut self, source: &ShaderSource) -> Result<NativeHandle, BackendError>;

    /// Releases a shader program.
    fn destroy_program(&mut self, handle: NativeHandle);

    /// Applies a single render-state field.
    fn set_state(&mut self, field: StateField);

    /// Sets the values `view` is cleared to.
    fn set_clear(&mut self, view: ViewId, clear: ClearValues);

    /// Records a draw. Draws are executed in the order they are submitted.
    fn submit(&mut self, command: &DrawCommand);

    /// Finishes the frame: executes recorded draws and presents.
    fn frame(&mut self) -> Result<(), BackendError>;
}
