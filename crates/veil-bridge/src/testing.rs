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

//! Recording backend shared by the unit and integration tests.
//!
//! The integration tests pull this file in with `#[path]`, so it only
//! depends on `veil_core`.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use veil_core::{
    BackendError, BackendInfo, BufferKind, ClearValues, DrawCommand, GraphicsBackend,
    InitRequest, InitStrategy, NativeHandle, ShaderSource, StateField, TextureDescriptor,
    TextureRegion, ViewId,
};

/// Records every call and keeps texture contents so tests can inspect them.
#[derive(Debug, Default)]
pub struct MockBackend {
    /// Every allocation fails.
    pub fail_allocations: bool,
    /// Allocations fail once this many have succeeded.
    pub fail_after: Option<u64>,
    /// Strategies whose `init` is rejected.
    pub reject: Vec<InitStrategy>,
    /// Strategies whose `init` panics.
    pub panic_on: Vec<InitStrategy>,
    /// Sleep this long inside every `init` call.
    pub stall: Option<Duration>,

    pub init_calls: Vec<InitStrategy>,
    pub resets: Vec<(u32, u32)>,
    pub shutdowns: usize,
    pub allocations: u64,
    pub buffers_created: u64,
    pub programs_created: u64,
    pub frees: u64,
    pub uploads: u64,
    pub programs: HashMap<NativeHandle, ShaderSource>,
    pub state_calls: Vec<StateField>,
    pub clears: Vec<(ViewId, ClearValues)>,
    pub submitted: Vec<DrawCommand>,
    pub frames: usize,

    pub next_handle: u64,
    pub live: HashSet<NativeHandle>,
    pub textures: HashMap<NativeHandle, (TextureDescriptor, Vec<u8>)>,
}

impl MockBackend {
    /// Native objects created and not yet freed.
    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    /// Mip 0 texels of a texture.
    pub fn texels(&self, handle: NativeHandle) -> Option<&[u8]> {
        self.textures.get(&handle).map(|(_, texels)| texels.as_slice())
    }

    fn allocate(&mut self) -> Result<NativeHandle, BackendError> {
        let exhausted = self.fail_after.is_some_and(|limit| self.allocations >= limit);
        if self.fail_allocations || exhausted {
            return Err(BackendError::OutOfMemory { bytes: 0 });
        }
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        self.allocations += 1;
        self.live.insert(handle);
        Ok(handle)
    }

    fn free(&mut self, handle: NativeHandle) {
        if self.live.remove(&handle) {
            self.frees += 1;
        }
    }

    fn begin_init(&mut self, strategy: InitStrategy) -> (Option<Duration>, bool) {
        self.init_calls.push(strategy);
        (self.stall, self.panic_on.contains(&strategy))
    }

    fn finish_init(&self, strategy: InitStrategy) -> Result<BackendInfo, BackendError> {
        if self.reject.contains(&strategy) {
            return Err(BackendError::Unsupported(format!("{strategy:?}")));
        }
        Ok(BackendInfo {
            adapter_name: "mock".to_owned(),
            api: "none".to_owned(),
            strategy,
        })
    }
}

fn stall_or_crash(
    stall: Option<Duration>,
    crash: bool,
    strategy: InitStrategy,
    request: &InitRequest,
) -> Result<(), BackendError> {
    if let Some(stall) = stall {
        thread::sleep(stall);
        if request.cancel.is_cancelled() {
            return Err(BackendError::Native("cancelled".to_owned()));
        }
    }
    if crash {
        panic!("mock driver crashed during {strategy:?}");
    }
    Ok(())
}

impl GraphicsBackend for MockBackend {
    fn init(&mut self, strategy: InitStrategy, request: &InitRequest) -> Result<BackendInfo, BackendError> {
        let (stall, crash) = self.begin_init(strategy);
        stall_or_crash(stall, crash, strategy, request)?;
        self.finish_init(strategy)
    }

    fn reset(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.resets.push((width, height));
        Ok(())
    }

    fn shutdown(&mut self) {
        self.shutdowns += 1;
    }

    fn create_buffer(&mut self, _kind: &BufferKind, _data: &[u8]) -> Result<NativeHandle, BackendError> {
        let handle = self.allocate()?;
        self.buffers_created += 1;
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: NativeHandle) {
        self.free(handle);
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError> {
        let handle = self.allocate()?;
        let size = (descriptor.width * descriptor.height * descriptor.format.bytes_per_pixel()) as usize;
        let mut texels = vec![0; size];
        if let Some(data) = data {
            let n = data.len().min(size);
            texels[..n].copy_from_slice(&data[..n]);
            self.uploads += 1;
        }
        self.textures.insert(handle, (*descriptor, texels));
        Ok(handle)
    }

    fn update_texture(
        &mut self,
        handle: NativeHandle,
        region: &TextureRegion,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let (descriptor, texels) = self
            .textures
            .get_mut(&handle)
            .ok_or(BackendError::InvalidHandle(handle))?;
        self.uploads += 1;
        if region.mip_level != 0 {
            return Ok(());
        }
        let bpp = descriptor.format.bytes_per_pixel() as usize;
        let row = region.width as usize * bpp;
        for y in 0..region.height as usize {
            let dst = ((region.y as usize + y) * descriptor.width as usize + region.x as usize) * bpp;
            texels[dst..dst + row].copy_from_slice(&data[y * row..(y + 1) * row]);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, handle: NativeHandle) {
        self.textures.remove(&handle);
        self.free(handle);
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<NativeHandle, BackendError> {
        let handle = self.allocate()?;
        self.programs_created += 1;
        self.programs.insert(handle, source.clone());
        Ok(handle)
    }

    fn destroy_program(&mut self, handle: NativeHandle) {
        self.programs.remove(&handle);
        self.free(handle);
    }

    fn set_state(&mut self, field: StateField) {
        self.state_calls.push(field);
    }

    fn set_clear(&mut self, view: ViewId, clear: ClearValues) {
        self.clears.push((view, clear));
    }

    fn submit(&mut self, command: &DrawCommand) {
        self.submitted.push(*command);
    }

    fn frame(&mut self) -> Result<(), BackendError> {
        self.frames += 1;
        Ok(())
    }
}

/// A [`MockBackend`] the test keeps a handle to after boxing it into a bridge.
#[derive(Debug, Clone, Default)]
pub struct SharedBackend {
    inner: Arc<Mutex<MockBackend>>,
}

impl SharedBackend {
    pub fn new(backend: MockBackend) -> Self {
        Self {
            inner: Arc::new(Mutex::new(backend)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, MockBackend> {
        self.inner.lock().unwrap()
    }
}

impl GraphicsBackend for SharedBackend {
    fn init(&mut self, strategy: InitStrategy, request: &InitRequest) -> Result<BackendInfo, BackendError> {
        // The lock is not held while stalling or panicking.
        let (stall, crash) = self.lock().begin_init(strategy);
        stall_or_crash(stall, crash, strategy, request)?;
        self.lock().finish_init(strategy)
    }

    fn reset(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.lock().reset(width, height)
    }

    fn shutdown(&mut self) {
        self.lock().shutdown();
    }

    fn create_buffer(&mut self, kind: &BufferKind, data: &[u8]) -> Result<NativeHandle, BackendError> {
        self.lock().create_buffer(kind, data)
    }

    fn destroy_buffer(&mut self, handle: NativeHandle) {
        self.lock().destroy_buffer(handle);
    }

    fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        data: Option<&[u8]>,
    ) -> Result<NativeHandle, BackendError> {
        self.lock().create_texture(descriptor, data)
    }

    fn update_texture(
        &mut self,
        handle: NativeHandle,
        region: &TextureRegion,
        data: &[u8],
    ) -> Result<(), BackendError> {
        self.lock().update_texture(handle, region, data)
    }

    fn destroy_texture(&mut self, handle: NativeHandle) {
        self.lock().destroy_texture(handle);
    }

    fn create_program(&mut self, source: &ShaderSource) -> Result<NativeHandle, BackendError> {
        self.lock().create_program(source)
    }

    fn destroy_program(&mut self, handle: NativeHandle) {
        self.lock().destroy_program(handle);
    }

    fn set_state(&mut self, field: StateField) {
        self.lock().set_state(field);
    }

    fn set_clear(&mut self, view: ViewId, clear: ClearValues) {
        self.lock().set_clear(view, clear);
    }

    fn submit(&mut self, command: &DrawCommand) {
        self.lock().submit(command);
    }

    fn frame(&mut self) -> Result<(), BackendError> {
        self.lock().frame()
    }
}
