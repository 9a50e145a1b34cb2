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

//! Hand-off queue for work produced off the render thread.
//!
//! Content loaders stage mesh binds, mesh releases and texture uploads
//! through a [`StagingSender`]. The render thread drains the queue at frame
//! begin; native calls never happen on the sending side.

use veil_core::{LogicalResourceId, MeshDraw, MeshId, TextureRegion};

/// One unit of staged work.
#[derive(Debug, Clone)]
pub enum StagedOp {
    /// Create (or refresh) a mesh binding without drawing it.
    BindMesh(MeshDraw),
    /// Release a mesh binding.
    ReleaseMesh(MeshId),
    /// Overwrite a texture region.
    UploadTexture {
        /// Target texture.
        id: LogicalResourceId,
        /// Region to write.
        region: TextureRegion,
        /// Pixels in the texture's source format.
        pixels: Vec<u8>,
    },
}

/// The sending half, cheap to clone and safe to move to worker threads.
#[derive(Debug, Clone)]
pub struct StagingSender {
    sender: flume::Sender<StagedOp>,
}

impl StagingSender {
    /// Stages an operation. Returns `false` if the bridge is gone.
    pub fn stage(&self, op: StagedOp) -> bool {
        match self.sender.send(op) {
            Ok(()) => true,
            Err(e) => {
                log::error!("StagingSender: bridge dropped, discarding {:?}", e.into_inner());
                false
            }
        }
    }

    /// Stages a mesh bind.
    pub fn bind_mesh(&self, draw: MeshDraw) -> bool {
        self.stage(StagedOp::BindMesh(draw))
    }

    /// Stages a mesh release.
    pub fn release_mesh(&self, mesh_id: MeshId) -> bool {
        self.stage(StagedOp::ReleaseMesh(mesh_id))
    }

    /// Stages a texture upload.
    pub fn upload_texture(&self, id: LogicalResourceId, region: TextureRegion, pixels: Vec<u8>) -> bool {
        self.stage(StagedOp::UploadTexture { id, region, pixels })
    }
}

/// Unbounded multi-producer queue drained on the render thread.
#[derive(Debug)]
pub struct StagingQueue {
    sender: flume::Sender<StagedOp>,
    receiver: flume::Receiver<StagedOp>,
}

impl StagingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    /// A new sending handle.
    pub fn sender(&self) -> StagingSender {
        StagingSender {
            sender: self.sender.clone(),
        }
    }

    /// Removes up to `budget` operations in the order they were staged.
    /// `None` drains everything currently queued.
    pub fn drain(&self, budget: Option<usize>) -> Vec<StagedOp> {
        let ops: Vec<StagedOp> = self
            .receiver
            .try_iter()
            .take(budget.unwrap_or(usize::MAX))
            .collect();
        if !ops.is_empty() {
            log::trace!("StagingQueue: drained {} operations ({} left)", ops.len(), self.receiver.len());
        }
        ops
    }

    /// Operations waiting to be drained.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for StagingQueue {
    fn default() -> Self {
        Self::new()
    }
}
