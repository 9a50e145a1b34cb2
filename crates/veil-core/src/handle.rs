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

//! Identifiers handed across the translation boundary.

use serde::{Deserialize, Serialize};
use slotmap::Key;

slotmap::new_key_type! {
    /// Application-facing identifier for a buffer, texture or shader program.
    ///
    /// Ids are generational arena keys: once a resource is destroyed its id
    /// never resolves again, even if the slot is recycled for a new resource.
    /// [`LogicalResourceId::null()`] is returned when creation fails.
    pub struct LogicalResourceId;
}

impl LogicalResourceId {
    /// The id returned when a resource could not be created.
    pub fn null() -> Self {
        <Self as Key>::null()
    }

    /// `true` for any id other than the null id.
    pub fn is_valid(&self) -> bool {
        !self.is_null()
    }
}

/// A backend-specific token for a native object.
///
/// Zero is a legitimate handle for some backends, so the invalid value is
/// [`NativeHandle::INVALID`] (`u64::MAX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The distinguished "no native object" sentinel.
    pub const INVALID: Self = Self(u64::MAX);

    /// Returns `true` unless this is [`NativeHandle::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for NativeHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// The category of a registered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Vertex buffer.
    Vertex,
    /// Index buffer.
    Index,
    /// Sampled texture or render target.
    Texture,
    /// Shader program.
    Shader,
}

/// A backend render target / pass identifier.
///
/// Views are rendered in ascending id order at the end of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ViewId(pub u16);

/// Application-supplied identity of a mesh, passed explicitly with every draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);
