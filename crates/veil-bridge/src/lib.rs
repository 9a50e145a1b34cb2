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

//! # Veil Bridge
//!
//! The translation engine. Intercepted immediate-mode calls come in, minimal
//! command sequences for a [`veil_core::GraphicsBackend`] go out.
//!
//! Components, each usable on its own:
//! - [`registry::ResourceRegistry`]: logical ids to native handles.
//! - [`layout::LayoutTranslator`]: vertex layout compilation and caching.
//! - [`state::StateTracker`]: per-field render state diffing.
//! - [`texture::TextureManager`]: format mapping and partial uploads.
//! - [`mesh::MeshCache`]: mesh buffers and program selection.
//! - [`submit::DrawSubmitter`]: ordered draw submission.
//! - [`lifecycle::LifecycleController`]: deferred device bring-up.
//!
//! [`Bridge`] wires them together behind the intercepted-call feed.

#![warn(missing_docs)]

pub mod bridge;
pub mod layout;
pub mod lifecycle;
pub mod mesh;
pub mod program;
pub mod registry;
pub mod staging;
pub mod state;
pub mod submit;
pub mod texture;

#[cfg(test)]
pub(crate) mod testing;

use veil_core::GraphicsBackend;

/// The backend as components see it: `None` until a device exists.
pub type BackendRef<'a> = Option<&'a mut (dyn GraphicsBackend + 'static)>;

pub use bridge::{Bridge, FrameStats};
pub use lifecycle::{BackendSession, FrameStart, LifecyclePhase};
pub use staging::{StagedOp, StagingSender};
pub use submit::SubmitOutcome;
