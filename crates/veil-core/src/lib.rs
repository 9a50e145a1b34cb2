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

//! # Veil Core
//!
//! Backend-agnostic contracts for the veil translation layer: resource
//! identifiers, vertex and state descriptions, the intercepted-call feed and
//! the [`backend::GraphicsBackend`] trait that concrete graphics APIs implement.
//!
//! Nothing in this crate talks to a GPU.

#![warn(missing_docs)]

pub mod backend;
pub mod call;
pub mod draw;
pub mod error;
pub mod handle;
pub mod mesh;
pub mod platform;
pub mod settings;
pub mod state;
pub mod texture;
pub mod vertex;

pub use backend::*;
pub use call::*;
pub use draw::*;
pub use error::*;
pub use handle::*;
pub use mesh::*;
pub use platform::{PlatformWindow, WindowHandle};
pub use settings::*;
pub use state::*;
pub use texture::*;
pub use vertex::*;
