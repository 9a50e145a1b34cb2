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

//! Maps each initialization strategy to the adapter request it makes.
//!
//! The strategies go from most capable to most compatible: the preferred
//! adapter presenting to the platform window, then any adapter rendering
//! offscreen, then a software fallback adapter on a fresh instance.

use veil_core::InitStrategy;
use wgpu::{Backend, Backends, PowerPreference};

use super::backend::WgpuBackendConfig;

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

/// How one strategy asks `wgpu` for an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AdapterPlan {
    pub backends: Backends,
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
    /// Create a surface from the platform window and present to it.
    pub present_to_window: bool,
}

impl AdapterPlan {
    pub fn for_strategy(strategy: InitStrategy, config: &WgpuBackendConfig) -> Self {
        match strategy {
            InitStrategy::PreferredWithWindow => Self {
                backends: config.backends,
                power_preference: config.power_preference,
                force_fallback_adapter: false,
                present_to_window: true,
            },
            InitStrategy::Minimal => Self {
                backends: config.backends,
                power_preference: PowerPreference::None,
                force_fallback_adapter: false,
                present_to_window: false,
            },
            InitStrategy::Isolated => Self {
                backends: Backends::all(),
                power_preference: PowerPreference::LowPower,
                force_fallback_adapter: true,
                present_to_window: false,
            },
        }
    }
}
