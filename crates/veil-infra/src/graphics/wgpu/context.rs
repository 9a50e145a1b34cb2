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

use anyhow::{anyhow, bail, Result};
use std::fmt;
use veil_core::{CancelToken, PlatformWindow};
use wgpu::SurfaceTargetUnsafe;

use super::backend::WgpuBackendConfig;
use super::strategy::{backend_name, AdapterPlan};

/// Format of the offscreen color target used when no window is presented to.
const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Where frames are rendered.
#[derive(Debug)]
pub(crate) enum RenderTarget {
    /// A swapchain presenting to the platform window.
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// A texture nobody presents; used by the windowless strategies.
    Offscreen { texture: wgpu::Texture },
}

/// The color view of one acquired frame.
pub(crate) struct FrameTarget {
    pub view: wgpu::TextureView,
    /// Presented once the frame's commands are submitted.
    pub surface_texture: Option<wgpu::SurfaceTexture>,
}

/// Holds the core WGPU state objects created by one successful strategy.
pub(crate) struct WgpuGraphicsContext {
    #[allow(dead_code)]
    pub instance: wgpu::Instance,
    #[allow(dead_code)]
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub target: RenderTarget,
    pub color_format: wgpu::TextureFormat,
    pub width: u32,
    pub height: u32,

    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,

    // The surface reads the window through raw handles; it must be dropped first.
    _window: Option<PlatformWindow>,
}

impl fmt::Debug for WgpuGraphicsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuGraphicsContext")
            .field("adapter_name", &self.adapter_name)
            .field("adapter_backend", &self.adapter_backend)
            .field("color_format", &self.color_format)
            .field("size", &(self.width, self.height))
            .field("presents", &matches!(self.target, RenderTarget::Surface { .. }))
            .finish()
    }
}

impl WgpuGraphicsContext {
    /// Brings up an instance, adapter and device as `plan` describes.
    ///
    /// ## Errors
    /// Fails when the plan needs a window and none was given, when no adapter
    /// matches, when the device cannot be created, or when `cancel` is set
    /// between steps.
    pub async fn new(
        plan: AdapterPlan,
        config: &WgpuBackendConfig,
        window: Option<PlatformWindow>,
        width: u32,
        height: u32,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: plan.backends,
            ..Default::default()
        });

        // --- 1. Create Surface ---
        let (surface, window) = if plan.present_to_window {
            let window = window.ok_or_else(|| anyhow!("no platform window is attached"))?;
            let surface_target = unsafe {
                SurfaceTargetUnsafe::from_window(&window)
                    .map_err(|e| anyhow!("Failed to create surface target: {}", e))?
            };
            let surface = unsafe { instance.create_surface_unsafe(surface_target)? };
            log::debug!("WGPU surface created for the window.");
            (Some(surface), Some(window))
        } else {
            (None, None)
        };

        // --- 2. Select Adapter ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: plan.power_preference,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: plan.force_fallback_adapter,
            })
            .await
            .map_err(|e| anyhow!("No suitable adapter: {}", e))?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {})",
            adapter_info.name,
            backend_name(adapter_info.backend)
        );
        if cancel.is_cancelled() {
            bail!("initialization cancelled after adapter selection");
        }

        // --- 3. Create Logical Device and Command Queue ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Veil Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));
        if cancel.is_cancelled() {
            bail!("initialization cancelled after device creation");
        }

        // --- 4. Configure Target ---
        let width = width.max(1);
        let height = height.max(1);
        let (target, color_format) = match surface {
            Some(surface) => {
                let surface_caps = surface.get_capabilities(&adapter);
                let surface_format = surface_caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| f.is_srgb())
                    .or_else(|| surface_caps.formats.first().copied())
                    .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
                let present_mode = if config.prefer_mailbox {
                    surface_caps
                        .present_modes
                        .iter()
                        .copied()
                        .find(|m| *m == wgpu::PresentMode::Mailbox)
                        .unwrap_or(wgpu::PresentMode::Fifo)
                } else {
                    wgpu::PresentMode::Fifo
                };
                let surface_config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format: surface_format,
                    width,
                    height,
                    present_mode,
                    alpha_mode: surface_caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&device, &surface_config);
                (
                    RenderTarget::Surface {
                        surface,
                        config: surface_config,
                    },
                    surface_format,
                )
            }
            None => (
                RenderTarget::Offscreen {
                    texture: create_offscreen(&device, width, height),
                },
                OFFSCREEN_FORMAT,
            ),
        };

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            target,
            color_format,
            width,
            height,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            _window: window,
        })
    }

    /// Reconfigures the swapchain or recreates the offscreen target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("WgpuGraphicsContext: Ignoring resize request to zero dimensions: {width}x{height}");
            return;
        }
        log::info!("WgpuGraphicsContext: Resizing render target to {width}x{height}");
        self.width = width;
        self.height = height;
        match &mut self.target {
            RenderTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            RenderTarget::Offscreen { texture } => {
                *texture = create_offscreen(&self.device, width, height);
            }
        }
    }

    /// Acquires the color target for this frame.
    ///
    /// A lost or outdated swapchain is reconfigured once before giving up.
    pub fn acquire(&mut self) -> Result<FrameTarget> {
        let (surface, config) = match &self.target {
            RenderTarget::Offscreen { texture } => {
                return Ok(FrameTarget {
                    view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                    surface_texture: None,
                });
            }
            RenderTarget::Surface { surface, config } => (surface, config),
        };

        let mut reconfigured = false;
        let surface_texture = loop {
            match surface.get_current_texture() {
                Ok(texture) => break texture,
                Err(e @ wgpu::SurfaceError::Lost) | Err(e @ wgpu::SurfaceError::Outdated) => {
                    if reconfigured {
                        bail!("surface still unusable after reconfiguring: {e:?}");
                    }
                    log::warn!(
                        "WgpuGraphicsContext: Swapchain surface lost or outdated ({:?}). Reconfiguring with W={}, H={}",
                        e,
                        config.width,
                        config.height
                    );
                    surface.configure(&self.device, config);
                    reconfigured = true;
                }
                Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("WgpuGraphicsContext: Swapchain OutOfMemory! ({e:?})");
                    bail!("OutOfMemory: {e:?}");
                }
                Err(e @ wgpu::SurfaceError::Timeout) => {
                    log::warn!("WgpuGraphicsContext: Swapchain Timeout acquiring frame. ({e:?})");
                    bail!("Timeout: {e:?}");
                }
                Err(e) => {
                    log::error!("WgpuGraphicsContext: Unexpected SurfaceError: {e:?}");
                    bail!("Unexpected SurfaceError: {e:?}");
                }
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(FrameTarget {
            view,
            surface_texture: Some(surface_texture),
        })
    }

    pub fn presents(&self) -> bool {
        matches!(self.target, RenderTarget::Surface { .. })
    }
}

fn create_offscreen(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Veil Offscreen Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
