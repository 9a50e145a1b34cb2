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

//! Opens a window and replays a small synthetic call stream through the bridge.
//!
//! Set `VEIL_SETTINGS` to a JSON file to override the bridge settings.

use anyhow::Result;
use std::sync::Arc;
use veil_bridge::Bridge;
use veil_core::{
    BlendFactor, BridgeSettings, CallOutcome, ClearValues, ComponentType, DrawState, IndexFormat,
    InterceptedCall, LogicalResourceId, MeshDraw, MeshId, PrimitiveTopology, ResourceRequest,
    SourceFormat, StateField, TextureRegion, VertexAttributeDescriptor, VertexLayout,
    VertexSemantic,
};
use veil_infra::{WgpuBackend, WgpuBackendConfig, WinitWindow, WinitWindowBuilder};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ColorVertex {
    position: [f32; 3],
    color: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TexturedVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const TRIANGLE: [ColorVertex; 3] = [
    ColorVertex {
        position: [0.0, 0.6, 0.0],
        color: [255, 64, 64, 255],
    },
    ColorVertex {
        position: [-0.6, -0.4, 0.0],
        color: [64, 255, 64, 255],
    },
    ColorVertex {
        position: [0.6, -0.4, 0.0],
        color: [64, 64, 255, 255],
    },
];

const QUAD: [TexturedVertex; 4] = [
    TexturedVertex {
        position: [0.4, 0.4],
        uv: [0.0, 0.0],
    },
    TexturedVertex {
        position: [0.9, 0.4],
        uv: [1.0, 0.0],
    },
    TexturedVertex {
        position: [0.9, 0.9],
        uv: [1.0, 1.0],
    },
    TexturedVertex {
        position: [0.4, 0.9],
        uv: [0.0, 1.0],
    },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const CHECKER_SIZE: u32 = 8;

fn checker_pixels() -> Vec<u8> {
    (0..CHECKER_SIZE * CHECKER_SIZE)
        .flat_map(|i| {
            let (x, y) = (i % CHECKER_SIZE, i / CHECKER_SIZE);
            if (x + y) % 2 == 0 {
                [230u8, 230, 230]
            } else {
                [40u8, 40, 40]
            }
        })
        .collect()
}

/// Column-major rotation about Z.
fn rotation_z(angle: f32) -> [[f32; 4]; 4] {
    let (s, c) = angle.sin_cos();
    [
        [c, s, 0.0, 0.0],
        [-s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// The meshes and texture the synthetic application draws.
struct Scene {
    triangle_vertices: Arc<[u8]>,
    triangle_layout: VertexLayout,
    quad_vertices: Arc<[u8]>,
    quad_indices: Arc<[u8]>,
    quad_layout: VertexLayout,
    checker: LogicalResourceId,
}

impl Scene {
    fn create(bridge: &mut Bridge) -> Self {
        let checker = match bridge.handle(InterceptedCall::ResourceCreate(ResourceRequest::Texture {
            width: CHECKER_SIZE,
            height: CHECKER_SIZE,
            format: SourceFormat::Rgb8,
            mip_levels: 1,
            data: Some(checker_pixels()),
        })) {
            CallOutcome::Created(id) => id,
            outcome => {
                log::warn!("Sandbox: checker texture not created ({outcome:?})");
                LogicalResourceId::null()
            }
        };

        Self {
            triangle_vertices: Arc::from(bytemuck::cast_slice::<_, u8>(&TRIANGLE)),
            triangle_layout: VertexLayout::new(vec![
                VertexAttributeDescriptor::new(VertexSemantic::Position, 3, ComponentType::Float32, false),
                VertexAttributeDescriptor::new(VertexSemantic::Color, 4, ComponentType::UInt8, true),
            ]),
            quad_vertices: Arc::from(bytemuck::cast_slice::<_, u8>(&QUAD)),
            quad_indices: Arc::from(bytemuck::cast_slice::<_, u8>(&QUAD_INDICES)),
            quad_layout: VertexLayout::new(vec![
                VertexAttributeDescriptor::new(VertexSemantic::Position, 2, ComponentType::Float32, false),
                VertexAttributeDescriptor::new(VertexSemantic::TexCoord0, 2, ComponentType::Float32, false),
            ]),
            checker,
        }
    }

    /// The calls one frame of the application makes.
    fn frame_calls(&self, frame: u64, width: u32, height: u32) -> Vec<InterceptedCall> {
        let mut calls = vec![InterceptedCall::FrameBegin { width, height }];

        // Blink one corner of the checker twice a second.
        if frame % 30 == 0 && self.checker.is_valid() {
            let shade = if frame % 60 == 0 { 255 } else { 0 };
            calls.push(InterceptedCall::TextureUpload {
                id: self.checker,
                region: TextureRegion {
                    mip_level: 0,
                    x: 0,
                    y: 0,
                    width: 2,
                    height: 2,
                },
                pixels: [shade, 160, 0].repeat(4),
            });
        }

        calls.push(InterceptedCall::StateChange(StateField::Blend(false)));
        calls.push(InterceptedCall::Draw(MeshDraw {
            mesh_id: MeshId(1),
            vertex_data: Arc::clone(&self.triangle_vertices),
            index_data: None,
            layout: self.triangle_layout.clone(),
            draw_state: DrawState {
                topology: PrimitiveTopology::TriangleList,
                vertex_count: TRIANGLE.len() as i32,
                transform: rotation_z(frame as f32 * 0.02),
                ..DrawState::default()
            },
        }));

        calls.push(InterceptedCall::StateChange(StateField::Blend(true)));
        calls.push(InterceptedCall::StateChange(StateField::BlendSrc(BlendFactor::SrcAlpha)));
        calls.push(InterceptedCall::StateChange(StateField::BlendDst(BlendFactor::OneMinusSrcAlpha)));
        calls.push(InterceptedCall::Draw(MeshDraw {
            mesh_id: MeshId(2),
            vertex_data: Arc::clone(&self.quad_vertices),
            index_data: Some(Arc::clone(&self.quad_indices)),
            layout: self.quad_layout.clone(),
            draw_state: DrawState {
                topology: PrimitiveTopology::TriangleList,
                vertex_count: QUAD.len() as i32,
                index_count: QUAD_INDICES.len() as i32,
                index_format: IndexFormat::Uint16,
                texture: Some(self.checker).filter(|id| id.is_valid()),
                ..DrawState::default()
            },
        }));

        calls.push(InterceptedCall::FrameEnd);
        calls
    }
}

#[derive(Default)]
struct SandboxApp {
    settings: BridgeSettings,
    window: Option<WinitWindow>,
    bridge: Option<Bridge>,
    scene: Option<Scene>,
    frame: u64,
}

impl SandboxApp {
    fn new(settings: BridgeSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    fn render(&mut self) {
        let (Some(window), Some(bridge), Some(scene)) =
            (self.window.as_ref(), self.bridge.as_mut(), self.scene.as_ref())
        else {
            return;
        };
        let (width, height) = window.inner_size();
        for call in scene.frame_calls(self.frame, width, height) {
            if let CallOutcome::Failed = bridge.handle(call) {
                log::debug!("Sandbox: a call failed in frame {}", self.frame);
            }
        }
        self.frame += 1;

        if self.frame % 300 == 0 {
            let stats = bridge.frame_stats();
            log::info!(
                "Frame {}: {} draws, {} skipped, {} state changes ({} suppressed), {:?}",
                self.frame,
                stats.draws_submitted,
                stats.draws_skipped,
                stats.state_changes_forwarded,
                stats.state_changes_suppressed,
                bridge.registry_stats()
            );
        }
    }
}

impl ApplicationHandler for SandboxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        log::info!("Application resumed. Creating window and bridge...");

        let window = match WinitWindowBuilder::new()
            .with_title("Veil Sandbox")
            .with_dimensions(1024, 768)
            .build(event_loop)
        {
            Ok(window) => window,
            Err(e) => {
                log::error!("Sandbox: cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let backend = WgpuBackend::new(WgpuBackendConfig::default());
        let mut bridge = Bridge::new(Box::new(backend), self.settings.clone());
        let (width, height) = window.inner_size();
        bridge.initialize(width, height, Some(window.platform_handle()));
        bridge.handle(InterceptedCall::ClearChange(ClearValues {
            color: [0.08, 0.09, 0.12, 1.0],
            ..ClearValues::default()
        }));

        self.scene = Some(Scene::create(&mut bridge));
        self.bridge = Some(bridge);
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(WinitWindow::id) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested, exiting event loop...");
                if let Some(bridge) = self.bridge.as_mut() {
                    bridge.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(bridge) = self.bridge.as_mut() {
                    log::info!("Window resized to: {}x{}", size.width, size.height);
                    bridge.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.render(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let settings = match std::env::var_os("VEIL_SETTINGS") {
        Some(path) => BridgeSettings::from_json_file(path)?,
        None => BridgeSettings::default(),
    };

    let event_loop = EventLoop::new()?;
    let mut app = SandboxApp::new(settings);
    event_loop.run_app(&mut app)?;
    Ok(())
}
