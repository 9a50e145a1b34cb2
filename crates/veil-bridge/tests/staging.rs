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

//! Work staged from loader threads and drained at frame begin.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use std::thread;
use veil_core::{BridgeSettings, MeshId, ResourceRequest, SourceFormat, TextureRegion};

#[test]
fn test_meshes_staged_from_threads_are_bound_at_frame_begin() {
    let (mut bridge, backend) = running_bridge();
    let allocations = backend.lock().allocations;

    let workers: Vec<_> = (0..4u64)
        .map(|i| {
            let sender = bridge.staging_sender();
            thread::spawn(move || sender.bind_mesh(position_mesh(100 + i, &TRIANGLE)))
        })
        .collect();
    for worker in workers {
        assert!(worker.join().unwrap());
    }
    assert_eq!(backend.lock().allocations, allocations, "nothing happens off the render thread");

    bridge.begin_frame(640, 480);
    // Four vertex buffers plus the shared built-in program.
    assert_eq!(backend.lock().allocations, allocations + 5);
    assert_eq!(bridge.mesh_stats().misses, 4);

    bridge.draw(&position_mesh(102, &TRIANGLE));
    assert_eq!(bridge.mesh_stats().hits, 1);
}

#[test]
fn test_drain_budget_spreads_work_across_frames() {
    let settings = BridgeSettings {
        max_staged_per_frame: Some(2),
        ..inline_settings()
    };
    let (mut bridge, _backend) = bridge_with(MockBackend::default(), settings);
    bridge.begin_frame(64, 64);

    let sender = bridge.staging_sender();
    for i in 0..5 {
        sender.bind_mesh(position_mesh(i, &TRIANGLE));
    }
    bridge.begin_frame(64, 64);
    assert_eq!(bridge.mesh_stats().misses, 2);
    bridge.begin_frame(64, 64);
    bridge.begin_frame(64, 64);
    assert_eq!(bridge.mesh_stats().misses, 5);
}

#[test]
fn test_staged_release_and_upload_apply_on_render_thread() {
    let (mut bridge, backend) = running_bridge();
    bridge.draw(&position_mesh(7, &TRIANGLE));
    let texture = bridge.create_resource(ResourceRequest::Texture {
        width: 2,
        height: 2,
        format: SourceFormat::Rgba8,
        mip_levels: 1,
        data: None,
    });
    let live = backend.lock().live_objects();

    let sender = bridge.staging_sender();
    let handle = thread::spawn(move || {
        sender.release_mesh(MeshId(7));
        sender.upload_texture(texture, TextureRegion::full(1, 1), vec![9, 9, 9, 9]);
    });
    handle.join().unwrap();

    bridge.begin_frame(640, 480);
    let log = backend.lock();
    assert_eq!(log.live_objects(), live - 1);
    assert_eq!(&log.texels(bridge.resolve(texture)).unwrap()[..4], &[9, 9, 9, 9]);
}
