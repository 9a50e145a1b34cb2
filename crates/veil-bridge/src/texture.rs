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

//! Texture creation, partial update and pixel format conversion.

use crate::registry::{ResourceEntry, ResourceRegistry, ResourceSpec};
use crate::BackendRef;
use std::borrow::Cow;
use std::collections::HashMap;
use veil_core::{
    LogicalResourceId, ResourceKind, SourceFormat, TextureDescriptor, TextureFormat,
    TextureRegion,
};

/// How application pixels are rewritten into native texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelConversion {
    Copy,
    RgbToRgba,
    BgraToRgba,
    LuminanceToRgba,
    AlphaToRgba,
    LuminanceAlphaToRgba,
    /// Depth storage is never uploaded from the CPU.
    Discard,
}

/// Native storage chosen for a source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMapping {
    /// Backend storage format.
    pub native: TextureFormat,
    /// `true` when the source format had no entry and RGBA8 was assumed.
    pub fallback: bool,
    conversion: PixelConversion,
}

/// Maps an application pixel format to backend storage.
///
/// Single and dual channel formats are expanded to RGBA8 so sampling them
/// yields the same color a fixed-function pipeline would produce. Unknown
/// formats are stored as RGBA8.
pub fn map_format(format: SourceFormat) -> FormatMapping {
    let (native, conversion, fallback) = match format {
        SourceFormat::Rgba8 => (TextureFormat::Rgba8Unorm, PixelConversion::Copy, false),
        SourceFormat::Rgb8 => (TextureFormat::Rgba8Unorm, PixelConversion::RgbToRgba, false),
        SourceFormat::Bgra8 => (TextureFormat::Rgba8Unorm, PixelConversion::BgraToRgba, false),
        SourceFormat::Luminance8 => (TextureFormat::Rgba8Unorm, PixelConversion::LuminanceToRgba, false),
        SourceFormat::Alpha8 => (TextureFormat::Rgba8Unorm, PixelConversion::AlphaToRgba, false),
        SourceFormat::LuminanceAlpha8 => {
            (TextureFormat::Rgba8Unorm, PixelConversion::LuminanceAlphaToRgba, false)
        }
        SourceFormat::Rgba16F => (TextureFormat::Rgba16Float, PixelConversion::Copy, false),
        SourceFormat::Rgba32F => (TextureFormat::Rgba32Float, PixelConversion::Copy, false),
        SourceFormat::Depth16 => (TextureFormat::Depth16Unorm, PixelConversion::Discard, false),
        SourceFormat::Depth24 => (TextureFormat::Depth24Plus, PixelConversion::Discard, false),
        SourceFormat::Depth24Stencil8 => {
            (TextureFormat::Depth24PlusStencil8, PixelConversion::Discard, false)
        }
        SourceFormat::Depth32F => (TextureFormat::Depth32Float, PixelConversion::Discard, false),
        SourceFormat::Other(_) => (TextureFormat::Rgba8Unorm, PixelConversion::Copy, true),
    };
    FormatMapping {
        native,
        fallback,
        conversion,
    }
}

fn expand(data: &[u8], bpp: usize, texel: fn(&[u8]) -> [u8; 4]) -> Cow<'_, [u8]> {
    Cow::Owned(data.chunks_exact(bpp).flat_map(texel).collect())
}

fn convert_pixels(conversion: PixelConversion, data: &[u8]) -> Option<Cow<'_, [u8]>> {
    Some(match conversion {
        PixelConversion::Copy => Cow::Borrowed(data),
        PixelConversion::RgbToRgba => expand(data, 3, |p| [p[0], p[1], p[2], 0xFF]),
        PixelConversion::BgraToRgba => expand(data, 4, |p| [p[2], p[1], p[0], p[3]]),
        PixelConversion::LuminanceToRgba => expand(data, 1, |p| [p[0], p[0], p[0], 0xFF]),
        PixelConversion::AlphaToRgba => expand(data, 1, |p| [0, 0, 0, p[0]]),
        PixelConversion::LuminanceAlphaToRgba => expand(data, 2, |p| [p[0], p[0], p[0], p[1]]),
        PixelConversion::Discard => return None,
    })
}

#[derive(Debug, Clone, Copy)]
struct TextureInfo {
    source: SourceFormat,
    descriptor: TextureDescriptor,
}

/// Creates, updates and deletes textures through the registry.
#[derive(Debug, Default)]
pub struct TextureManager {
    textures: HashMap<LogicalResourceId, TextureInfo>,
}

impl TextureManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a texture, uploading `data` to mip 0 when given.
    ///
    /// Returns the null id for zero-sized textures or when the backend
    /// cannot allocate the storage.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        registry: &mut ResourceRegistry,
        backend: BackendRef<'_>,
        width: u32,
        height: u32,
        format: SourceFormat,
        mip_levels: u32,
        data: Option<&[u8]>,
    ) -> LogicalResourceId {
        if width == 0 || height == 0 {
            log::warn!("TextureManager: refusing to create a {width}x{height} texture");
            return LogicalResourceId::null();
        }

        let mapping = map_format(format);
        if mapping.fallback {
            log::debug!("TextureManager: no mapping for {format:?}, storing as {:?}", mapping.native);
        }
        let max_levels = TextureDescriptor::max_mip_levels(width, height);
        if mip_levels > max_levels {
            log::debug!(
                "TextureManager: {mip_levels} mip levels requested for {width}x{height}, clamping to {max_levels}"
            );
        }
        let descriptor = TextureDescriptor {
            width,
            height,
            format: mapping.native,
            mip_level_count: mip_levels.clamp(1, max_levels),
        };

        let texels = data.and_then(|pixels| {
            let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
            if pixels.len() < expected {
                log::warn!(
                    "TextureManager: initial data for {width}x{height} {format:?} is {} bytes, expected {expected}; allocating without upload",
                    pixels.len()
                );
                return None;
            }
            match convert_pixels(mapping.conversion, &pixels[..expected]) {
                Some(texels) => Some(texels.into_owned()),
                None => {
                    log::warn!("TextureManager: ignoring initial data for depth format {format:?}");
                    None
                }
            }
        });

        let id = registry.create(
            backend,
            ResourceSpec::Texture {
                descriptor,
                data: texels,
                updates: Vec::new(),
            },
        );
        if id.is_valid() {
            self.textures.insert(id, TextureInfo { source: format, descriptor });
        }
        id
    }

    /// Overwrites `region` of texture `id` with `data` in its source format.
    ///
    /// Only the region is written; the native texture is never reallocated.
    /// Writes to a texture still waiting for the device are kept and land
    /// when it is created. Returns `false` when the update was skipped or the
    /// backend failed.
    pub fn update(
        &self,
        registry: &mut ResourceRegistry,
        backend: BackendRef<'_>,
        id: LogicalResourceId,
        region: TextureRegion,
        data: &[u8],
    ) -> bool {
        let Some(info) = self.textures.get(&id) else {
            log::trace!("TextureManager: update of {id:?} skipped, texture not available");
            return false;
        };

        let Some((mip_width, mip_height)) = info.descriptor.mip_size(region.mip_level) else {
            log::warn!(
                "TextureManager: mip level {} out of range for {id:?} ({} levels)",
                region.mip_level,
                info.descriptor.mip_level_count
            );
            return false;
        };
        let fits_x = region.x.checked_add(region.width).is_some_and(|end| end <= mip_width);
        let fits_y = region.y.checked_add(region.height).is_some_and(|end| end <= mip_height);
        if !fits_x || !fits_y || region.texel_count() == 0 {
            log::warn!(
                "TextureManager: region {region:?} does not fit {mip_width}x{mip_height} mip of {id:?}"
            );
            return false;
        }

        let expected = region.texel_count() as usize * info.source.bytes_per_pixel() as usize;
        if data.len() < expected {
            log::warn!(
                "TextureManager: update of {id:?} carries {} bytes, region needs {expected}",
                data.len()
            );
            return false;
        }

        let mapping = map_format(info.source);
        let Some(texels) = convert_pixels(mapping.conversion, &data[..expected]) else {
            log::warn!("TextureManager: CPU update of depth texture {id:?} ignored");
            return false;
        };

        if registry.entry(id).is_some_and(ResourceEntry::is_pending) {
            return registry.write_pending_texture(id, region, texels.into_owned());
        }
        let native = registry.resolve_kind(id, ResourceKind::Texture);
        let Some(backend) = backend else {
            log::trace!("TextureManager: update of {id:?} skipped, no backend");
            return false;
        };
        if !native.is_valid() {
            log::trace!("TextureManager: update of {id:?} skipped, no native texture");
            return false;
        }

        match backend.update_texture(native, &region, &texels) {
            Ok(()) => true,
            Err(e) => {
                log::error!("TextureManager: update of {id:?} failed: {e}");
                false
            }
        }
    }

    /// Destroys texture `id`. Unknown ids are ignored.
    pub fn destroy(&mut self, registry: &mut ResourceRegistry, backend: BackendRef<'_>, id: LogicalResourceId) {
        if self.textures.remove(&id).is_some() {
            registry.destroy(backend, id);
        }
    }

    /// Forgets a texture destroyed through the registry directly.
    pub fn forget(&mut self, id: LogicalResourceId) {
        self.textures.remove(&id);
    }

    /// Descriptor of texture `id`.
    pub fn descriptor(&self, id: LogicalResourceId) -> Option<TextureDescriptor> {
        self.textures.get(&id).map(|info| info.descriptor)
    }

    /// Forgets every texture at the end of a session.
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    #[test]
    fn test_rgb_is_expanded_to_opaque_rgba() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(
            &mut registry,
            Some(&mut backend),
            2,
            1,
            SourceFormat::Rgb8,
            1,
            Some(&[1, 2, 3, 4, 5, 6]),
        );
        let native = registry.resolve(id);
        assert_eq!(backend.texels(native), Some(&[1, 2, 3, 255, 4, 5, 6, 255][..]));
    }

    #[test]
    fn test_unknown_format_falls_back_to_rgba8() {
        let mapping = map_format(SourceFormat::Other(0x8C40));
        assert_eq!(mapping.native, TextureFormat::Rgba8Unorm);
        assert!(mapping.fallback);
        assert!(!map_format(SourceFormat::Rgba32F).fallback);
        assert_eq!(map_format(SourceFormat::Depth24).native, TextureFormat::Depth24Plus);
    }

    #[test]
    fn test_create_without_data_allocates_storage_only() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, Some(&mut backend), 16, 16, SourceFormat::Rgba8, 1, None);
        assert!(registry.resolve(id).is_valid());
        assert_eq!(backend.uploads, 0);
        assert_eq!(registry.entry(id).map(|e| e.byte_size), Some(16 * 16 * 4));
    }

    #[test]
    fn test_update_rejects_region_outside_mip() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, Some(&mut backend), 8, 8, SourceFormat::Rgba8, 2, None);
        let region = TextureRegion {
            mip_level: 1,
            x: 2,
            y: 2,
            width: 4,
            height: 4,
        };
        assert!(!textures.update(&mut registry, Some(&mut backend), id, region, &[0; 64]));
        let inside = TextureRegion { x: 0, y: 0, ..region };
        assert!(textures.update(&mut registry, Some(&mut backend), id, inside, &[0; 64]));
    }

    #[test]
    fn test_update_of_unknown_texture_is_skipped() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let textures = TextureManager::new();
        let region = TextureRegion::full(1, 1);
        assert!(!textures.update(&mut registry, Some(&mut backend), LogicalResourceId::null(), region, &[0; 4]));
        assert_eq!(backend.uploads, 0);
    }

    #[test]
    fn test_short_update_data_is_rejected() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, Some(&mut backend), 4, 4, SourceFormat::Rgb8, 1, None);
        assert!(!textures.update(&mut registry, Some(&mut backend), id, TextureRegion::full(2, 2), &[0; 11]));
        assert!(textures.update(&mut registry, Some(&mut backend), id, TextureRegion::full(2, 2), &[0; 12]));
    }

    #[test]
    fn test_oversized_mip_count_is_clamped_to_full_chain() {
        let mut backend = MockBackend::default();
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, Some(&mut backend), 64, 64, SourceFormat::Rgba8, 40, None);
        assert!(registry.resolve(id).is_valid());
        assert_eq!(textures.descriptor(id).map(|d| d.mip_level_count), Some(7));
        let deepest = TextureRegion {
            mip_level: 6,
            ..TextureRegion::full(1, 1)
        };
        assert!(textures.update(&mut registry, Some(&mut backend), id, deepest, &[0; 4]));
        let past_end = TextureRegion {
            mip_level: 39,
            ..deepest
        };
        assert!(!textures.update(&mut registry, Some(&mut backend), id, past_end, &[0; 4]));
    }

    #[test]
    fn test_update_before_device_lands_after_materialization() {
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, None, 4, 4, SourceFormat::Rgba8, 2, None);
        assert!(textures.update(&mut registry, None, id, TextureRegion::full(4, 4), &[0xAB; 64]));
        let corner = TextureRegion::full(1, 1);
        assert!(textures.update(&mut registry, None, id, corner, &[1, 2, 3, 4]));
        let mip1 = TextureRegion {
            mip_level: 1,
            ..TextureRegion::full(2, 2)
        };
        assert!(textures.update(&mut registry, None, id, mip1, &[7; 16]));

        let mut backend = MockBackend::default();
        assert_eq!(registry.materialize_pending(&mut backend), 1);
        let texels = backend.texels(registry.resolve(id)).unwrap();
        assert_eq!(&texels[..4], &[1, 2, 3, 4]);
        assert_eq!(&texels[4..8], &[0xAB; 4]);
        assert_eq!(texels.len(), 64);
        // Initial contents plus the replayed mip 1 write.
        assert_eq!(backend.uploads, 2);
    }

    #[test]
    fn test_luminance_update_before_device_is_expanded() {
        let mut registry = ResourceRegistry::new();
        let mut textures = TextureManager::new();
        let id = textures.create(&mut registry, None, 2, 1, SourceFormat::Luminance8, 1, None);
        assert!(textures.update(&mut registry, None, id, TextureRegion::full(2, 1), &[10, 20]));

        let mut backend = MockBackend::default();
        registry.materialize_pending(&mut backend);
        assert_eq!(
            backend.texels(registry.resolve(id)),
            Some(&[10, 10, 10, 255, 20, 20, 20, 255][..])
        );
    }
}
