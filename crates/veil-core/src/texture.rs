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

//! Texture formats and descriptors.

/// Pixel formats as the application names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// 8-bit RGB, tightly packed.
    Rgb8,
    /// 8-bit RGBA.
    Rgba8,
    /// 8-bit BGRA.
    Bgra8,
    /// Single 8-bit luminance channel.
    Luminance8,
    /// Single 8-bit alpha channel.
    Alpha8,
    /// 8-bit luminance + alpha.
    LuminanceAlpha8,
    /// 16-bit float RGBA.
    Rgba16F,
    /// 32-bit float RGBA.
    Rgba32F,
    /// 16-bit depth.
    Depth16,
    /// 24-bit depth.
    Depth24,
    /// 24-bit depth + 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32F,
    /// A source API format code with no known mapping.
    Other(u32),
}

impl SourceFormat {
    /// Bytes per pixel of application-supplied data in this format.
    ///
    /// Unknown formats are assumed to carry four bytes per pixel, matching
    /// the RGBA8 storage they fall back to.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            SourceFormat::Luminance8 | SourceFormat::Alpha8 => 1,
            SourceFormat::LuminanceAlpha8 | SourceFormat::Depth16 => 2,
            SourceFormat::Rgb8 => 3,
            SourceFormat::Rgba8
            | SourceFormat::Bgra8
            | SourceFormat::Depth24
            | SourceFormat::Depth24Stencil8
            | SourceFormat::Depth32F
            | SourceFormat::Other(_) => 4,
            SourceFormat::Rgba16F => 8,
            SourceFormat::Rgba32F => 16,
        }
    }
}

/// Backend texel storage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Red channel only. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    R8Unorm,
    /// Red and green channels. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    Rg8Unorm,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. [0, 255] converted to/from float [0, 1] in shader.
    Rgba8Unorm,
    /// Red, green, blue, and alpha channels. 8 bit integer per channel. Srgb-color [0, 255] converted to/from linear-color float [0, 1] in shader.
    Rgba8UnormSrgb,
    /// Blue, green, red, and alpha channels. 8 bit integer per channel. Srgb-color [0, 255] converted to/from linear-color float [0, 1] in shader.
    Bgra8UnormSrgb,
    /// Red, green, blue, and alpha channels. 16 bit float per channel.
    Rgba16Float,
    /// Red, green, blue, and alpha channels. 32 bit float per channel.
    Rgba32Float,
    /// Special depth format with 16 bit integer depth.
    Depth16Unorm,
    /// Special depth format with at least 24 bit integer depth.
    Depth24Plus,
    /// Special depth/stencil format with at least 24 bit integer depth and 8 bits integer stencil.
    Depth24PlusStencil8,
    /// Special depth format with 32 bit floating point depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns the size in bytes of a single pixel for this format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm => 2,
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Rgba8UnormSrgb => 4,
            TextureFormat::Bgra8UnormSrgb => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth16Unorm => 2,
            TextureFormat::Depth24Plus => 4,
            TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Depth32Float => 4,
        }
    }

    /// `true` for depth and depth/stencil formats.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24Plus
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
        )
    }
}

/// Storage to allocate for a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Width of mip 0 in pixels.
    pub width: u32,
    /// Height of mip 0 in pixels.
    pub height: u32,
    /// Backend storage format.
    pub format: TextureFormat,
    /// Number of mip levels, at least 1.
    pub mip_level_count: u32,
}

impl TextureDescriptor {
    /// Dimensions of `mip_level`, or `None` past the last level.
    pub fn mip_size(&self, mip_level: u32) -> Option<(u32, u32)> {
        if mip_level >= self.mip_level_count {
            return None;
        }
        let shrink = |extent: u32| extent.checked_shr(mip_level).unwrap_or(0).max(1);
        Some((shrink(self.width), shrink(self.height)))
    }

    /// Number of levels in a full mip chain for a `width` x `height` texture.
    pub fn max_mip_levels(width: u32, height: u32) -> u32 {
        (u32::BITS - width.max(height).leading_zeros()).max(1)
    }

    /// Total bytes across every mip level.
    pub fn byte_size(&self) -> u64 {
        (0..self.mip_level_count)
            .filter_map(|level| self.mip_size(level))
            .map(|(w, h)| w as u64 * h as u64 * self.format.bytes_per_pixel() as u64)
            .sum()
    }
}

/// A sub-rectangle of one mip level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureRegion {
    /// Target mip level.
    pub mip_level: u32,
    /// Left edge in texels.
    pub x: u32,
    /// Top edge in texels.
    pub y: u32,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl TextureRegion {
    /// The whole of mip level 0 for a `width` x `height` texture.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            mip_level: 0,
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Number of texels covered.
    pub const fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}
