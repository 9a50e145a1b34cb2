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

//! Conversions from veil's backend-agnostic types to their `wgpu` counterparts.

use veil_core::{
    BlendFactor, ClearValues, ColorMask, CompareFunction, CullFace, IndexFormat,
    PrimitiveTopology, TextureFormat, VertexFormat,
};

/// A local extension trait to convert veil types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Formats ---

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TextureFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            TextureFormat::Depth16Unorm => wgpu::TextureFormat::Depth16Unorm,
            TextureFormat::Depth24Plus => wgpu::TextureFormat::Depth24Plus,
            TextureFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
            TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Unorm8x2 => wgpu::VertexFormat::Unorm8x2,
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
            VertexFormat::Snorm8x2 => wgpu::VertexFormat::Snorm8x2,
            VertexFormat::Snorm8x4 => wgpu::VertexFormat::Snorm8x4,
            VertexFormat::Unorm16x2 => wgpu::VertexFormat::Unorm16x2,
            VertexFormat::Unorm16x4 => wgpu::VertexFormat::Unorm16x4,
            VertexFormat::Snorm16x2 => wgpu::VertexFormat::Snorm16x2,
            VertexFormat::Snorm16x4 => wgpu::VertexFormat::Snorm16x4,
            VertexFormat::Float16x2 => wgpu::VertexFormat::Float16x2,
            VertexFormat::Float16x4 => wgpu::VertexFormat::Float16x4,
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<wgpu::CompareFunction> for CompareFunction {
    fn into_wgpu(self) -> wgpu::CompareFunction {
        match self {
            CompareFunction::Never => wgpu::CompareFunction::Never,
            CompareFunction::Less => wgpu::CompareFunction::Less,
            CompareFunction::Equal => wgpu::CompareFunction::Equal,
            CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
            CompareFunction::Greater => wgpu::CompareFunction::Greater,
            CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
            CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
            CompareFunction::Always => wgpu::CompareFunction::Always,
        }
    }
}

impl IntoWgpu<wgpu::BlendFactor> for BlendFactor {
    fn into_wgpu(self) -> wgpu::BlendFactor {
        match self {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::Src => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrc => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::Dst => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDst => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
            BlendFactor::SrcAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
            BlendFactor::Constant => wgpu::BlendFactor::Constant,
            BlendFactor::OneMinusConstant => wgpu::BlendFactor::OneMinusConstant,
        }
    }
}

/// `FrontAndBack` has no `wgpu` face; the caller drops such triangle draws instead.
impl IntoWgpu<Option<wgpu::Face>> for CullFace {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullFace::Front => Some(wgpu::Face::Front),
            CullFace::Back => Some(wgpu::Face::Back),
            CullFace::FrontAndBack => None,
        }
    }
}

impl IntoWgpu<wgpu::ColorWrites> for ColorMask {
    fn into_wgpu(self) -> wgpu::ColorWrites {
        let mut writes = wgpu::ColorWrites::empty();
        if self.contains(ColorMask::R) {
            writes |= wgpu::ColorWrites::RED;
        }
        if self.contains(ColorMask::G) {
            writes |= wgpu::ColorWrites::GREEN;
        }
        if self.contains(ColorMask::B) {
            writes |= wgpu::ColorWrites::BLUE;
        }
        if self.contains(ColorMask::A) {
            writes |= wgpu::ColorWrites::ALPHA;
        }
        writes
    }
}

impl IntoWgpu<wgpu::Color> for ClearValues {
    fn into_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.color;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_format_conversion() {
        assert_eq!(
            wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Rgba8UnormSrgb.into_wgpu()
        );
        assert_eq!(
            wgpu::TextureFormat::Depth24PlusStencil8,
            TextureFormat::Depth24PlusStencil8.into_wgpu()
        );
        assert_eq!(wgpu::TextureFormat::R8Unorm, TextureFormat::R8Unorm.into_wgpu());
    }

    #[test]
    fn test_vertex_format_conversion() {
        assert_eq!(wgpu::VertexFormat::Float32x3, VertexFormat::Float32x3.into_wgpu());
        assert_eq!(wgpu::VertexFormat::Unorm8x4, VertexFormat::Unorm8x4.into_wgpu());
        assert_eq!(wgpu::VertexFormat::Snorm16x2, VertexFormat::Snorm16x2.into_wgpu());
    }

    #[test]
    fn test_vertex_format_sizes_agree_with_wgpu() {
        for format in [
            VertexFormat::Unorm8x2,
            VertexFormat::Snorm8x4,
            VertexFormat::Unorm16x4,
            VertexFormat::Float16x2,
            VertexFormat::Float32,
            VertexFormat::Float32x3,
            VertexFormat::Float32x4,
        ] {
            let native: wgpu::VertexFormat = format.into_wgpu();
            assert_eq!(native.size(), format.size() as u64, "{format:?}");
        }
    }

    #[test]
    fn test_index_format_conversion() {
        assert_eq!(wgpu::IndexFormat::Uint16, IndexFormat::Uint16.into_wgpu());
        assert_eq!(wgpu::IndexFormat::Uint32, IndexFormat::Uint32.into_wgpu());
    }

    #[test]
    fn test_primitive_topology_conversion() {
        assert_eq!(
            wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::PointList.into_wgpu()
        );
        assert_eq!(
            wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveTopology::TriangleStrip.into_wgpu()
        );
    }

    #[test]
    fn test_compare_function_conversion() {
        assert_eq!(wgpu::CompareFunction::Less, CompareFunction::Less.into_wgpu());
        assert_eq!(
            wgpu::CompareFunction::GreaterEqual,
            CompareFunction::GreaterEqual.into_wgpu()
        );
    }

    #[test]
    fn test_blend_factor_conversion() {
        assert_eq!(wgpu::BlendFactor::One, BlendFactor::One.into_wgpu());
        assert_eq!(
            wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::OneMinusSrcAlpha.into_wgpu()
        );
    }

    #[test]
    fn test_cull_face_conversion() {
        let front: Option<wgpu::Face> = CullFace::Front.into_wgpu();
        assert_eq!(Some(wgpu::Face::Front), front);
        let both: Option<wgpu::Face> = CullFace::FrontAndBack.into_wgpu();
        assert_eq!(None, both);
    }

    #[test]
    fn test_color_mask_conversion() {
        let writes: wgpu::ColorWrites = (ColorMask::R | ColorMask::A).into_wgpu();
        assert_eq!(writes, wgpu::ColorWrites::RED | wgpu::ColorWrites::ALPHA);
        let all: wgpu::ColorWrites = ColorMask::ALL.into_wgpu();
        assert_eq!(all, wgpu::ColorWrites::ALL);
    }

    #[test]
    fn test_clear_color_conversion() {
        let color: wgpu::Color = ClearValues {
            color: [0.25, 0.5, 1.0, 0.0],
            ..ClearValues::default()
        }
        .into_wgpu();
        assert_eq!(
            color,
            wgpu::Color {
                r: 0.25,
                g: 0.5,
                b: 1.0,
                a: 0.0
            }
        );
    }
}
