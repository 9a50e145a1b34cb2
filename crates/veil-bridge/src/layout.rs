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

//! Vertex layout translation.
//!
//! Application layouts are compiled into backend layouts through a fixed
//! translation table and cached by structural signature for the whole
//! backend session. Every input has a defined output: attributes outside the
//! native format set are padded, converted to floats, or read as raw floats.

use bytemuck::pod_read_unaligned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use veil_core::{
    AttributeConversion, CompiledLayout, CompiledLayoutRef, ComponentType, LayoutSignature,
    NativeVertexAttribute, VertexAttributeDescriptor, VertexFormat, VertexLayout,
};

/// Locations past the last semantic, used for repeated semantics.
const OVERFLOW_LOCATION_BASE: u32 = 7;

/// The result of translating one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTranslation {
    /// Native format.
    pub format: VertexFormat,
    /// How source bytes are turned into native bytes.
    pub conversion: AttributeConversion,
    /// `true` when the table had no exact entry and used its default.
    pub fallback: bool,
}

fn float32_format(count: u8) -> VertexFormat {
    match count {
        1 => VertexFormat::Float32,
        2 => VertexFormat::Float32x2,
        3 => VertexFormat::Float32x3,
        _ => VertexFormat::Float32x4,
    }
}

/// Maps an application attribute to its native format.
///
/// | source                              | native                     |
/// |-------------------------------------|----------------------------|
/// | `Float32` x N                       | `Float32xN`                |
/// | `Float16` x 2/4                     | `Float16x2/4`              |
/// | `Float16` x 1/3                     | `Float16x2/4`, padded      |
/// | normalized 8/16-bit int x 2/4       | `Unorm/Snorm` x 2/4        |
/// | normalized 8/16-bit int x 1/3       | `Unorm/Snorm` x 2/4, padded|
/// | any other int                       | `Float32xN`, converted     |
/// | unknown type                        | `Float32xN`, raw bytes     |
///
/// Component counts outside `1..=4` are clamped and flagged as a fallback.
pub fn translate_attribute(attr: &VertexAttributeDescriptor) -> AttributeTranslation {
    let count = attr.component_count.clamp(1, 4);
    let count_fallback = count != attr.component_count;
    let wide = count > 2;
    let padded = count == 1 || count == 3;

    let (format, conversion, fallback) = match (attr.component_type, attr.normalized) {
        (ComponentType::Float32, _) => (float32_format(count), AttributeConversion::Copy, false),
        (ComponentType::Float16, _) => (
            if wide { VertexFormat::Float16x4 } else { VertexFormat::Float16x2 },
            if padded { AttributeConversion::Pad } else { AttributeConversion::Copy },
            padded,
        ),
        (ComponentType::UInt8, true) => (
            if wide { VertexFormat::Unorm8x4 } else { VertexFormat::Unorm8x2 },
            if padded { AttributeConversion::Pad } else { AttributeConversion::Copy },
            padded,
        ),
        (ComponentType::Int8, true) => (
            if wide { VertexFormat::Snorm8x4 } else { VertexFormat::Snorm8x2 },
            if padded { AttributeConversion::Pad } else { AttributeConversion::Copy },
            padded,
        ),
        (ComponentType::UInt16, true) => (
            if wide { VertexFormat::Unorm16x4 } else { VertexFormat::Unorm16x2 },
            if padded { AttributeConversion::Pad } else { AttributeConversion::Copy },
            padded,
        ),
        (ComponentType::Int16, true) => (
            if wide { VertexFormat::Snorm16x4 } else { VertexFormat::Snorm16x2 },
            if padded { AttributeConversion::Pad } else { AttributeConversion::Copy },
            padded,
        ),
        (
            ComponentType::UInt8
            | ComponentType::Int8
            | ComponentType::UInt16
            | ComponentType::Int16
            | ComponentType::UInt32
            | ComponentType::Int32,
            _,
        ) => (float32_format(count), AttributeConversion::IntToFloat, false),
        (ComponentType::Other(_), _) => (float32_format(count), AttributeConversion::Copy, true),
    };

    AttributeTranslation {
        format,
        conversion,
        fallback: fallback || count_fallback,
    }
}

const fn align4(value: u32) -> u32 {
    (value + 3) & !3
}

/// Hit/miss counters of the layout cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutCacheStats {
    /// Compiles answered from the cache.
    pub hits: u64,
    /// Compiles that built a new layout.
    pub misses: u64,
}

/// Compiles and caches vertex layouts.
#[derive(Debug, Default)]
pub struct LayoutTranslator {
    cache: HashMap<LayoutSignature, CompiledLayoutRef>,
    stats: LayoutCacheStats,
}

impl LayoutTranslator {
    /// Creates an empty translator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the compiled layout for `layout`, building it on first use.
    ///
    /// Layouts with identical attribute tuples in identical order share one
    /// [`CompiledLayout`] instance.
    pub fn compile(&mut self, layout: &VertexLayout) -> CompiledLayoutRef {
        let signature = layout.signature();
        if let Some(compiled) = self.cache.get(&signature) {
            self.stats.hits += 1;
            return Arc::clone(compiled);
        }

        self.stats.misses += 1;
        let compiled = Arc::new(Self::build(signature.clone()));
        log::debug!(
            "LayoutTranslator: compiled layout with {} attributes (stride {} -> {})",
            compiled.attributes.len(),
            compiled.source_stride,
            compiled.array_stride
        );
        self.cache.insert(signature, Arc::clone(&compiled));
        compiled
    }

    fn build(signature: LayoutSignature) -> CompiledLayout {
        let mut attributes = Vec::with_capacity(signature.0.len());
        let mut used_locations = 0u32;
        let mut source_offset = 0u32;
        let mut offset = 0u32;

        for (index, attr) in signature.0.iter().enumerate() {
            let translation = translate_attribute(attr);
            if translation.fallback {
                log::debug!(
                    "LayoutTranslator: no exact format for {:?} x{} {:?} (normalized: {}), using {:?}",
                    attr.semantic,
                    attr.component_count,
                    attr.component_type,
                    attr.normalized,
                    translation.format
                );
            }

            let mut shader_location = attr.semantic.shader_location();
            if used_locations & (1 << shader_location) != 0 {
                shader_location = OVERFLOW_LOCATION_BASE + index as u32;
                log::debug!(
                    "LayoutTranslator: repeated {:?} moved to location {shader_location}",
                    attr.semantic
                );
            } else {
                used_locations |= 1 << shader_location;
            }

            attributes.push(NativeVertexAttribute {
                shader_location,
                format: translation.format,
                offset,
                source: *attr,
                source_offset,
                conversion: translation.conversion,
            });

            source_offset += attr.byte_size();
            offset = align4(offset + translation.format.size());
        }

        CompiledLayout {
            signature,
            array_stride: offset,
            source_stride: source_offset,
            attributes,
        }
    }

    /// Number of distinct layouts compiled this session.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// `true` when nothing has been compiled.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache counters.
    pub fn stats(&self) -> LayoutCacheStats {
        self.stats
    }

    /// Drops every cached layout at the end of a backend session.
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Number of whole source vertices in `source`.
pub fn vertex_count(layout: &CompiledLayout, source: &[u8]) -> u32 {
    if layout.source_stride == 0 {
        return 0;
    }
    (source.len() / layout.source_stride as usize) as u32
}

/// Converts interleaved source vertices into the native layout.
///
/// Borrows `source` unchanged when the layouts coincide. A trailing partial
/// vertex is dropped.
pub fn pack_vertices<'a>(layout: &CompiledLayout, source: &'a [u8]) -> Cow<'a, [u8]> {
    let count = vertex_count(layout, source) as usize;
    let source_stride = layout.source_stride as usize;
    if layout.is_passthrough() {
        return Cow::Borrowed(&source[..count * source_stride]);
    }

    let stride = layout.array_stride as usize;
    let mut packed = vec![0u8; count * stride];
    for v in 0..count {
        let src_vertex = &source[v * source_stride..(v + 1) * source_stride];
        let dst_vertex = &mut packed[v * stride..(v + 1) * stride];
        for attr in &layout.attributes {
            let src_start = attr.source_offset as usize;
            let src = &src_vertex[src_start..src_start + attr.source.byte_size() as usize];
            let dst_start = attr.offset as usize;
            let dst = &mut dst_vertex[dst_start..dst_start + attr.format.size() as usize];
            let copied = src.len().min(dst.len());
            match attr.conversion {
                AttributeConversion::Copy => dst[..copied].copy_from_slice(&src[..copied]),
                AttributeConversion::Pad => {
                    dst[..copied].copy_from_slice(&src[..copied]);
                    pad_alpha(attr, dst);
                }
                AttributeConversion::IntToFloat => convert_ints(&attr.source, src, dst),
            }
        }
    }
    Cow::Owned(packed)
}

/// A padded fourth component reads as one, like an unspecified `w`.
fn pad_alpha(attr: &NativeVertexAttribute, dst: &mut [u8]) {
    if attr.format.components() != 4 || attr.source.component_count >= 4 {
        return;
    }
    let width = (attr.format.size() / 4) as usize;
    let one: &[u8] = match attr.format {
        VertexFormat::Unorm8x4 => &[0xFF],
        VertexFormat::Snorm8x4 => &[0x7F],
        VertexFormat::Unorm16x4 => &[0xFF, 0xFF],
        VertexFormat::Snorm16x4 => &[0xFF, 0x7F],
        VertexFormat::Float16x4 => &[0x00, 0x3C],
        _ => return,
    };
    dst[3 * width..4 * width].copy_from_slice(one);
}

fn convert_ints(source: &VertexAttributeDescriptor, src: &[u8], dst: &mut [u8]) {
    let width = source.component_type.size() as usize;
    let slots = dst.len() / 4;
    for (i, chunk) in src.chunks_exact(width).take(slots).enumerate() {
        let value = match source.component_type {
            ComponentType::UInt8 => normalize_unsigned(chunk[0] as f64, u8::MAX as f64, source.normalized),
            ComponentType::Int8 => normalize_signed(chunk[0] as i8 as f64, i8::MAX as f64, source.normalized),
            ComponentType::UInt16 => {
                normalize_unsigned(pod_read_unaligned::<u16>(chunk) as f64, u16::MAX as f64, source.normalized)
            }
            ComponentType::Int16 => {
                normalize_signed(pod_read_unaligned::<i16>(chunk) as f64, i16::MAX as f64, source.normalized)
            }
            ComponentType::UInt32 => {
                normalize_unsigned(pod_read_unaligned::<u32>(chunk) as f64, u32::MAX as f64, source.normalized)
            }
            ComponentType::Int32 => {
                normalize_signed(pod_read_unaligned::<i32>(chunk) as f64, i32::MAX as f64, source.normalized)
            }
            ComponentType::Float32 | ComponentType::Float16 | ComponentType::Other(_) => 0.0,
        };
        dst[i * 4..i * 4 + 4].copy_from_slice(bytemuck::bytes_of(&value));
    }
}

fn normalize_unsigned(value: f64, max: f64, normalized: bool) -> f32 {
    if normalized {
        (value / max) as f32
    } else {
        value as f32
    }
}

fn normalize_signed(value: f64, max: f64, normalized: bool) -> f32 {
    if normalized {
        (value / max).max(-1.0) as f32
    } else {
        value as f32
    }
}
