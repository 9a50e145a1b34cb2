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

//! Semantic vertex descriptions (application side) and compiled vertex
//! layouts (backend side).

use std::sync::Arc;

/// The meaning of a vertex attribute.
///
/// The declaration order doubles as the shader location assigned by the
/// layout translator, so built-in programs can rely on fixed locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexSemantic {
    /// Object-space position. Required in every non-empty layout.
    Position,
    /// Surface normal.
    Normal,
    /// Surface tangent.
    Tangent,
    /// Per-vertex color.
    Color,
    /// Primary texture coordinates.
    TexCoord0,
    /// Secondary texture coordinates.
    TexCoord1,
    /// Light-map / glyph atlas coordinates.
    TexCoord2,
}

impl VertexSemantic {
    /// The shader location this semantic is bound to.
    pub const fn shader_location(self) -> u32 {
        self as u32
    }
}

/// Scalar component type of an application vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit IEEE float.
    Float32,
    /// 16-bit IEEE float.
    Float16,
    /// Signed byte.
    Int8,
    /// Unsigned byte.
    UInt8,
    /// Signed short.
    Int16,
    /// Unsigned short.
    UInt16,
    /// Signed int.
    Int32,
    /// Unsigned int.
    UInt32,
    /// A source API type code with no known mapping.
    Other(u32),
}

impl ComponentType {
    /// Size in bytes of one component as stored in the source vertex data.
    ///
    /// Unknown types are assumed to be four bytes wide, matching the
    /// `Float32` fallback format they are translated to.
    pub const fn size(self) -> u32 {
        match self {
            ComponentType::Int8 | ComponentType::UInt8 => 1,
            ComponentType::Float16 | ComponentType::Int16 | ComponentType::UInt16 => 2,
            ComponentType::Float32
            | ComponentType::Int32
            | ComponentType::UInt32
            | ComponentType::Other(_) => 4,
        }
    }
}

/// One attribute of an application vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDescriptor {
    /// What the attribute means.
    pub semantic: VertexSemantic,
    /// Number of components (1 to 4).
    pub component_count: u8,
    /// Scalar type of each component.
    pub component_type: ComponentType,
    /// Integer data is normalized to `[0, 1]` or `[-1, 1]` when read.
    pub normalized: bool,
}

impl VertexAttributeDescriptor {
    /// Shorthand constructor.
    pub const fn new(
        semantic: VertexSemantic,
        component_count: u8,
        component_type: ComponentType,
        normalized: bool,
    ) -> Self {
        Self {
            semantic,
            component_count,
            component_type,
            normalized,
        }
    }

    /// Size in bytes of the attribute in the source vertex data.
    pub const fn byte_size(&self) -> u32 {
        self.component_count as u32 * self.component_type.size()
    }
}

/// An ordered list of attributes describing one interleaved vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    /// Attributes in memory order.
    pub attributes: Vec<VertexAttributeDescriptor>,
}

impl VertexLayout {
    /// Builds a layout from attributes given in memory order.
    pub fn new(attributes: impl Into<Vec<VertexAttributeDescriptor>>) -> Self {
        Self {
            attributes: attributes.into(),
        }
    }

    /// `true` if any attribute carries `semantic`.
    pub fn has(&self, semantic: VertexSemantic) -> bool {
        self.attributes.iter().any(|a| a.semantic == semantic)
    }

    /// Canonical structural signature used as the layout cache key.
    pub fn signature(&self) -> LayoutSignature {
        LayoutSignature(self.attributes.clone())
    }

    /// Byte stride of one source vertex.
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.byte_size()).sum()
    }
}

/// The ordered tuple of every attribute field of a [`VertexLayout`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutSignature(pub Vec<VertexAttributeDescriptor>);

/// Attribute formats a backend vertex fetch stage understands.
///
/// Only formats a shader reads as floating point are listed; integer source
/// data is converted while packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x2,
    /// Four 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x4,
    /// Two 8-bit signed integer components normalized to `[-1.0, 1.0]`.
    Snorm8x2,
    /// Four 8-bit signed integer components normalized to `[-1.0, 1.0]`.
    Snorm8x4,
    /// Two 16-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm16x2,
    /// Four 16-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm16x4,
    /// Two 16-bit signed integer components normalized to `[-1.0, 1.0]`.
    Snorm16x2,
    /// Four 16-bit signed integer components normalized to `[-1.0, 1.0]`.
    Snorm16x4,
    /// Two 16-bit float components.
    Float16x2,
    /// Four 16-bit float components.
    Float16x4,
    /// One 32-bit float component.
    Float32,
    /// Two 32-bit float components.
    Float32x2,
    /// Three 32-bit float components.
    Float32x3,
    /// Four 32-bit float components.
    Float32x4,
}

impl VertexFormat {
    /// Returns the size in bytes of this vertex format.
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Unorm8x2 | VertexFormat::Snorm8x2 => 2,
            VertexFormat::Unorm8x4
            | VertexFormat::Snorm8x4
            | VertexFormat::Unorm16x2
            | VertexFormat::Snorm16x2
            | VertexFormat::Float16x2
            | VertexFormat::Float32 => 4,
            VertexFormat::Unorm16x4
            | VertexFormat::Snorm16x4
            | VertexFormat::Float16x4
            | VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }

    /// Number of components the shader sees.
    pub fn components(&self) -> u32 {
        match self {
            VertexFormat::Float32 => 1,
            VertexFormat::Unorm8x2
            | VertexFormat::Snorm8x2
            | VertexFormat::Unorm16x2
            | VertexFormat::Snorm16x2
            | VertexFormat::Float16x2
            | VertexFormat::Float32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Unorm8x4
            | VertexFormat::Snorm8x4
            | VertexFormat::Unorm16x4
            | VertexFormat::Snorm16x4
            | VertexFormat::Float16x4
            | VertexFormat::Float32x4 => 4,
        }
    }
}

/// How source bytes of one attribute become native bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeConversion {
    /// Bytes are copied unchanged.
    Copy,
    /// Bytes are copied and the remainder of the native slot is zeroed.
    Pad,
    /// Integer components are converted to 32-bit floats.
    IntToFloat,
}

/// One attribute of a compiled layout, ready for a backend pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeVertexAttribute {
    /// The input location of this attribute in the vertex shader.
    pub shader_location: u32,
    /// The format the backend reads.
    pub format: VertexFormat,
    /// Byte offset from the start of a native vertex.
    pub offset: u32,
    /// The application attribute this one was compiled from.
    pub source: VertexAttributeDescriptor,
    /// Byte offset from the start of a source vertex.
    pub source_offset: u32,
    /// How the source bytes are transformed.
    pub conversion: AttributeConversion,
}

/// A backend vertex buffer layout built from a [`VertexLayout`].
///
/// Instances are shared through [`CompiledLayoutRef`] and live for the whole
/// backend session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledLayout {
    /// Structural signature of the source layout.
    pub signature: LayoutSignature,
    /// Byte distance between consecutive native vertices.
    pub array_stride: u32,
    /// Byte distance between consecutive source vertices.
    pub source_stride: u32,
    /// Attributes in source order.
    pub attributes: Vec<NativeVertexAttribute>,
}

impl CompiledLayout {
    /// Returns the attribute carrying `semantic`, if present.
    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&NativeVertexAttribute> {
        self.attributes.iter().find(|a| a.source.semantic == semantic)
    }

    /// `true` when source bytes can be uploaded without repacking.
    pub fn is_passthrough(&self) -> bool {
        self.array_stride == self.source_stride
            && self
                .attributes
                .iter()
                .all(|a| a.conversion == AttributeConversion::Copy && a.offset == a.source_offset)
    }
}

/// Shared handle to a cached [`CompiledLayout`].
pub type CompiledLayoutRef = Arc<CompiledLayout>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_follows_source_component_sizes() {
        let layout = VertexLayout::new(vec![
            VertexAttributeDescriptor::new(VertexSemantic::Position, 3, ComponentType::Float32, false),
            VertexAttributeDescriptor::new(VertexSemantic::Color, 4, ComponentType::UInt8, true),
            VertexAttributeDescriptor::new(VertexSemantic::TexCoord0, 2, ComponentType::Float32, false),
        ]);
        assert_eq!(layout.stride(), 12 + 4 + 8);
        assert!(layout.has(VertexSemantic::Color));
        assert!(!layout.has(VertexSemantic::Normal));
    }

    #[test]
    fn test_signature_is_order_sensitive() {
        let a = VertexAttributeDescriptor::new(VertexSemantic::Position, 3, ComponentType::Float32, false);
        let b = VertexAttributeDescriptor::new(VertexSemantic::TexCoord0, 2, ComponentType::Float32, false);
        assert_ne!(
            VertexLayout::new(vec![a, b]).signature(),
            VertexLayout::new(vec![b, a]).signature()
        );
    }

    #[test]
    fn test_semantic_locations_are_stable() {
        assert_eq!(VertexSemantic::Position.shader_location(), 0);
        assert_eq!(VertexSemantic::Color.shader_location(), 3);
        assert_eq!(VertexSemantic::TexCoord2.shader_location(), 6);
    }
}
