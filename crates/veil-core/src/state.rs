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

//! Fixed-function render state as the application sees it, and its packed
//! [`StateToken`] encoding.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A comparison function used for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less than the existing value.
    #[default]
    Less,
    /// Passes if the new value is equal to the existing value.
    Equal,
    /// Passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// Passes if the new value is greater than the existing value.
    Greater,
    /// Passes if the new value is not equal to the existing value.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// Always passes.
    Always,
}

impl CompareFunction {
    const ALL: [CompareFunction; 8] = [
        CompareFunction::Never,
        CompareFunction::Less,
        CompareFunction::Equal,
        CompareFunction::LessEqual,
        CompareFunction::Greater,
        CompareFunction::NotEqual,
        CompareFunction::GreaterEqual,
        CompareFunction::Always,
    ];
}

/// A factor in the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0.0`
    Zero,
    /// `1.0`
    One,
    /// Source color.
    Src,
    /// `1.0 - source color`
    OneMinusSrc,
    /// Source alpha.
    SrcAlpha,
    /// `1.0 - source alpha`
    OneMinusSrcAlpha,
    /// Destination color.
    Dst,
    /// `1.0 - destination color`
    OneMinusDst,
    /// Destination alpha.
    DstAlpha,
    /// `1.0 - destination alpha`
    OneMinusDstAlpha,
    /// `min(source alpha, 1.0 - destination alpha)`
    SrcAlphaSaturated,
    /// Blend constant.
    Constant,
    /// `1.0 - blend constant`
    OneMinusConstant,
}

impl BlendFactor {
    const ALL: [BlendFactor; 13] = [
        BlendFactor::Zero,
        BlendFactor::One,
        BlendFactor::Src,
        BlendFactor::OneMinusSrc,
        BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::Dst,
        BlendFactor::OneMinusDst,
        BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha,
        BlendFactor::SrcAlphaSaturated,
        BlendFactor::Constant,
        BlendFactor::OneMinusConstant,
    ];
}

/// Which faces are culled when culling is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    /// Cull front-facing triangles.
    Front,
    /// Cull back-facing triangles.
    #[default]
    Back,
    /// Cull every triangle. Points and lines are still drawn.
    FrontAndBack,
}

impl CullFace {
    const ALL: [CullFace; 3] = [CullFace::Front, CullFace::Back, CullFace::FrontAndBack];
}

bitflags! {
    /// Per-channel color write enable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        /// Red channel.
        const R = 0b0001;
        /// Green channel.
        const G = 0b0010;
        /// Blue channel.
        const B = 0b0100;
        /// Alpha channel.
        const A = 0b1000;
        /// All channels.
        const ALL = 0b1111;
    }
}

impl ColorMask {
    /// Builds a mask from the four `(r, g, b, a)` booleans of a color-mask call.
    pub fn from_channels(channels: [bool; 4]) -> Self {
        let mut mask = ColorMask::empty();
        mask.set(ColorMask::R, channels[0]);
        mask.set(ColorMask::G, channels[1]);
        mask.set(ColorMask::B, channels[2]);
        mask.set(ColorMask::A, channels[3]);
        mask
    }
}

/// A pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Shorthand constructor.
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Scissor test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Scissor {
    /// Whether fragments outside `rect` are discarded.
    pub enabled: bool,
    /// The scissor rectangle.
    pub rect: Rect,
}

/// The complete fixed-function state the application has asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateSnapshot {
    /// Depth test enable.
    pub depth_test_enabled: bool,
    /// Depth comparison.
    pub depth_func: CompareFunction,
    /// Depth buffer writes.
    pub depth_write_enabled: bool,
    /// Blending enable.
    pub blend_enabled: bool,
    /// Source blend factor.
    pub blend_src: BlendFactor,
    /// Destination blend factor.
    pub blend_dst: BlendFactor,
    /// Face culling enable.
    pub cull_enabled: bool,
    /// Culled faces.
    pub cull_mode: CullFace,
    /// Channel write mask.
    pub color_mask: ColorMask,
    /// Viewport rectangle.
    pub viewport: Rect,
    /// Scissor test.
    pub scissor: Scissor,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            depth_test_enabled: false,
            depth_func: CompareFunction::Less,
            depth_write_enabled: true,
            blend_enabled: false,
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            cull_enabled: false,
            cull_mode: CullFace::Back,
            color_mask: ColorMask::ALL,
            viewport: Rect::default(),
            scissor: Scissor::default(),
        }
    }
}

/// One independently tracked field of a [`StateSnapshot`].
///
/// This is both the payload of a `StateChange` call and the unit the state
/// tracker forwards to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// Depth test enable.
    DepthTest(bool),
    /// Depth comparison.
    DepthFunc(CompareFunction),
    /// Depth buffer writes.
    DepthWrite(bool),
    /// Blending enable.
    Blend(bool),
    /// Source blend factor.
    BlendSrc(BlendFactor),
    /// Destination blend factor.
    BlendDst(BlendFactor),
    /// Face culling enable.
    Cull(bool),
    /// Culled faces.
    CullMode(CullFace),
    /// Channel write mask.
    ColorMask(ColorMask),
    /// Viewport rectangle.
    Viewport(Rect),
    /// Scissor test.
    Scissor(Scissor),
}

impl StateSnapshot {
    /// Number of fields in [`StateSnapshot::fields`].
    pub const FIELD_COUNT: usize = 11;

    /// Every field of the snapshot, in a fixed order.
    pub fn fields(&self) -> [StateField; Self::FIELD_COUNT] {
        [
            StateField::DepthTest(self.depth_test_enabled),
            StateField::DepthFunc(self.depth_func),
            StateField::DepthWrite(self.depth_write_enabled),
            StateField::Blend(self.blend_enabled),
            StateField::BlendSrc(self.blend_src),
            StateField::BlendDst(self.blend_dst),
            StateField::Cull(self.cull_enabled),
            StateField::CullMode(self.cull_mode),
            StateField::ColorMask(self.color_mask),
            StateField::Viewport(self.viewport),
            StateField::Scissor(self.scissor),
        ]
    }

    /// Returns a copy with `field` overwritten.
    #[must_use]
    pub fn with(mut self, field: StateField) -> Self {
        match field {
            StateField::DepthTest(v) => self.depth_test_enabled = v,
            StateField::DepthFunc(v) => self.depth_func = v,
            StateField::DepthWrite(v) => self.depth_write_enabled = v,
            StateField::Blend(v) => self.blend_enabled = v,
            StateField::BlendSrc(v) => self.blend_src = v,
            StateField::BlendDst(v) => self.blend_dst = v,
            StateField::Cull(v) => self.cull_enabled = v,
            StateField::CullMode(v) => self.cull_mode = v,
            StateField::ColorMask(v) => self.color_mask = v,
            StateField::Viewport(v) => self.viewport = v,
            StateField::Scissor(v) => self.scissor = v,
        }
        self
    }
}

// --- Packed encoding ---
//
//  bit  0      depth test
//  bits 1..4   depth func
//  bit  4      depth write
//  bit  5      blend
//  bits 6..10  blend src
//  bits 10..14 blend dst
//  bit  14     cull
//  bits 15..17 cull mode
//  bits 17..21 color mask
//  bit  21     scissor test
const DEPTH_TEST: u64 = 1 << 0;
const DEPTH_FUNC_SHIFT: u32 = 1;
const DEPTH_WRITE: u64 = 1 << 4;
const BLEND: u64 = 1 << 5;
const BLEND_SRC_SHIFT: u32 = 6;
const BLEND_DST_SHIFT: u32 = 10;
const CULL: u64 = 1 << 14;
const CULL_MODE_SHIFT: u32 = 15;
const COLOR_MASK_SHIFT: u32 = 17;
const SCISSOR: u64 = 1 << 21;

/// A packed, pure-function encoding of a full [`StateSnapshot`].
///
/// Every discrete field lives in `bits`; the viewport and scissor rectangles
/// travel alongside since they are dynamic state on most backends. Two equal
/// snapshots always produce equal tokens, and [`StateToken::snapshot`]
/// recovers the exact snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateToken {
    /// Packed discrete state.
    pub bits: u64,
    /// Viewport rectangle.
    pub viewport: Rect,
    /// Scissor rectangle (meaningful when the scissor bit is set).
    pub scissor_rect: Rect,
}

impl StateToken {
    /// Encodes a snapshot.
    pub fn from_snapshot(s: &StateSnapshot) -> Self {
        let mut bits = 0u64;
        if s.depth_test_enabled {
            bits |= DEPTH_TEST;
        }
        bits |= (s.depth_func as u64) << DEPTH_FUNC_SHIFT;
        if s.depth_write_enabled {
            bits |= DEPTH_WRITE;
        }
        if s.blend_enabled {
            bits |= BLEND;
        }
        bits |= (s.blend_src as u64) << BLEND_SRC_SHIFT;
        bits |= (s.blend_dst as u64) << BLEND_DST_SHIFT;
        if s.cull_enabled {
            bits |= CULL;
        }
        bits |= (s.cull_mode as u64) << CULL_MODE_SHIFT;
        bits |= (s.color_mask.bits() as u64) << COLOR_MASK_SHIFT;
        if s.scissor.enabled {
            bits |= SCISSOR;
        }
        Self {
            bits,
            viewport: s.viewport,
            scissor_rect: s.scissor.rect,
        }
    }

    /// Decodes the token back into the snapshot it was built from.
    pub fn snapshot(&self) -> StateSnapshot {
        let b = self.bits;
        StateSnapshot {
            depth_test_enabled: b & DEPTH_TEST != 0,
            depth_func: CompareFunction::ALL[((b >> DEPTH_FUNC_SHIFT) & 0x7) as usize],
            depth_write_enabled: b & DEPTH_WRITE != 0,
            blend_enabled: b & BLEND != 0,
            blend_src: decode_blend(b >> BLEND_SRC_SHIFT),
            blend_dst: decode_blend(b >> BLEND_DST_SHIFT),
            cull_enabled: b & CULL != 0,
            cull_mode: CullFace::ALL
                .get(((b >> CULL_MODE_SHIFT) & 0x3) as usize)
                .copied()
                .unwrap_or_default(),
            color_mask: ColorMask::from_bits_truncate(((b >> COLOR_MASK_SHIFT) & 0xF) as u8),
            viewport: self.viewport,
            scissor: Scissor {
                enabled: b & SCISSOR != 0,
                rect: self.scissor_rect,
            },
        }
    }

    /// The bits that select a backend pipeline (everything except the
    /// dynamic viewport and scissor state).
    pub fn pipeline_bits(&self) -> u64 {
        self.bits & !SCISSOR
    }
}

fn decode_blend(bits: u64) -> BlendFactor {
    BlendFactor::ALL
        .get((bits & 0xF) as usize)
        .copied()
        .unwrap_or(BlendFactor::One)
}

/// Values a view is cleared to at the start of its pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearValues {
    /// Linear RGBA clear color.
    pub color: [f32; 4],
    /// Depth clear value.
    pub depth: f32,
    /// Stencil clear value.
    pub stencil: u32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}
