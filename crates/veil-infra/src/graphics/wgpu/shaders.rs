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

//! WGSL generation for the built-in programs.
//!
//! A built-in program is compiled once per vertex layout it is drawn with:
//! the vertex input struct mirrors the layout's attributes, and the program
//! kind decides how vertex color and the bound texture are combined.
//!
//! Every module, built-in or caller supplied, shares one binding interface:
//!
//! | Group | Binding | Resource                                   |
//! |-------|---------|--------------------------------------------|
//! | 0     | 0       | `Transform` uniform (dynamic offset)       |
//! | 1     | 0       | `texture_2d<f32>` (white when none bound)  |
//! | 1     | 1       | filtering sampler                          |
//!
//! and the entry points `vs_main` / `fs_main`.

use std::fmt::Write;
use veil_core::{CompiledLayout, ProgramKind, VertexSemantic};

/// Vertex entry point of every program.
pub(crate) const VERTEX_ENTRY: &str = "vs_main";
/// Fragment entry point of every program.
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

const WGSL_SHARED: &str = r#"
struct Transform {
  mvp: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> transform: Transform;
@group(1) @binding(0) var tex0: texture_2d<f32>;
@group(1) @binding(1) var samp0: sampler;

struct VertexOut {
  @builtin(position) position: vec4<f32>,
  @location(0) color: vec4<f32>,
  @location(1) uv: vec2<f32>,
};

"#;

fn semantic_name(semantic: VertexSemantic) -> &'static str {
    match semantic {
        VertexSemantic::Position => "position",
        VertexSemantic::Normal => "normal",
        VertexSemantic::Tangent => "tangent",
        VertexSemantic::Color => "color",
        VertexSemantic::TexCoord0 => "uv0",
        VertexSemantic::TexCoord1 => "uv1",
        VertexSemantic::TexCoord2 => "uv2",
    }
}

/// Every backend vertex format is read as floats in WGSL; only the width varies.
fn wgsl_float_type(components: u32) -> &'static str {
    match components {
        1 => "f32",
        2 => "vec2<f32>",
        3 => "vec3<f32>",
        _ => "vec4<f32>",
    }
}

/// Widens `input.<name>` to a `vec4<f32>`, filling missing lanes with `fill` and `w`.
fn widen_to_vec4(name: &str, components: u32, fill: &str, w: &str) -> String {
    match components {
        1 => format!("vec4<f32>(input.{name}, {fill}, {fill}, {w})"),
        2 => format!("vec4<f32>(input.{name}, {fill}, {w})"),
        3 => format!("vec4<f32>(input.{name}, {w})"),
        _ => format!("input.{name}"),
    }
}

fn uses_vertex_color(kind: ProgramKind) -> bool {
    matches!(
        kind,
        ProgramKind::FlatColor | ProgramKind::TexturedColor | ProgramKind::Text | ProgramKind::General
    )
}

fn samples_texture(kind: ProgramKind) -> bool {
    matches!(
        kind,
        ProgramKind::Textured | ProgramKind::TexturedColor | ProgramKind::Text | ProgramKind::General
    )
}

/// Generates the WGSL module for `kind` drawn with `layout`.
///
/// Inputs the kind expects but the layout lacks fall back to constants
/// (white color, zero texture coordinates), so a built-in program can be
/// forced onto any layout that has a position.
pub(crate) fn builtin_wgsl(kind: ProgramKind, layout: &CompiledLayout) -> String {
    let mut wgsl = String::from(WGSL_SHARED);

    wgsl.push_str("struct VertexIn {\n");
    let mut declared = Vec::with_capacity(layout.attributes.len());
    for attribute in &layout.attributes {
        let semantic = attribute.source.semantic;
        // Repeated semantics sit at overflow locations and are declared but unused.
        let name = if declared.contains(&semantic) {
            format!("extra{}", attribute.shader_location)
        } else {
            declared.push(semantic);
            semantic_name(semantic).to_owned()
        };
        let _ = writeln!(
            wgsl,
            "  @location({}) {}: {},",
            attribute.shader_location,
            name,
            wgsl_float_type(attribute.format.components())
        );
    }
    wgsl.push_str("};\n\n");

    wgsl.push_str("@vertex\nfn vs_main(input: VertexIn) -> VertexOut {\n  var out: VertexOut;\n");
    match layout.attribute(VertexSemantic::Position) {
        Some(position) => {
            let expr = widen_to_vec4("position", position.format.components(), "0.0", "1.0");
            let _ = writeln!(wgsl, "  out.position = transform.mvp * {expr};");
        }
        None => wgsl.push_str("  out.position = vec4<f32>(0.0, 0.0, 0.0, 1.0);\n"),
    }
    match layout.attribute(VertexSemantic::Color) {
        Some(color) if uses_vertex_color(kind) => {
            let expr = widen_to_vec4("color", color.format.components(), "0.0", "1.0");
            let _ = writeln!(wgsl, "  out.color = {expr};");
        }
        _ => wgsl.push_str("  out.color = vec4<f32>(1.0, 1.0, 1.0, 1.0);\n"),
    }
    match layout.attribute(VertexSemantic::TexCoord0) {
        Some(uv) if samples_texture(kind) => {
            let expr = match uv.format.components() {
                1 => "vec2<f32>(input.uv0, 0.0)",
                2 => "input.uv0",
                _ => "input.uv0.xy",
            };
            let _ = writeln!(wgsl, "  out.uv = {expr};");
        }
        _ => wgsl.push_str("  out.uv = vec2<f32>(0.0, 0.0);\n"),
    }
    wgsl.push_str("  return out;\n}\n\n");

    wgsl.push_str("@fragment\nfn fs_main(input: VertexOut) -> @location(0) vec4<f32> {\n");
    let textured = samples_texture(kind) && layout.attribute(VertexSemantic::TexCoord0).is_some();
    match (kind, textured) {
        (ProgramKind::Text, true) => {
            // Glyph atlases carry coverage in alpha.
            wgsl.push_str("  let coverage = textureSample(tex0, samp0, input.uv).a;\n");
            wgsl.push_str("  return vec4<f32>(input.color.rgb, input.color.a * coverage);\n");
        }
        (_, true) => {
            wgsl.push_str("  return input.color * textureSample(tex0, samp0, input.uv);\n");
        }
        (_, false) => wgsl.push_str("  return input.color;\n"),
    }
    wgsl.push_str("}\n");
    wgsl
}
