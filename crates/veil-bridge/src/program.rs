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

//! Built-in program selection.

use crate::registry::{ResourceRegistry, ResourceSpec};
use crate::BackendRef;
use std::collections::HashMap;
use veil_core::{LogicalResourceId, ProgramKind, ShaderSource, VertexLayout, VertexSemantic};

const fn bit(semantic: VertexSemantic) -> u8 {
    1 << semantic as u8
}

const POSITION: u8 = bit(VertexSemantic::Position);
const COLOR: u8 = bit(VertexSemantic::Color);
const UV0: u8 = bit(VertexSemantic::TexCoord0);
const UV2: u8 = bit(VertexSemantic::TexCoord2);

/// Chooses the built-in program for a vertex layout.
///
/// The choice depends only on the set of semantics present, matched exactly:
///
/// | attributes                     | program         |
/// |--------------------------------|-----------------|
/// | position, color, uv0, uv2      | `Text`          |
/// | position, uv0, color           | `TexturedColor` |
/// | position, uv0                  | `Textured`      |
/// | position, color                | `FlatColor`     |
/// | position                       | `Minimal`       |
/// | anything else                  | `General`       |
pub fn select_program(layout: &VertexLayout) -> ProgramKind {
    let set = layout
        .attributes
        .iter()
        .fold(0u8, |set, attr| set | bit(attr.semantic));
    match set {
        s if s == POSITION | COLOR | UV0 | UV2 => ProgramKind::Text,
        s if s == POSITION | UV0 | COLOR => ProgramKind::TexturedColor,
        s if s == POSITION | UV0 => ProgramKind::Textured,
        s if s == POSITION | COLOR => ProgramKind::FlatColor,
        s if s == POSITION => ProgramKind::Minimal,
        _ => ProgramKind::General,
    }
}

/// Session cache of built-in programs, created on first use.
#[derive(Debug, Default)]
pub struct ProgramLibrary {
    programs: HashMap<ProgramKind, LogicalResourceId>,
}

impl ProgramLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the program for `kind`, registering it on first request.
    ///
    /// Returns the null id when the backend rejects the program.
    pub fn program(
        &mut self,
        registry: &mut ResourceRegistry,
        backend: BackendRef<'_>,
        kind: ProgramKind,
    ) -> LogicalResourceId {
        if let Some(id) = self.programs.get(&kind) {
            if registry.contains(*id) {
                return *id;
            }
        }
        let id = registry.create(backend, ResourceSpec::Shader(ShaderSource::Builtin(kind)));
        if id.is_valid() {
            log::debug!("ProgramLibrary: registered built-in {kind:?} as {id:?}");
            self.programs.insert(kind, id);
        }
        id
    }

    /// Forgets every program at the end of a session.
    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
