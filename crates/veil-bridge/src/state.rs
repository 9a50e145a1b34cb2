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

//! Render state tracking with per-field change detection.

use crate::BackendRef;
use std::collections::HashMap;
use veil_core::{
    ClearValues, GraphicsBackend, StateField, StateSnapshot, StateToken, ViewId,
};

/// Counters of forwarded and suppressed state writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateStats {
    /// Fields sent to the backend.
    pub forwarded: u64,
    /// Fields that matched what the backend already had.
    pub suppressed: u64,
}

/// Holds the application's render state and forwards only changed fields.
#[derive(Debug)]
pub struct StateTracker {
    current: StateSnapshot,
    /// What the backend was last told. `None` after a device (re)start.
    forwarded: Option<StateSnapshot>,
    default_clear: ClearValues,
    clear: HashMap<ViewId, ClearValues>,
    forwarded_clear: HashMap<ViewId, ClearValues>,
    stats: StateStats,
}

impl StateTracker {
    /// Creates a tracker holding the default snapshot.
    pub fn new(default_clear: ClearValues) -> Self {
        Self {
            current: StateSnapshot::default(),
            forwarded: None,
            default_clear,
            clear: HashMap::new(),
            forwarded_clear: HashMap::new(),
            stats: StateStats::default(),
        }
    }

    /// Makes `snapshot` current and forwards the fields that changed.
    ///
    /// Returns the token for the full current snapshot.
    pub fn apply(&mut self, backend: BackendRef<'_>, snapshot: StateSnapshot) -> StateToken {
        self.current = snapshot;
        if let Some(backend) = backend {
            self.flush(backend);
        }
        self.current()
    }

    /// Changes one field of the current snapshot.
    pub fn set(&mut self, backend: BackendRef<'_>, field: StateField) -> StateToken {
        let next = self.current.with(field);
        self.apply(backend, next)
    }

    /// Token for the current snapshot.
    pub fn current(&self) -> StateToken {
        StateToken::from_snapshot(&self.current)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &StateSnapshot {
        &self.current
    }

    /// Forwards every field that differs from what the backend last saw.
    pub fn flush(&mut self, backend: &mut dyn GraphicsBackend) {
        let next = self.current.fields();
        match self.forwarded.as_ref().map(StateSnapshot::fields) {
            Some(previous) => {
                for (old, new) in previous.iter().zip(next.iter()) {
                    if old == new {
                        self.stats.suppressed += 1;
                    } else {
                        log::trace!("StateTracker: forwarding {new:?}");
                        backend.set_state(*new);
                        self.stats.forwarded += 1;
                    }
                }
            }
            None => {
                for field in next {
                    backend.set_state(field);
                }
                self.stats.forwarded += next.len() as u64;
            }
        }
        self.forwarded = Some(self.current);

        for (view, values) in &self.clear {
            if self.forwarded_clear.get(view) != Some(values) {
                backend.set_clear(*view, *values);
                self.forwarded_clear.insert(*view, *values);
            }
        }
    }

    /// Sets the clear values of `view`.
    pub fn set_clear(&mut self, backend: BackendRef<'_>, view: ViewId, values: ClearValues) {
        self.clear.insert(view, values);
        if let Some(backend) = backend {
            if self.forwarded_clear.get(&view) != Some(&values) {
                backend.set_clear(view, values);
                self.forwarded_clear.insert(view, values);
            }
        }
    }

    /// Clear values of `view`.
    pub fn clear_values(&self, view: ViewId) -> ClearValues {
        self.clear.get(&view).copied().unwrap_or(self.default_clear)
    }

    /// Forgets what the backend was told so the next flush resends everything.
    pub fn invalidate(&mut self) {
        self.forwarded = None;
        self.forwarded_clear.clear();
        self.clear.entry(ViewId::default()).or_insert(self.default_clear);
    }

    /// Counters since the last [`StateTracker::reset_stats`].
    pub fn stats(&self) -> StateStats {
        self.stats
    }

    /// Zeroes the counters.
    pub fn reset_stats(&mut self) {
        self.stats = StateStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use veil_core::{BlendFactor, CompareFunction, Rect};

    #[test]
    fn test_first_flush_forwards_every_field() {
        let mut backend = MockBackend::default();
        let mut tracker = StateTracker::new(ClearValues::default());
        tracker.invalidate();
        tracker.apply(Some(&mut backend), StateSnapshot::default());
        assert_eq!(backend.state_calls.len(), StateSnapshot::FIELD_COUNT);
        assert_eq!(backend.clears.len(), 1);
    }

    #[test]
    fn test_reasserting_unchanged_state_forwards_nothing() {
        let mut backend = MockBackend::default();
        let mut tracker = StateTracker::new(ClearValues::default());
        let snapshot = StateSnapshot::default().with(StateField::DepthTest(true));
        tracker.apply(Some(&mut backend), snapshot);
        let before = backend.state_calls.len();

        for _ in 0..100 {
            tracker.apply(Some(&mut backend), snapshot);
        }
        assert_eq!(backend.state_calls.len(), before);
        assert_eq!(tracker.stats().suppressed, 100 * StateSnapshot::FIELD_COUNT as u64);
    }

    #[test]
    fn test_only_changed_fields_are_forwarded() {
        let mut backend = MockBackend::default();
        let mut tracker = StateTracker::new(ClearValues::default());
        tracker.apply(Some(&mut backend), StateSnapshot::default());
        backend.state_calls.clear();

        let next = StateSnapshot::default()
            .with(StateField::DepthFunc(CompareFunction::LessEqual))
            .with(StateField::Viewport(Rect::new(0, 0, 800, 600)));
        tracker.apply(Some(&mut backend), next);
        assert_eq!(
            backend.state_calls,
            vec![
                StateField::DepthFunc(CompareFunction::LessEqual),
                StateField::Viewport(Rect::new(0, 0, 800, 600)),
            ]
        );
    }

    #[test]
    fn test_token_reflects_full_state_not_delta() {
        let mut backend = MockBackend::default();
        let mut tracker = StateTracker::new(ClearValues::default());
        tracker.set(Some(&mut backend), StateField::Blend(true));
        tracker.set(Some(&mut backend), StateField::BlendSrc(BlendFactor::SrcAlpha));
        let token = tracker.set(Some(&mut backend), StateField::BlendDst(BlendFactor::OneMinusSrcAlpha));

        let expected = StateSnapshot {
            blend_enabled: true,
            blend_src: BlendFactor::SrcAlpha,
            blend_dst: BlendFactor::OneMinusSrcAlpha,
            ..StateSnapshot::default()
        };
        assert_eq!(token, StateToken::from_snapshot(&expected));
        assert_eq!(token.snapshot(), expected);
    }

    #[test]
    fn test_state_accumulates_without_backend() {
        let mut tracker = StateTracker::new(ClearValues::default());
        tracker.set(None, StateField::Cull(true));
        tracker.set(None, StateField::DepthWrite(false));

        let mut backend = MockBackend::default();
        tracker.flush(&mut backend);
        assert!(backend.state_calls.contains(&StateField::Cull(true)));
        assert!(backend.state_calls.contains(&StateField::DepthWrite(false)));
    }

    #[test]
    fn test_clear_values_forwarded_once() {
        let mut backend = MockBackend::default();
        let mut tracker = StateTracker::new(ClearValues::default());
        let values = ClearValues {
            color: [0.2, 0.3, 0.4, 1.0],
            ..ClearValues::default()
        };
        tracker.set_clear(Some(&mut backend), ViewId(1), values);
        tracker.set_clear(Some(&mut backend), ViewId(1), values);
        assert_eq!(backend.clears.len(), 1);
        assert_eq!(tracker.clear_values(ViewId(1)), values);
        assert_eq!(tracker.clear_values(ViewId(9)), ClearValues::default());
    }
}
