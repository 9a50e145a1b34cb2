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

//! Settings for the translation layer.

use crate::backend::InitStrategy;
use crate::error::BridgeError;
use crate::handle::ViewId;
use crate::state::ClearValues;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the bridge and its lifecycle controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSettings {
    /// Initialization strategies, tried in order.
    pub strategies: Vec<InitStrategy>,
    /// How long to wait for the initialization worker. `None` waits forever.
    pub init_timeout_ms: Option<u64>,
    /// Run device creation on a dedicated worker thread.
    pub init_on_worker: bool,
    /// Request initialization implicitly on the first frame boundary.
    pub auto_initialize: bool,
    /// View used when a draw does not name one.
    pub default_view: ViewId,
    /// Initial clear values for every view.
    pub clear: ClearValues,
    /// Maximum staged off-thread jobs drained per frame. `None` drains everything.
    pub max_staged_per_frame: Option<usize>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            strategies: InitStrategy::CHAIN.to_vec(),
            init_timeout_ms: Some(5000),
            init_on_worker: true,
            auto_initialize: true,
            default_view: ViewId(0),
            clear: ClearValues::default(),
            max_staged_per_frame: None,
        }
    }
}

impl BridgeSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {e}", path.display())))?;
        let settings = Self::from_json_str(&text)?;
        log::info!("BridgeSettings: loaded from {}", path.display());
        Ok(settings)
    }

    /// The initialization timeout as a [`Duration`].
    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = BridgeSettings::default();
        assert_eq!(s.strategies, InitStrategy::CHAIN.to_vec());
        assert_eq!(s.init_timeout(), Some(Duration::from_secs(5)));
        assert!(s.auto_initialize);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = BridgeSettings::from_json_str(
            r#"{ "strategies": ["Minimal"], "init_on_worker": false }"#,
        )
        .unwrap();
        assert_eq!(s.strategies, vec![InitStrategy::Minimal]);
        assert!(!s.init_on_worker);
        assert_eq!(s.init_timeout_ms, Some(5000));
        assert_eq!(s.clear, ClearValues::default());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = BridgeSettings::from_json_str(r#"{ "vsync": true }"#).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err = BridgeSettings::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
