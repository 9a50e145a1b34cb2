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

//! Error types shared by the bridge and its backends.

use crate::backend::InitStrategy;
use crate::handle::{LogicalResourceId, NativeHandle};
use thiserror::Error;

/// A failure reported by a native backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not allocate the requested storage.
    #[error("out of memory allocating {bytes} bytes")]
    OutOfMemory {
        /// Requested size.
        bytes: u64,
    },
    /// The request uses something the backend does not support.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// A native handle did not name a live backend object.
    #[error("invalid native handle {0:?}")]
    InvalidHandle(NativeHandle),
    /// The backend rejected the arguments.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The backend device is not available.
    #[error("backend device is not initialized")]
    NotInitialized,
    /// Any other native failure.
    #[error("native backend failure: {0}")]
    Native(String),
}

/// A backend device could not be brought up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    /// A single strategy failed; the chain moves on to the next one.
    #[error("strategy {strategy:?} rejected: {source}")]
    Rejected {
        /// The strategy that failed.
        strategy: InitStrategy,
        /// What the backend reported.
        #[source]
        source: BackendError,
    },
    /// A strategy panicked inside native code.
    #[error("strategy {strategy:?} panicked: {message}")]
    StrategyPanicked {
        /// The strategy that panicked.
        strategy: InitStrategy,
        /// Panic payload, when it was a string.
        message: String,
    },
    /// Every configured strategy failed.
    #[error("all initialization strategies failed. Attempted: {attempted:?}")]
    AllStrategiesFailed {
        /// Strategies in the order they were tried.
        attempted: Vec<InitStrategy>,
    },
    /// The initialization worker did not answer in time.
    #[error("backend initialization timed out after {millis} ms")]
    TimedOut {
        /// The configured timeout.
        millis: u64,
    },
    /// Initialization was cancelled before a strategy succeeded.
    #[error("backend initialization was cancelled")]
    Cancelled,
    /// The backend is no longer available to this session.
    #[error("backend is unavailable: {0}")]
    BackendUnavailable(String),
}

/// Why an operation was skipped as a transient miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// The backend device does not exist yet.
    NotInitialized,
    /// The logical id is unknown or was destroyed.
    UnknownResource(LogicalResourceId),
    /// The logical id exists but has no native object yet.
    Pending(LogicalResourceId),
    /// The logical id names a resource of a different kind.
    WrongKind(LogicalResourceId),
    /// A draw had no vertices or an invalid handle.
    EmptyDraw,
    /// A draw range reaches past the end of its buffer.
    OutOfRange,
}

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Device bring-up failed for the session.
    #[error("fatal initialization failure: {0}")]
    FatalInit(#[from] InitError),
    /// A native call failed.
    #[error("native failure: {0}")]
    NativeFailure(#[from] BackendError),
    /// A referenced resource is not available.
    #[error("transient miss: {0:?}")]
    TransientMiss(MissReason),
    /// The caller passed arguments that can never succeed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}
