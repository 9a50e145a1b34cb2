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

//! Backend lifecycle: deferred initialization, the strategy chain, resize
//! and shutdown.
//!
//! ```text
//! Uninitialized --initialize--> Requested --frame begin--> Initialized
//!                                   |                          |
//!                                   +--> Failed (terminal)     +--shutdown--> Uninitialized
//! ```

use crate::registry::ResourceRegistry;
use crate::BackendRef;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use veil_core::{
    BackendError, BackendInfo, BridgeSettings, CancelToken, GraphicsBackend, InitError, InitRequest,
    InitStrategy, PlatformWindow,
};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Nothing requested yet, or shut down.
    Uninitialized,
    /// `initialize` was called; the device is created at the next frame begin.
    Requested,
    /// A strategy produced a device.
    Initialized,
    /// Every strategy failed. Terminal until an explicit shutdown.
    Failed,
}

/// Observable session flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendSession {
    /// A device exists.
    pub initialized: bool,
    /// `initialize` was called this session, whatever its outcome.
    pub initialization_attempted: bool,
    /// Current surface width.
    pub width: u32,
    /// Current surface height.
    pub height: u32,
    /// Frames begun with a live device.
    pub frame_number: u64,
}

/// Result of [`LifecycleController::begin_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStart {
    /// The device was already up.
    Ready,
    /// The device was created by this call.
    Initialized,
    /// No device; the frame renders to nothing.
    Unavailable,
}

/// Tries `strategies` in order and returns the first success.
///
/// A panic inside a strategy is contained and treated as that strategy's
/// failure. The cancel token is checked before every attempt.
pub fn run_strategies(
    backend: &mut dyn GraphicsBackend,
    strategies: &[InitStrategy],
    request: &InitRequest,
) -> Result<BackendInfo, InitError> {
    let mut attempted = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        if request.cancel.is_cancelled() {
            log::warn!("Backend initialization cancelled before {strategy:?}");
            return Err(InitError::Cancelled);
        }
        attempted.push(strategy);
        log::info!("Trying backend initialization strategy {strategy:?}...");

        match panic::catch_unwind(AssertUnwindSafe(|| backend.init(strategy, request))) {
            Ok(Ok(info)) => {
                log::info!(
                    "Backend initialized with {strategy:?}: '{}' ({})",
                    info.adapter_name,
                    info.api
                );
                return Ok(info);
            }
            Ok(Err(source)) => {
                log::warn!("{}", InitError::Rejected { strategy, source });
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());
                log::error!("{}", InitError::StrategyPanicked { strategy, message });
            }
        }
    }
    Err(InitError::AllStrategiesFailed { attempted })
}

/// Owns the backend and drives it through its lifecycle.
pub struct LifecycleController {
    /// `None` once abandoned to a timed-out worker.
    backend: Option<Box<dyn GraphicsBackend>>,
    phase: LifecyclePhase,
    session: BackendSession,
    info: Option<BackendInfo>,
    failure: Option<InitError>,
    window: Option<PlatformWindow>,
    strategies: Vec<InitStrategy>,
    timeout: Option<Duration>,
    on_worker: bool,
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("backend", &self.backend)
            .field("phase", &self.phase)
            .field("session", &self.session)
            .field("info", &self.info)
            .field("failure", &self.failure)
            .field("has_window", &self.window.is_some())
            .field("strategies", &self.strategies)
            .field("timeout", &self.timeout)
            .field("on_worker", &self.on_worker)
            .finish()
    }
}

impl LifecycleController {
    /// Wraps `backend` without touching it.
    pub fn new(backend: Box<dyn GraphicsBackend>, settings: &BridgeSettings) -> Self {
        Self {
            backend: Some(backend),
            phase: LifecyclePhase::Uninitialized,
            session: BackendSession::default(),
            info: None,
            failure: None,
            window: None,
            strategies: settings.strategies.clone(),
            timeout: settings.init_timeout(),
            on_worker: settings.init_on_worker,
        }
    }

    /// Requests initialization at `width` x `height`.
    ///
    /// Only the first call of a session records anything; the device itself
    /// is created by the next [`LifecycleController::begin_frame`]. Returns
    /// `false` once initialization has failed for the session.
    pub fn initialize(&mut self, width: u32, height: u32, window: Option<PlatformWindow>) -> bool {
        if self.session.initialization_attempted {
            log::trace!("initialize: already attempted, returning cached result");
            return self.phase != LifecyclePhase::Failed;
        }
        self.session.initialization_attempted = true;
        self.session.width = width;
        self.session.height = height;
        if window.is_some() {
            self.window = window;
        }
        self.phase = LifecyclePhase::Requested;
        log::info!("Backend initialization requested at {width}x{height}, deferred to the next frame");
        true
    }

    /// Supplies the platform window once it exists. Used by the next device creation.
    pub fn attach_window(&mut self, window: PlatformWindow) {
        self.window = Some(window);
    }

    /// Starts a frame, creating the device first if it was requested.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> FrameStart {
        match self.phase {
            LifecyclePhase::Initialized => {
                self.resize(width, height);
                self.session.frame_number += 1;
                FrameStart::Ready
            }
            LifecyclePhase::Requested => {
                if width > 0 && height > 0 {
                    self.session.width = width;
                    self.session.height = height;
                }
                match self.create_device() {
                    Ok(info) => {
                        self.info = Some(info);
                        self.phase = LifecyclePhase::Initialized;
                        self.session.initialized = true;
                        self.session.frame_number += 1;
                        FrameStart::Initialized
                    }
                    Err(e) => {
                        log::error!("Backend initialization failed, rendering is disabled for this session: {e}");
                        self.failure = Some(e);
                        self.phase = LifecyclePhase::Failed;
                        FrameStart::Unavailable
                    }
                }
            }
            LifecyclePhase::Uninitialized | LifecyclePhase::Failed => FrameStart::Unavailable,
        }
    }

    /// Finishes the frame on the backend. Does nothing without a device.
    pub fn end_frame(&mut self) -> Result<(), BackendError> {
        match self.backend_mut() {
            Some(backend) => backend.frame(),
            None => Ok(()),
        }
    }

    /// Resizes the surface. Returns `true` when a backend reset was issued.
    ///
    /// A no-op before initialization, for unchanged dimensions, and for a
    /// zero-sized (minimized) surface.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.phase != LifecyclePhase::Initialized
            || (width, height) == (self.session.width, self.session.height)
            || width == 0
            || height == 0
        {
            return false;
        }
        let Some(backend) = self.backend_mut() else {
            return false;
        };
        match backend.reset(width, height) {
            Ok(()) => {
                log::info!(
                    "Backend resized {}x{} -> {width}x{height}",
                    self.session.width,
                    self.session.height
                );
                self.session.width = width;
                self.session.height = height;
                true
            }
            Err(e) => {
                log::error!("Backend reset to {width}x{height} failed: {e}");
                false
            }
        }
    }

    /// Releases every registered resource, tears down the device and returns
    /// to [`LifecyclePhase::Uninitialized`]. A no-op when nothing was started.
    pub fn shutdown(&mut self, registry: &mut ResourceRegistry) {
        if self.phase == LifecyclePhase::Uninitialized {
            return;
        }
        log::info!("Backend shutting down from {:?}", self.phase);
        registry.release_all(self.backend_mut());
        if self.phase == LifecyclePhase::Initialized {
            if let Some(backend) = self.backend.as_deref_mut() {
                backend.shutdown();
            }
        }
        self.phase = LifecyclePhase::Uninitialized;
        self.session = BackendSession::default();
        self.info = None;
        self.failure = None;
        log::info!("Backend shut down");
    }

    /// The backend, only while a device exists.
    pub fn backend_mut(&mut self) -> BackendRef<'_> {
        if self.phase != LifecyclePhase::Initialized {
            return None;
        }
        self.backend.as_deref_mut()
    }

    /// Current phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Session flags.
    pub fn session(&self) -> &BackendSession {
        &self.session
    }

    /// The device that was created, if any.
    pub fn info(&self) -> Option<&BackendInfo> {
        self.info.as_ref()
    }

    /// Why initialization failed, if it did.
    pub fn failure(&self) -> Option<&InitError> {
        self.failure.as_ref()
    }

    fn create_device(&mut self) -> Result<BackendInfo, InitError> {
        let request = InitRequest {
            width: self.session.width,
            height: self.session.height,
            window: self.window.clone(),
            cancel: CancelToken::new(),
        };
        if self.on_worker {
            return self.create_device_on_worker(request);
        }
        let backend = self.backend.as_deref_mut().ok_or_else(|| {
            InitError::BackendUnavailable("abandoned by an earlier timed-out initialization".to_owned())
        })?;
        run_strategies(backend, &self.strategies, &request)
    }

    /// Moves the backend to a worker thread for the duration of the chain.
    ///
    /// On timeout the worker is signalled through the cancel token and left
    /// running; the backend it holds is never returned.
    fn create_device_on_worker(&mut self, request: InitRequest) -> Result<BackendInfo, InitError> {
        let Some(mut backend) = self.backend.take() else {
            return Err(InitError::BackendUnavailable(
                "abandoned by an earlier timed-out initialization".to_owned(),
            ));
        };
        let strategies = self.strategies.clone();
        let worker_request = request.clone();
        let (tx, rx) = flume::bounded(1);

        let spawned = thread::Builder::new()
            .name("veil-backend-init".to_owned())
            .spawn(move || {
                let result = run_strategies(backend.as_mut(), &strategies, &worker_request);
                if tx.send((backend, result)).is_err() {
                    log::warn!("Backend initialization finished after the caller gave up; device dropped");
                }
            });
        if let Err(e) = spawned {
            return Err(InitError::BackendUnavailable(format!(
                "could not spawn the initialization worker: {e}"
            )));
        }

        let received = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                flume::RecvTimeoutError::Timeout => Some(timeout),
                flume::RecvTimeoutError::Disconnected => None,
            }),
            None => rx.recv().map_err(|_| None),
        };

        match received {
            Ok((backend, result)) => {
                self.backend = Some(backend);
                result
            }
            Err(Some(timeout)) => {
                request.cancel.cancel();
                log::error!(
                    "Backend initialization did not finish within {} ms; abandoning the worker",
                    timeout.as_millis()
                );
                Err(InitError::TimedOut {
                    millis: timeout.as_millis() as u64,
                })
            }
            Err(None) => Err(InitError::BackendUnavailable(
                "initialization worker exited without reporting".to_owned(),
            )),
        }
    }
}
