//! Navegar: synchronization, locator resolution, and menu navigation for
//! browser-driven UI test automation.
//!
//! Navegar (Spanish: "to navigate") is the engine beneath every widget
//! operation of a UI test: it makes "click", "type", and "exists" robust
//! against asynchronous rendering, resolves the interactive sub-element
//! behind a logical field by trying ordered structural candidates, and
//! drives a three-level script-rendered menu to open an arbitrary screen.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Action Facade                        │
//! │        synchronize → resolve → act → verify (fixed order)    │
//! ├───────────────┬──────────────────────────┬───────────────────┤
//! │ Menu          │ Locator Resolver         │ BrowserSession    │
//! │ Navigator     │ (ordered candidates)     │ (window/frame)    │
//! ├───────────────┴──────────────────────────┴───────────────────┤
//! │             Synchronization Engine (bounded polls)           │
//! ├──────────────────────────────────────────────────────────────┤
//! │        Clock / Deadline            external Driver trait     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is single-threaded, synchronous, and blocking: every wait is
//! a busy-poll loop bounded by a deadline computed once, and cancellation
//! is timeout only.

#![warn(missing_docs)]

/// Clock abstraction and deadline arithmetic
pub mod clock;

/// Engine configuration: timings, probes, menu templates
pub mod config;

/// External browser-control driver trait
pub mod driver;

/// Locator classification, templates, and resolution
pub mod locator;

/// Three-level menu navigation state machine
pub mod menu;

/// Scriptable in-memory driver for browser-free tests
pub mod mock;

/// Error and result types
pub mod result;

/// Window and frame context management
pub mod session;

/// Deadline-driven polling waits
pub mod sync;

/// Per-action execution traces
pub mod trace;

/// Action facade: the operations exposed to test scripts
pub mod actions;

pub use actions::{classify_widget, Actions, ClearStrategy, WidgetKind};
pub use clock::{Clock, Deadline, SharedClock, SystemClock, TestClock};
pub use config::{
    ActionConfig, EngineConfig, MenuConfig, SyncConfig, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMEOUT_MS,
};
pub use driver::{Driver, ElementHandle, SharedDriver, SpecialKeys, WindowHandle};
pub use locator::{
    classify, CandidateSet, Locator, LocatorTemplate, Resolver, SyntaxKind, MAX_LOCATOR_LENGTH,
};
pub use menu::{MenuNavigator, MenuPath, OpenScreen};
pub use mock::{FakeDriver, FakeElement, PageState};
pub use result::{NavegarError, NavegarResult};
pub use session::BrowserSession;
pub use sync::SyncEngine;
pub use trace::{ActionTrace, SharedRecorder, StepKind, TraceRecorder, TraceStep};

/// Install a `tracing` subscriber reading its filter from `RUST_LOG`.
///
/// Intended for binaries and integration tests; calling it twice is
/// harmless, the second call is ignored.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

/// One assembled engine: session, resolver, facade, and recorder over a
/// shared driver and clock.
///
/// Convenience for callers that want the whole stack wired the default
/// way; each part can also be constructed individually.
#[derive(Debug)]
pub struct Engine {
    /// Tracked window/frame context
    pub session: BrowserSession,
    /// The action facade
    pub actions: Actions,
    /// Execution trace recorder, shared with the facade
    pub recorder: SharedRecorder,
    config: EngineConfig,
}

impl Engine {
    /// Assemble an engine over a driver and clock.
    ///
    /// # Errors
    ///
    /// Propagates the driver failure when no current window exists.
    pub fn new(driver: SharedDriver, clock: SharedClock, config: EngineConfig) -> NavegarResult<Self> {
        let sync = SyncEngine::new(driver.clone(), clock.clone(), config.sync.clone());
        let session = BrowserSession::new(driver.clone(), sync.clone())?;
        let recorder = TraceRecorder::new(clock).into_shared();
        let actions =
            Actions::new(driver, sync, config.actions.clone()).with_recorder(recorder.clone());
        Ok(Self {
            session,
            actions,
            recorder,
            config,
        })
    }

    /// Assemble an engine with the default configuration and system clock.
    ///
    /// # Errors
    ///
    /// Propagates the driver failure when no current window exists.
    pub fn with_defaults(driver: SharedDriver) -> NavegarResult<Self> {
        Self::new(
            driver,
            std::sync::Arc::new(SystemClock),
            EngineConfig::default(),
        )
    }

    /// The configuration the engine was assembled with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Navigate the three-level menu to open a screen.
    ///
    /// # Errors
    ///
    /// Propagates configuration problems; "screen not found" is `Ok(None)`.
    pub fn open_screen(&mut self, path: &MenuPath) -> NavegarResult<Option<OpenScreen>> {
        MenuNavigator::new(&mut self.session, self.config.menu.clone()).navigate(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_engine_assembles_over_fake_driver() {
        let clock = Arc::new(TestClock::new());
        let driver = Arc::new(FakeDriver::new(clock.clone()));
        let engine = Engine::new(driver, clock, EngineConfig::default()).unwrap();
        assert_eq!(engine.session.main_window().as_str(), "main");
        assert_eq!(engine.config().sync.overlay_poll_limit, 120);
    }

    #[test]
    fn test_facade_and_session_share_one_driver() {
        let clock = Arc::new(TestClock::new());
        let driver = Arc::new(FakeDriver::new(clock.clone()));
        driver.install("greeting", FakeElement::new("div"));
        let engine = Engine::new(driver, clock, EngineConfig::default()).unwrap();
        assert!(engine.actions.exists(&Locator::parse("greeting").unwrap()));
    }

    #[test]
    fn test_facade_operations_feed_the_recorder() {
        let clock = Arc::new(TestClock::new());
        let driver = Arc::new(FakeDriver::new(clock.clone()));
        driver.install("save", FakeElement::new("button"));
        let engine = Engine::new(driver, clock, EngineConfig::default()).unwrap();
        assert!(engine.actions.click(&Locator::parse("save").unwrap()));
        let recorder = engine.recorder.lock().unwrap();
        assert_eq!(recorder.completed().len(), 1);
        assert!(recorder.completed()[0].succeeded());
        assert!(recorder.completed()[0].action.contains("click"));
    }
}
